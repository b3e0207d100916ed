//! Error types for the logging pipeline

use crate::core::entry::LogEntry;
use crate::core::ident::{TransformerId, TransportId};

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// A transformer failed while rewriting an entry. Always fatal to the
    /// current dispatch; carries the entry as it stood when the chain broke.
    #[error("transformer '{transformer}' failed for logger '{logger}': {source}")]
    Transform {
        transformer: String,
        transformer_id: TransformerId,
        logger: String,
        entry: Box<LogEntry>,
        #[source]
        source: Box<LoggerError>,
    },

    /// A transport's delivery failed. Isolated to that transport and
    /// reported back through the pipeline at fatal level.
    #[error("transport '{transport}' failed to deliver entry: {source}")]
    Transport {
        transport: String,
        transport_id: TransportId,
        entry: Box<LogEntry>,
        #[source]
        source: Box<LoggerError>,
    },

    /// An asynchronous delivery routine panicked; the panic was caught by
    /// the transport worker and escalated into the pipeline.
    #[error("delivery routine of transport '{transport}' panicked: {message}")]
    DeliveryPanic { transport: String, message: String },

    /// IO error with context
    #[error("IO error while {operation}: {source}")]
    IoOperation {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[cfg(feature = "telegram")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote delivery endpoint rejected the request
    #[error("remote API rejected request (status {status}): {body}")]
    RemoteApi { status: u16, body: String },

    /// Invalid configuration with details
    #[error("invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// The transport's worker is no longer accepting writes
    #[error("transport '{transport}' is shut down")]
    TransportStopped { transport: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Short type name used when the error is captured into an entry.
    pub fn kind(&self) -> &'static str {
        match self {
            LoggerError::Transform { .. } => "TransformError",
            LoggerError::Transport { .. } => "TransportError",
            LoggerError::DeliveryPanic { .. } => "DeliveryPanic",
            LoggerError::IoOperation { .. } | LoggerError::Io(_) => "IoError",
            LoggerError::Json(_) => "JsonError",
            #[cfg(feature = "telegram")]
            LoggerError::Http(_) => "HttpError",
            LoggerError::RemoteApi { .. } => "RemoteApiError",
            LoggerError::InvalidConfiguration { .. } => "InvalidConfiguration",
            LoggerError::TransportStopped { .. } => "TransportStopped",
            LoggerError::Other(_) => "Error",
        }
    }

    /// Create a transform error wrapping a failed transformer invocation.
    ///
    /// The entry snapshot is stored without its logger back-reference.
    pub fn transform(
        transformer: impl Into<String>,
        transformer_id: TransformerId,
        logger: Option<&str>,
        mut entry: LogEntry,
        source: LoggerError,
    ) -> Self {
        entry.source = None;
        LoggerError::Transform {
            transformer: transformer.into(),
            transformer_id,
            logger: logger.unwrap_or("<unnamed>").to_string(),
            entry: Box::new(entry),
            source: Box::new(source),
        }
    }

    /// Create a transport error wrapping a failed delivery.
    pub fn transport(
        transport: impl Into<String>,
        transport_id: TransportId,
        mut entry: LogEntry,
        source: LoggerError,
    ) -> Self {
        entry.source = None;
        LoggerError::Transport {
            transport: transport.into(),
            transport_id,
            entry: Box::new(entry),
            source: Box::new(source),
        }
    }

    pub fn delivery_panic(transport: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::DeliveryPanic {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Create an IO operation error with context
    pub fn io_operation(operation: impl Into<String>, source: std::io::Error) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            source,
        }
    }

    pub fn remote_api(status: u16, body: impl Into<String>) -> Self {
        LoggerError::RemoteApi {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn transport_stopped(transport: impl Into<String>) -> Self {
        LoggerError::TransportStopped {
            transport: transport.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
