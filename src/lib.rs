//! Structured logging with a transformer pipeline, per-transport gating and
//! asynchronous fan-out transports.
//!
//! Every log call is normalized into a [`LogEntry`], gated by the logger's
//! enabled flag, level threshold and filters, rewritten by an ordered
//! transformer chain, rendered to the console, and then fanned out to every
//! attached [`Transport`]. Each transport applies its own gate and local
//! transformer chain, and concrete transports deliver off-thread through
//! [`AsyncTransport`] so a slow destination never stalls the caller.
//!
//! ```no_run
//! use fanlog::{Level, Logger};
//!
//! let logger = Logger::builder()
//!     .name("api")
//!     .level(Level::Debug)
//!     .build();
//!
//! logger.info("server started")?;
//! fanlog::warn!(logger, "{} connections pending", 12)?;
//! # Ok::<(), fanlog::LoggerError>(())
//! ```

pub mod core;
pub mod filters;
pub mod macros;
pub mod render;
pub mod transports;

pub use crate::core::{
    default_resolver, level_name, CapturedError, DrainToken, EntryPatch, Exclude, ExitCode,
    Filter, FilterContext, FilterId, Level, LevelResolver, LevelSpec, LogArg, LogEntry, Logger,
    LoggerBuilder, LoggerError, Message, Result, ShutdownRegistry, Transformer, TransformerId,
    TransportId, DEFAULT_SHUTDOWN_TIMEOUT, TIMER_METADATA_KEY, UNRESOLVED_LEVEL,
};
pub use crate::filters::debug_filter;
pub use crate::render::{RenderOptions, Renderer};
#[cfg(feature = "telegram")]
pub use crate::transports::{TelegramTransport, TelegramTransportOptions};
pub use crate::transports::{
    AsyncTransport, AsyncTransportOptions, Deliver, FileTransport, FileTransportOptions,
    Frequency, LogRotator, RotatorOptions, Transport, TransportCore, TransportOptions,
};

/// Commonly used items.
pub mod prelude {
    pub use crate::core::{
        EntryPatch, Level, LogArg, LogEntry, Logger, LoggerBuilder, LoggerError, Message, Result,
        Transformer,
    };
    pub use crate::transports::Transport;
}
