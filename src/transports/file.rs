//! File transport: JSON-lines records into rotated log files

use crate::core::entry::{CapturedError, LogEntry};
use crate::core::error::Result;
use crate::core::ident::TransportId;
use crate::core::level::level_name;
use crate::core::logger::Logger;
use crate::transports::asynchronous::{AsyncTransport, AsyncTransportOptions, Deliver};
use crate::transports::rotation::{LogRotator, RotatorOptions};
use crate::transports::transport::Transport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Default)]
pub struct FileTransportOptions {
    pub transport: AsyncTransportOptions,
    pub rotation: RotatorOptions,
}

/// One line of the file format.
#[derive(Serialize)]
struct FileRecord<'a> {
    level: String,
    timestamp: &'a DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: &'a Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    context: &'a Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: &'a Vec<CapturedError>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: &'a BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: &'a Option<String>,
}

struct FileDelivery {
    rotator: LogRotator,
}

impl Deliver for FileDelivery {
    fn deliver(&mut self, entry: &LogEntry) -> Result<()> {
        let record = FileRecord {
            level: level_name(entry.level),
            timestamp: &entry.timestamp,
            message: &entry.message,
            context: &entry.context,
            errors: &entry.errors,
            metadata: &entry.metadata,
            source: &entry.source,
        };
        let line = serde_json::to_string(&record)?;
        self.rotator.append(&line)
    }
}

/// Writes entries as JSON lines into date-stamped, size-capped log files,
/// off the caller's thread.
pub struct FileTransport {
    inner: AsyncTransport,
}

impl FileTransport {
    pub fn new(dir: impl Into<PathBuf>, options: FileTransportOptions) -> Result<Self> {
        let rotator = LogRotator::new(dir, options.rotation)?;
        let inner = AsyncTransport::new("file", FileDelivery { rotator }, options.transport)?;
        Ok(Self { inner })
    }

    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.inner.shutdown(timeout)
    }

    pub fn enable(&self) {
        self.inner.enable();
    }

    pub fn disable(&self) {
        self.inner.disable();
    }

    pub fn set_min_level(&self, level: i32) {
        self.inner.set_min_level(level);
    }
}

impl Transport for FileTransport {
    fn id(&self) -> TransportId {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn write(&self, entry: &LogEntry, logger: &Logger) -> Result<()> {
        self.inner.write(entry, logger)
    }
}
