//! The transport contract and the shared composition gate
//!
//! Every transport owns an independent decision surface: an enabled flag, a
//! minimum level, a set of excluded levels and a local transformer chain.
//! [`TransportCore`] packages that surface so concrete transports compose it
//! instead of reimplementing the gate.

use crate::core::entry::LogEntry;
use crate::core::error::Result;
use crate::core::ident::TransportId;
use crate::core::level::UNRESOLVED_LEVEL;
use crate::core::logger::Logger;
use crate::core::transform::Transformer;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// A log destination attached to a logger.
pub trait Transport: Send + Sync {
    /// Stable identity used for removal and per-entry exclusion.
    fn id(&self) -> TransportId;

    fn name(&self) -> &str;

    /// Accept one entry. The transport applies its own gate and local
    /// transformer chain; a gated-out entry is a successful no-op.
    fn write(&self, entry: &LogEntry, logger: &Logger) -> Result<()>;
}

/// Configuration shared by all transports.
#[derive(Default)]
pub struct TransportOptions {
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub level: Option<i32>,
    pub exclude_levels: BTreeSet<i32>,
    pub transformers: Vec<Transformer>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Minimum severity this transport accepts.
    pub fn level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn exclude_level(mut self, level: i32) -> Self {
        self.exclude_levels.insert(level);
        self
    }

    /// Append a transport-local transformer.
    pub fn transformer(mut self, transformer: Transformer) -> Self {
        self.transformers.push(transformer);
        self
    }
}

/// The per-transport decision surface: identity, gate state and the local
/// transformer chain.
pub struct TransportCore {
    id: TransportId,
    name: String,
    enabled: AtomicBool,
    level: AtomicI32,
    exclude_levels: RwLock<BTreeSet<i32>>,
    transformers: RwLock<Vec<Transformer>>,
}

impl TransportCore {
    pub fn new(default_name: &str, options: TransportOptions) -> Self {
        Self {
            id: TransportId::next(),
            name: options.name.unwrap_or_else(|| default_name.to_string()),
            enabled: AtomicBool::new(options.enabled.unwrap_or(true)),
            level: AtomicI32::new(options.level.unwrap_or(UNRESOLVED_LEVEL)),
            exclude_levels: RwLock::new(options.exclude_levels),
            transformers: RwLock::new(options.transformers),
        }
    }

    pub fn id(&self) -> TransportId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn set_min_level(&self, level: i32) {
        self.level.store(level, Ordering::Relaxed);
    }

    /// Run the gate and the local transformer chain.
    ///
    /// Returns the entry to deliver, or `None` when the gate or a local
    /// transformer dropped it. Local chain errors propagate so the caller
    /// can report them as a delivery failure of this transport.
    pub fn prepare(&self, entry: &LogEntry, logger: &Logger) -> Result<Option<LogEntry>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        if entry.level < self.level.load(Ordering::Relaxed) {
            return Ok(None);
        }
        if self.exclude_levels.read().contains(&entry.level) {
            return Ok(None);
        }

        let chain = self.transformers.read().clone();
        if chain.is_empty() {
            return Ok(Some(entry.clone()));
        }
        logger.transform_entry(&chain, entry.clone())
    }
}
