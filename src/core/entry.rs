//! Canonical log entry, call-argument normalization and the merge rule
//!
//! Every `log` call is normalized into one [`LogEntry`]: the message argument
//! may be literal text, an arbitrary value or a lazy producer, and each
//! context argument may be a value, a captured error, a lazy context
//! producer, or an [`EntryPatch`] merged into the entry under construction.

use crate::core::error::LoggerError;
use crate::core::ident::{TransformerId, TransportId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

/// Metadata key carrying the elapsed timer duration in nanoseconds.
pub const TIMER_METADATA_KEY: &str = "timer";

/// A snapshot of an error value carried inside an entry: type name, display
/// message and the chain of source messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedError {
    pub name: String,
    pub message: String,
    pub chain: Vec<String>,
}

impl CapturedError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            chain: Vec::new(),
        }
    }

    /// Capture an arbitrary error and its source chain.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        Self {
            name: "Error".to_string(),
            message: err.to_string(),
            chain: source_chain(err),
        }
    }
}

impl From<&LoggerError> for CapturedError {
    fn from(err: &LoggerError) -> Self {
        Self {
            name: err.kind().to_string(),
            message: err.to_string(),
            chain: source_chain(err),
        }
    }
}

fn source_chain(err: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}

/// Per-entry exclusion sets: transformers and transports this specific entry
/// must skip during the current dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclude {
    pub transformers: BTreeSet<TransformerId>,
    pub transports: BTreeSet<TransportId>,
}

impl Exclude {
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty() && self.transports.is_empty()
    }

    /// Set union with another exclusion set.
    pub fn union(&mut self, other: &Exclude) {
        self.transformers.extend(other.transformers.iter().copied());
        self.transports.extend(other.transports.iter().copied());
    }
}

/// The message argument of a `log` call.
///
/// A lazy message is a zero-argument producer evaluated only after the call
/// survives gating. A non-string resolved value is reclassified as the first
/// context item rather than dropped.
pub enum Message {
    None,
    Text(String),
    Value(Value),
    Lazy(Box<dyn FnOnce() -> Value + Send>),
}

impl Message {
    pub fn lazy(f: impl FnOnce() -> Value + Send + 'static) -> Self {
        Message::Lazy(Box::new(f))
    }

    /// The literal text of this message, when it is known without
    /// evaluating a lazy producer.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(s) => Some(s),
            Message::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::None => write!(f, "Message::None"),
            Message::Text(s) => write!(f, "Message::Text({:?})", s),
            Message::Value(v) => write!(f, "Message::Value({})", v),
            Message::Lazy(_) => write!(f, "Message::Lazy(..)"),
        }
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_string())
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<Value> for Message {
    fn from(v: Value) -> Self {
        Message::Value(v)
    }
}

/// A context argument of a `log` call.
pub enum LogArg {
    /// Free-form structured value, appended to `entry.context`.
    Value(Value),
    /// Error snapshot, appended to `entry.errors`.
    Error(CapturedError),
    /// Lazy context producer: evaluated after gating, results append-spread
    /// into `entry.context`.
    Lazy(Box<dyn FnOnce() -> Vec<Value> + Send>),
    /// Entry directive: a partial entry merged into the entry under
    /// construction via the merge rule.
    Patch(EntryPatch),
}

impl LogArg {
    /// Wrap any serializable value as a context item.
    pub fn value(v: impl Serialize) -> Self {
        LogArg::Value(serde_json::to_value(v).unwrap_or(Value::Null))
    }

    /// Capture an error argument.
    pub fn error(err: &(dyn StdError + 'static)) -> Self {
        LogArg::Error(CapturedError::from_error(err))
    }

    pub fn captured(err: CapturedError) -> Self {
        LogArg::Error(err)
    }

    pub fn lazy(f: impl FnOnce() -> Vec<Value> + Send + 'static) -> Self {
        LogArg::Lazy(Box::new(f))
    }

    pub fn patch(patch: EntryPatch) -> Self {
        LogArg::Patch(patch)
    }
}

impl fmt::Debug for LogArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogArg::Value(v) => write!(f, "LogArg::Value({})", v),
            LogArg::Error(e) => write!(f, "LogArg::Error({:?})", e),
            LogArg::Lazy(_) => write!(f, "LogArg::Lazy(..)"),
            LogArg::Patch(p) => write!(f, "LogArg::Patch({:?})", p),
        }
    }
}

/// A partial entry supplied as an entry directive, merged into the entry
/// under construction.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: Option<i32>,
    pub icon: Option<String>,
    pub message: Option<String>,
    pub context: Vec<Value>,
    pub errors: Vec<CapturedError>,
    pub metadata: BTreeMap<String, Value>,
    pub exclude: Exclude,
}

impl EntryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, value: impl Serialize) -> Self {
        self.context
            .push(serde_json::to_value(value).unwrap_or(Value::Null));
        self
    }

    #[must_use]
    pub fn with_error(mut self, err: CapturedError) -> Self {
        self.errors.push(err);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.metadata
            .insert(key.into(), serde_json::to_value(value).unwrap_or(Value::Null));
        self
    }

    /// Record an elapsed timer duration in `metadata["timer"]`, in
    /// nanoseconds.
    #[must_use]
    pub fn with_timer(self, elapsed: Duration) -> Self {
        self.with_metadata(TIMER_METADATA_KEY, elapsed.as_nanos() as u64)
    }

    #[must_use]
    pub fn exclude_transport(mut self, id: TransportId) -> Self {
        self.exclude.transports.insert(id);
        self
    }

    #[must_use]
    pub fn exclude_transformer(mut self, id: TransformerId) -> Self {
        self.exclude.transformers.insert(id);
        self
    }
}

/// The canonical normalized representation of one log call.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// Resolved numeric severity; comparison is purely numeric.
    pub level: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Free-form structured context values, in argument order.
    pub context: Vec<Value>,
    /// Error snapshots collected from arguments, in argument order.
    pub errors: Vec<CapturedError>,
    /// Open mapping for engine-contributed facts (e.g. elapsed timers).
    pub metadata: BTreeMap<String, Value>,
    #[serde(skip)]
    pub exclude: Exclude,
    /// Name of the originating logger; contextual only, never an owning
    /// handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl LogEntry {
    /// An empty entry at the given severity, timestamped now.
    pub fn empty(level: i32) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            icon: None,
            message: None,
            context: Vec::new(),
            errors: Vec::new(),
            metadata: BTreeMap::new(),
            exclude: Exclude::default(),
            source: None,
        }
    }

    /// Normalize a `log` call into an entry. See the module docs for the
    /// classification of message and context arguments.
    pub fn build(level: i32, message: Message, args: Vec<LogArg>, source: Option<String>) -> Self {
        let mut entry = LogEntry::empty(level);
        entry.source = source;

        let mut queue: VecDeque<LogArg> = args.into();

        let resolved = match message {
            Message::None => None,
            Message::Text(s) => Some(Value::String(s)),
            Message::Value(v) => Some(v),
            Message::Lazy(f) => Some(f()),
        };

        match resolved {
            Some(Value::String(s)) => entry.message = Some(s),
            Some(other) => queue.push_front(LogArg::Value(other)),
            None => {}
        }

        for arg in queue {
            match arg {
                LogArg::Value(v) => entry.context.push(v),
                LogArg::Error(e) => entry.errors.push(e),
                LogArg::Lazy(f) => entry.context.extend(f()),
                LogArg::Patch(patch) => entry = entry.merge(patch),
            }
        }

        entry
    }

    /// The merge rule: scalar fields overlay when present in the patch,
    /// `context` and `errors` concatenate (base first), `metadata` merges
    /// key-wise last-write-wins, and the exclusion sets union.
    #[must_use]
    pub fn merge(mut self, patch: EntryPatch) -> Self {
        if let Some(timestamp) = patch.timestamp {
            self.timestamp = timestamp;
        }
        if let Some(level) = patch.level {
            self.level = level;
        }
        if patch.icon.is_some() {
            self.icon = patch.icon;
        }
        if patch.message.is_some() {
            self.message = patch.message;
        }
        self.context.extend(patch.context);
        self.errors.extend(patch.errors);
        self.metadata.extend(patch.metadata);
        self.exclude.union(&patch.exclude);
        self
    }

    /// The elapsed timer duration recorded in metadata, if any.
    pub fn timer(&self) -> Option<Duration> {
        self.metadata
            .get(TIMER_METADATA_KEY)
            .and_then(Value::as_u64)
            .map(Duration::from_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_string_message() {
        let entry = LogEntry::build(30, "hello".into(), vec![LogArg::value(json!({"a": 1}))], None);
        assert_eq!(entry.message.as_deref(), Some("hello"));
        assert_eq!(entry.context, vec![json!({"a": 1})]);
        assert!(entry.errors.is_empty());
    }

    #[test]
    fn test_build_non_string_message_becomes_context() {
        let entry = LogEntry::build(
            30,
            Message::Value(json!({"port": 8080})),
            vec![LogArg::value("second")],
            None,
        );
        assert!(entry.message.is_none());
        // The reclassified message comes first, before other context args.
        assert_eq!(entry.context, vec![json!({"port": 8080}), json!("second")]);
    }

    #[test]
    fn test_build_lazy_message() {
        let entry = LogEntry::build(
            30,
            Message::lazy(|| Value::String("computed".to_string())),
            Vec::new(),
            None,
        );
        assert_eq!(entry.message.as_deref(), Some("computed"));
    }

    #[test]
    fn test_build_lazy_context_spreads() {
        let entry = LogEntry::build(
            30,
            Message::None,
            vec![LogArg::lazy(|| vec![json!(1), json!(2)]), LogArg::value(3)],
            None,
        );
        assert_eq!(entry.context, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_build_collects_errors_in_order() {
        let entry = LogEntry::build(
            50,
            "boom".into(),
            vec![
                LogArg::captured(CapturedError::new("Error", "first")),
                LogArg::value("ctx"),
                LogArg::captured(CapturedError::new("Error", "second")),
            ],
            None,
        );
        assert_eq!(entry.errors.len(), 2);
        assert_eq!(entry.errors[0].message, "first");
        assert_eq!(entry.errors[1].message, "second");
        assert_eq!(entry.context, vec![json!("ctx")]);
    }

    #[test]
    fn test_build_applies_patch() {
        let id = TransportId::next();
        let entry = LogEntry::build(
            60,
            Message::None,
            vec![
                LogArg::value("before"),
                LogArg::patch(
                    EntryPatch::new()
                        .with_context("patched")
                        .with_metadata("k", "v")
                        .exclude_transport(id),
                ),
            ],
            None,
        );
        assert_eq!(entry.context, vec![json!("before"), json!("patched")]);
        assert_eq!(entry.metadata.get("k"), Some(&json!("v")));
        assert!(entry.exclude.transports.contains(&id));
    }

    #[test]
    fn test_merge_concatenates_and_unions() {
        let a = TransportId::next();
        let b = TransportId::next();

        let mut base = LogEntry::empty(30);
        base.context.push(json!(1));
        base.errors.push(CapturedError::new("Error", "base"));
        base.metadata.insert("x".to_string(), json!("old"));
        base.exclude.transports.insert(a);

        let patch = EntryPatch::new()
            .with_context(2)
            .with_error(CapturedError::new("Error", "patch"))
            .with_metadata("x", "new")
            .exclude_transport(a)
            .exclude_transport(b);

        let merged = base.merge(patch);
        assert_eq!(merged.context, vec![json!(1), json!(2)]);
        assert_eq!(merged.errors.len(), 2);
        assert_eq!(merged.metadata.get("x"), Some(&json!("new")));
        assert_eq!(merged.exclude.transports.len(), 2);
    }

    #[test]
    fn test_merge_overlays_scalars_only_when_present() {
        let mut base = LogEntry::empty(30);
        base.message = Some("kept".to_string());

        let merged = base.clone().merge(EntryPatch::new());
        assert_eq!(merged.message.as_deref(), Some("kept"));

        let merged = base.merge(EntryPatch::new().with_message("replaced"));
        assert_eq!(merged.message.as_deref(), Some("replaced"));
    }

    #[test]
    fn test_timer_metadata_roundtrip() {
        let patch = EntryPatch::new().with_timer(Duration::from_millis(1500));
        let entry = LogEntry::empty(30).merge(patch);
        assert_eq!(entry.timer(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_captured_error_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = LoggerError::io_operation("opening log file", io);
        let captured = CapturedError::from(&err);
        assert_eq!(captured.name, "IoError");
        assert_eq!(captured.chain.len(), 1);
        assert!(captured.chain[0].contains("denied"));
    }
}
