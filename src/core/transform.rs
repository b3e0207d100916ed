//! Entry transformers and the ordered transformer chain
//!
//! A transformer consumes an entry and returns a rewritten entry, `None` to
//! drop the entry, or an error that aborts the current dispatch. The same
//! chain machinery runs both the logger-wide chain and each transport's
//! local chain.

use crate::core::entry::LogEntry;
use crate::core::error::{LoggerError, Result};
use crate::core::ident::TransformerId;
use crate::core::logger::Logger;
use std::fmt;
use std::sync::Arc;

type TransformFn = dyn Fn(LogEntry, &Logger) -> Result<Option<LogEntry>> + Send + Sync;

/// A registered entry rewriter with a stable identity.
#[derive(Clone)]
pub struct Transformer {
    id: TransformerId,
    name: String,
    f: Arc<TransformFn>,
}

impl Transformer {
    pub fn new(
        f: impl Fn(LogEntry, &Logger) -> Result<Option<LogEntry>> + Send + Sync + 'static,
    ) -> Self {
        Self::named("<transformer>", f)
    }

    pub fn named(
        name: impl Into<String>,
        f: impl Fn(LogEntry, &Logger) -> Result<Option<LogEntry>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: TransformerId::next(),
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// Convenience for infallible rewrites that never drop the entry.
    pub fn map(
        name: impl Into<String>,
        f: impl Fn(LogEntry, &Logger) -> LogEntry + Send + Sync + 'static,
    ) -> Self {
        Self::named(name, move |entry, logger| Ok(Some(f(entry, logger))))
    }

    pub fn id(&self) -> TransformerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, entry: LogEntry, logger: &Logger) -> Result<Option<LogEntry>> {
        (self.f)(entry, logger)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Run an ordered transformer chain over an entry.
///
/// Transformers named in the entry's exclusion set are skipped. A `None`
/// return short-circuits with a drop; an error short-circuits with a
/// transform error carrying a snapshot of the entry as the failing
/// transformer received it.
pub fn apply_chain(
    chain: &[Transformer],
    mut entry: LogEntry,
    logger: &Logger,
) -> Result<Option<LogEntry>> {
    for transformer in chain {
        if entry.exclude.transformers.contains(&transformer.id()) {
            continue;
        }
        let snapshot = entry.clone();
        match transformer.apply(entry, logger) {
            Ok(Some(next)) => entry = next,
            Ok(None) => return Ok(None),
            Err(err) => {
                return Err(LoggerError::transform(
                    transformer.name(),
                    transformer.id(),
                    logger.name(),
                    snapshot,
                    err,
                ))
            }
        }
    }
    Ok(Some(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logger::Logger;
    use serde_json::json;

    #[test]
    fn test_chain_applies_in_order() {
        let logger = Logger::builder().build();
        let chain = vec![
            Transformer::map("first", |mut e, _| {
                e.context.push(json!(1));
                e
            }),
            Transformer::map("second", |mut e, _| {
                e.context.push(json!(2));
                e
            }),
        ];

        let out = apply_chain(&chain, LogEntry::empty(30), &logger)
            .unwrap()
            .unwrap();
        assert_eq!(out.context, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_chain_drop_short_circuits() {
        let logger = Logger::builder().build();
        let chain = vec![
            Transformer::named("drop", |_, _| Ok(None)),
            Transformer::map("unreached", |mut e, _| {
                e.context.push(json!("x"));
                e
            }),
        ];

        assert!(apply_chain(&chain, LogEntry::empty(30), &logger)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_chain_skips_excluded() {
        let logger = Logger::builder().build();
        let skipped = Transformer::named("skipped", |_, _| Ok(None));
        let chain = vec![skipped.clone()];

        let mut entry = LogEntry::empty(30);
        entry.exclude.transformers.insert(skipped.id());

        let out = apply_chain(&chain, entry, &logger).unwrap();
        assert!(out.is_some());
    }

    #[test]
    fn test_chain_error_carries_snapshot() {
        let logger = Logger::builder().name("svc").build();
        let chain = vec![
            Transformer::map("stamp", |mut e, _| {
                e.context.push(json!("stamped"));
                e
            }),
            Transformer::named("broken", |_, _| Err(LoggerError::other("bad rewrite"))),
        ];

        let mut entry = LogEntry::empty(30);
        entry.source = Some("svc".to_string());

        let err = apply_chain(&chain, entry, &logger).unwrap_err();
        match err {
            LoggerError::Transform {
                transformer,
                logger,
                entry,
                ..
            } => {
                assert_eq!(transformer, "broken");
                assert_eq!(logger, "svc");
                // Snapshot reflects the upstream rewrite, back-reference stripped.
                assert_eq!(entry.context, vec![json!("stamped")]);
                assert!(entry.source.is_none());
            }
            other => panic!("expected transform error, got {other}"),
        }
    }
}
