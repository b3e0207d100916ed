//! Built-in filters
//!
//! The debug filter selects loggers by name with a `DEBUG`-style pattern
//! list: comma or whitespace separated glob items where `*` matches
//! anything and a leading `-` excludes.

use crate::core::error::{LoggerError, Result};
use crate::core::filter::Filter;
use regex::Regex;

/// Build a filter that passes calls whose logger name matches `pattern`.
///
/// `pattern` is a list of glob items (`api:*`, `-api:noisy`). With
/// `pass_above` set, calls strictly above that severity bypass the name
/// check entirely. A bare `*` passes everything; unnamed loggers only pass
/// via `pass_above`.
pub fn debug_filter(pattern: &str, pass_above: Option<i32>) -> Result<Filter> {
    let pattern = pattern.trim().to_string();

    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    for item in pattern.split([' ', '\t', ',']).filter(|s| !s.is_empty()) {
        let (target, glob) = match item.strip_prefix('-') {
            Some(rest) => (&mut excludes, rest),
            None => (&mut includes, item),
        };
        let regex = format!("^{}$", regex::escape(glob).replace(r"\*", ".*?"));
        target.push(Regex::new(&regex).map_err(|e| {
            LoggerError::config("debug_filter", format!("bad pattern '{item}': {e}"))
        })?);
    }

    Ok(Filter::named("debug", move |ctx| {
        if pattern == "*" {
            return true;
        }
        if let Some(threshold) = pass_above {
            if ctx.level > threshold {
                return true;
            }
        }
        if pattern == "-*" {
            return false;
        }
        let Some(name) = ctx.logger.name() else {
            return false;
        };
        if excludes.iter().any(|r| r.is_match(name)) {
            return false;
        }
        includes.iter().any(|r| r.is_match(name))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::{LogArg, Message};
    use crate::core::filter::FilterContext;
    use crate::core::logger::Logger;

    fn passes(filter: &Filter, logger: &Logger, level: i32) -> bool {
        let message = Message::None;
        let args: Vec<LogArg> = Vec::new();
        filter.check(&FilterContext {
            logger,
            level,
            message: &message,
            args: &args,
        })
    }

    #[test]
    fn test_star_passes_everything() {
        let filter = debug_filter("*", None).unwrap();
        let unnamed = Logger::builder().build();
        assert!(passes(&filter, &unnamed, 10));
    }

    #[test]
    fn test_glob_matches_prefix() {
        let filter = debug_filter("api:*", None).unwrap();
        let auth = Logger::builder().name("api:auth").build();
        let worker = Logger::builder().name("worker").build();
        assert!(passes(&filter, &auth, 30));
        assert!(!passes(&filter, &worker, 30));
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        let filter = debug_filter("api:*, -api:noisy", None).unwrap();
        let auth = Logger::builder().name("api:auth").build();
        let noisy = Logger::builder().name("api:noisy").build();
        assert!(passes(&filter, &auth, 30));
        assert!(!passes(&filter, &noisy, 30));
    }

    #[test]
    fn test_pass_above_bypasses_name_check() {
        let filter = debug_filter("api:*", Some(40)).unwrap();
        let worker = Logger::builder().name("worker").build();
        assert!(!passes(&filter, &worker, 40));
        assert!(passes(&filter, &worker, 50));
    }

    #[test]
    fn test_negated_star_blocks_even_matching_names() {
        let filter = debug_filter("-*", None).unwrap();
        let logger = Logger::builder().name("api").build();
        assert!(!passes(&filter, &logger, 30));
    }

    #[test]
    fn test_unnamed_logger_fails_name_patterns() {
        let filter = debug_filter("api:*", None).unwrap();
        let unnamed = Logger::builder().build();
        assert!(!passes(&filter, &unnamed, 30));
    }
}
