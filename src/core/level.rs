//! Log level definitions and level resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The numeric value an unresolvable symbolic level resolves to.
///
/// Any threshold above `i32::MIN` gates such levels out, so an unrecognized
/// level name is never loggable once a threshold has been set.
pub const UNRESOLVED_LEVEL: i32 = i32::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Level {
    Trace = 10,
    Debug = 20,
    #[default]
    Info = 30,
    Warn = 40,
    Error = 50,
    Fatal = 60,
    Notice = 70,
}

impl Level {
    pub const ALL: [Level; 7] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Notice,
    ];

    /// The resolved numeric severity of this level.
    pub const fn value(self) -> i32 {
        self as i32
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Notice => "NOTICE",
        }
    }

    /// Map a resolved numeric severity back to a named level, if it is one.
    pub fn from_value(value: i32) -> Option<Level> {
        Level::ALL.iter().copied().find(|l| l.value() == value)
    }

    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            Level::Trace => BrightBlack,
            Level::Debug => Green,
            Level::Info => Blue,
            Level::Warn => Yellow,
            Level::Error => Red,
            Level::Fatal => BrightRed,
            Level::Notice => Blue,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(Level::Trace),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "FATAL" => Ok(Level::Fatal),
            "NOTICE" => Ok(Level::Notice),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

/// The display name for a resolved numeric severity.
///
/// Falls back to the raw number for severities that do not correspond to a
/// named level.
pub fn level_name(value: i32) -> String {
    match Level::from_value(value) {
        Some(level) => level.to_str().to_string(),
        None => value.to_string(),
    }
}

/// A level argument as supplied by a caller: a named level, a raw numeric
/// severity, or a level name to be resolved.
#[derive(Debug, Clone)]
pub enum LevelSpec {
    Named(Level),
    Raw(i32),
    Text(String),
}

impl From<Level> for LevelSpec {
    fn from(level: Level) -> Self {
        LevelSpec::Named(level)
    }
}

impl From<i32> for LevelSpec {
    fn from(value: i32) -> Self {
        LevelSpec::Raw(value)
    }
}

impl From<&str> for LevelSpec {
    fn from(name: &str) -> Self {
        LevelSpec::Text(name.to_string())
    }
}

impl From<String> for LevelSpec {
    fn from(name: String) -> Self {
        LevelSpec::Text(name)
    }
}

/// Maps a level argument to a numeric severity. Must be total: unrecognized
/// inputs map to [`UNRESOLVED_LEVEL`] rather than failing.
pub type LevelResolver = Arc<dyn Fn(&LevelSpec) -> i32 + Send + Sync>;

/// The default resolver: named levels and raw numbers map to their value,
/// level names parse case-insensitively, anything else is unresolvable.
pub fn default_resolver() -> LevelResolver {
    Arc::new(|spec| match spec {
        LevelSpec::Named(level) => level.value(),
        LevelSpec::Raw(value) => *value,
        LevelSpec::Text(name) => name
            .parse::<Level>()
            .map(|l| l.value())
            .unwrap_or(UNRESOLVED_LEVEL),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_values_are_ordered() {
        assert!(Level::Trace.value() < Level::Debug.value());
        assert!(Level::Error.value() < Level::Fatal.value());
        assert_eq!(Level::Info.value(), 30);
    }

    #[test]
    fn test_level_roundtrip() {
        for level in Level::ALL {
            assert_eq!(level.to_str().parse::<Level>().unwrap(), level);
            assert_eq!(Level::from_value(level.value()), Some(level));
        }
    }

    #[test]
    fn test_level_name_fallback() {
        assert_eq!(level_name(30), "INFO");
        assert_eq!(level_name(42), "42");
    }

    #[test]
    fn test_default_resolver() {
        let resolve = default_resolver();
        assert_eq!(resolve(&Level::Warn.into()), 40);
        assert_eq!(resolve(&25.into()), 25);
        assert_eq!(resolve(&"error".into()), 50);
        assert_eq!(resolve(&"no-such-level".into()), UNRESOLVED_LEVEL);
    }
}
