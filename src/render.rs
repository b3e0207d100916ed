//! Console rendering of log entries
//!
//! The renderer is pure: it formats an entry into a string and never
//! mutates it, so the same entry can still be handed to every transport.

use crate::core::entry::LogEntry;
use crate::core::level::{level_name, Level};
use chrono::Local;
use colored::Colorize;
use serde_json::Value;
use std::time::Duration;

/// Formatting knobs for the console renderer.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Apply ANSI colors to level names and dim decorations.
    pub color: bool,
    /// Prefix each line with the logger name.
    pub show_name: bool,
    /// Indentation width for pretty-printed context values.
    pub indent: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: true,
            show_name: false,
            indent: 2,
        }
    }
}

/// Formats entries for the primary console stream.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render one entry as a multi-line console string (no trailing newline).
    pub fn entry(&self, entry: &LogEntry) -> String {
        let mut out = String::new();

        let time = entry
            .timestamp
            .with_timezone(&Local)
            .format("%H:%M:%S%.3f")
            .to_string();
        out.push_str(&self.dim(&format!("[{}]", time)));
        out.push(' ');

        if let Some(icon) = &entry.icon {
            out.push_str(icon);
            out.push(' ');
        }

        out.push_str(&self.level_label(entry.level));

        if self.options.show_name {
            if let Some(source) = &entry.source {
                out.push(' ');
                out.push_str(&self.dim(&format!("[{}]", source)));
            }
        }

        if let Some(message) = &entry.message {
            out.push(' ');
            out.push_str(message);
        }

        if let Some(elapsed) = entry.timer() {
            out.push(' ');
            out.push_str(&self.dim(&format!("({})", humanize_duration(elapsed))));
        }

        for err in &entry.errors {
            out.push('\n');
            out.push_str(&format!("  [{}] {}", err.name, err.message));
            if !err.chain.is_empty() {
                out.push_str(&self.dim("\n  caused by:"));
                for cause in &err.chain {
                    out.push_str(&format!("\n    {}", cause));
                }
            }
        }

        for value in &entry.context {
            out.push('\n');
            out.push_str(&indent_lines(&self.pretty(value), self.options.indent));
        }

        out
    }

    fn level_label(&self, level: i32) -> String {
        let name = format!("{:<6}", level_name(level));
        if !self.options.color {
            return name;
        }
        match Level::from_value(level) {
            Some(l) => name.color(l.color_code()).bold().to_string(),
            None => name.bold().to_string(),
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.options.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn pretty(&self, value: &Value) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    }
}

fn indent_lines(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-friendly rendering of an elapsed duration.
pub fn humanize_duration(elapsed: Duration) -> String {
    let nanos = elapsed.as_nanos();
    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.1}µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.1}ms", nanos as f64 / 1_000_000.0)
    } else if nanos < 60_000_000_000 {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    } else {
        let secs = elapsed.as_secs();
        format!("{}m{}s", secs / 60, secs % 60)
    }
}
