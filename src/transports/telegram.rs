//! Telegram transport: entries as MarkdownV2 messages via the Bot API
//!
//! Deliveries run on the async worker thread, so the blocking HTTP client
//! and the rate limiter never stall the caller.

use crate::core::entry::LogEntry;
use crate::core::error::{LoggerError, Result};
use crate::core::ident::TransportId;
use crate::core::level::level_name;
use crate::core::logger::Logger;
use crate::transports::asynchronous::{AsyncTransport, AsyncTransportOptions, Deliver};
use crate::transports::transport::Transport;
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

pub const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;
pub const TELEGRAM_MAX_MESSAGES_PER_SECOND: u32 = 30;
pub const TELEGRAM_MAX_MESSAGES_PER_MINUTE_PER_CHAT: u32 = 20;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramTransportOptions {
    pub token: String,
    pub chat_id: String,
    pub date_format: String,
    /// Overridable for tests pointing at a local server.
    pub api_base: String,
    pub transport: AsyncTransportOptions,
}

impl TelegramTransportOptions {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            chat_id: chat_id.into(),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            transport: AsyncTransportOptions::default(),
        }
    }
}

/// Blocking limiter enforcing the Bot API's global per-second gap and the
/// per-chat per-minute reservoir.
struct RateLimiter {
    min_gap: Duration,
    capacity: u32,
    reservoir: u32,
    window: Duration,
    window_start: Instant,
    last_send: Option<Instant>,
}

impl RateLimiter {
    fn new() -> Self {
        Self {
            min_gap: Duration::from_millis(1000 / TELEGRAM_MAX_MESSAGES_PER_SECOND as u64),
            capacity: TELEGRAM_MAX_MESSAGES_PER_MINUTE_PER_CHAT,
            reservoir: TELEGRAM_MAX_MESSAGES_PER_MINUTE_PER_CHAT,
            window: Duration::from_secs(60),
            window_start: Instant::now(),
            last_send: None,
        }
    }

    /// Block until one send is permitted.
    fn acquire(&mut self) {
        if self.window_start.elapsed() >= self.window {
            self.window_start = Instant::now();
            self.reservoir = self.capacity;
        }
        if self.reservoir == 0 {
            let until_reset = self.window.saturating_sub(self.window_start.elapsed());
            std::thread::sleep(until_reset);
            self.window_start = Instant::now();
            self.reservoir = self.capacity;
        }
        if let Some(last) = self.last_send {
            let since = last.elapsed();
            if since < self.min_gap {
                std::thread::sleep(self.min_gap - since);
            }
        }
        self.reservoir -= 1;
        self.last_send = Some(Instant::now());
    }
}

/// Escape text for Telegram MarkdownV2 outside of code spans.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                | '|' | '{' | '}' | '.' | '!'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split text into pieces of at most `max` characters.
///
/// A boundary never falls between a `\` and the character it escapes;
/// the backslash moves to the next piece so each piece stays valid
/// MarkdownV2 on its own.
pub fn chunk_text(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for c in text.chars() {
        if count == max {
            let trailing = current.chars().rev().take_while(|c| *c == '\\').count();
            if trailing % 2 == 1 && count > 1 {
                current.pop();
                chunks.push(std::mem::take(&mut current));
                current.push('\\');
                count = 1;
            } else {
                chunks.push(std::mem::take(&mut current));
                count = 0;
            }
        }
        current.push(c);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Format an entry as one or more MarkdownV2 messages, each within the
/// Bot API length limit.
pub fn build_messages(entry: &LogEntry, date_format: &str) -> Vec<String> {
    let date = entry
        .timestamp
        .with_timezone(&Local)
        .format(date_format)
        .to_string();

    let mut text = format!(
        "{} *{}*",
        escape_markdown_v2(&date),
        escape_markdown_v2(&level_name(entry.level))
    );
    if let Some(source) = &entry.source {
        text.push_str(&format!(" \\[{}\\]", escape_markdown_v2(source)));
    }
    if let Some(message) = &entry.message {
        text.push('\n');
        text.push_str(&escape_markdown_v2(message));
    }

    for err in &entry.errors {
        text.push_str(&format!(
            "\n\\- *{}*: {}",
            escape_markdown_v2(&err.name),
            escape_markdown_v2(&err.message)
        ));
        for cause in &err.chain {
            text.push_str(&format!("\n  {}", escape_markdown_v2(cause)));
        }
    }

    for value in &entry.context {
        let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        // Only backslash and backtick are escaped inside a code block.
        let body = pretty.replace('\\', "\\\\").replace('`', "\\`");
        text.push_str(&format!("\n```json\n{}\n```", body));
    }

    chunk_text(&text, TELEGRAM_MAX_MESSAGE_LENGTH)
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

struct TelegramDelivery {
    client: reqwest::blocking::Client,
    token: String,
    chat_id: String,
    date_format: String,
    api_base: String,
    limiter: RateLimiter,
}

impl TelegramDelivery {
    fn send(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let response = self
            .client
            .post(url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "MarkdownV2",
                "link_preview_options": { "is_disabled": true },
            }))
            .send()?;

        let status = response.status().as_u16();
        let body: ApiResponse = response.json()?;
        if status != 200 || !body.ok {
            return Err(LoggerError::remote_api(
                status,
                body.description.unwrap_or_else(|| "sendMessage failed".to_string()),
            ));
        }
        Ok(())
    }
}

impl Deliver for TelegramDelivery {
    fn deliver(&mut self, entry: &LogEntry) -> Result<()> {
        for message in build_messages(entry, &self.date_format) {
            self.limiter.acquire();
            self.send(&message)?;
        }
        Ok(())
    }
}

/// Sends entries to a Telegram chat through the Bot API.
pub struct TelegramTransport {
    inner: AsyncTransport,
}

impl TelegramTransport {
    pub fn new(options: TelegramTransportOptions) -> Result<Self> {
        if options.token.is_empty() {
            return Err(LoggerError::config("TelegramTransport", "empty bot token"));
        }
        if options.chat_id.is_empty() {
            return Err(LoggerError::config("TelegramTransport", "empty chat id"));
        }

        let delivery = TelegramDelivery {
            client: reqwest::blocking::Client::new(),
            token: options.token,
            chat_id: options.chat_id,
            date_format: options.date_format,
            api_base: options.api_base,
            limiter: RateLimiter::new(),
        };
        let inner = AsyncTransport::new("telegram", delivery, options.transport)?;
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

impl Transport for TelegramTransport {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::CapturedError;
    use serde_json::json;

    #[test]
    fn test_escape_markdown_v2() {
        assert_eq!(escape_markdown_v2("a.b-c!"), "a\\.b\\-c\\!");
        assert_eq!(escape_markdown_v2("plain text"), "plain text");
        assert_eq!(escape_markdown_v2("*bold* [link]"), "\\*bold\\* \\[link\\]");
    }

    #[test]
    fn test_chunk_text_bounds() {
        assert!(chunk_text("", 10).is_empty());
        assert_eq!(chunk_text("short", 10), vec!["short"]);

        let long = "x".repeat(9000);
        let chunks = chunk_text(&long, TELEGRAM_MAX_MESSAGE_LENGTH);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= TELEGRAM_MAX_MESSAGE_LENGTH));
        assert_eq!(chunks.concat(), long);
    }

    #[test]
    fn test_chunk_text_keeps_escape_pairs_together() {
        let text = format!("{}\\.", "x".repeat(TELEGRAM_MAX_MESSAGE_LENGTH - 1));
        let chunks = chunk_text(&text, TELEGRAM_MAX_MESSAGE_LENGTH);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "x".repeat(TELEGRAM_MAX_MESSAGE_LENGTH - 1));
        assert_eq!(chunks[1], "\\.");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunk_text_leaves_escaped_backslash_pairs_alone() {
        // Two backslashes are a complete escape; the boundary may follow them.
        let text = format!("{}\\\\z", "x".repeat(2));
        let chunks = chunk_text(&text, 4);
        assert_eq!(chunks, vec!["xx\\\\".to_string(), "z".to_string()]);
    }

    #[test]
    fn test_build_messages_escapes_and_includes_parts() {
        let mut entry = LogEntry::empty(50);
        entry.message = Some("disk.failed!".to_string());
        entry.source = Some("svc".to_string());
        entry.errors.push(CapturedError::new("IoError", "no space left"));
        entry.context.push(json!({"path": "/var/log"}));

        let messages = build_messages(&entry, "%Y-%m-%d %H:%M:%S");
        assert_eq!(messages.len(), 1);
        let text = &messages[0];
        assert!(text.contains("*ERROR*"));
        assert!(text.contains("disk\\.failed\\!"));
        assert!(text.contains("\\[svc\\]"));
        assert!(text.contains("*IoError*: no space left"));
        assert!(text.contains("```json"));
    }

    #[test]
    fn test_build_messages_splits_oversized_entries() {
        let mut entry = LogEntry::empty(30);
        entry.message = Some("y".repeat(TELEGRAM_MAX_MESSAGE_LENGTH * 2));
        let messages = build_messages(&entry, "%Y-%m-%d");
        assert!(messages.len() >= 2);
        assert!(messages
            .iter()
            .all(|m| m.chars().count() <= TELEGRAM_MAX_MESSAGE_LENGTH));
    }

    #[test]
    fn test_rate_limiter_enforces_gap() {
        let mut limiter = RateLimiter::new();
        limiter.acquire();
        let start = Instant::now();
        limiter.acquire();
        assert!(start.elapsed() >= limiter.min_gap);
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let result = TelegramTransport::new(TelegramTransportOptions::new("", "42"));
        assert!(matches!(
            result,
            Err(LoggerError::InvalidConfiguration { .. })
        ));

        let result = TelegramTransport::new(TelegramTransportOptions::new("token", ""));
        assert!(matches!(
            result,
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }
}
