use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Severity markers in plain text lines: `[ERROR]`, `WARN:`, ` info `, ...
static TEXT_LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\[\s])(trace|debug|info|warn|warning|error|err|fatal|panic|critical|crit)(?:[\]:\s]|$)")
        .expect("text level regex")
});

/// Field names loggers commonly use for the severity
const LEVEL_FIELDS: [&str; 7] = ["level", "lvl", "severity", "log.level", "loglevel", "log_level", "Level"];

/// Field names loggers commonly use for the message
const MESSAGE_FIELDS: [&str; 5] = ["message", "msg", "log", "text", "body"];

/// Log severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    #[default]
    Unknown,
}

impl LogLevel {
    /// Parse log level from common spellings
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" | "trc" => Self::Trace,
            "debug" | "dbg" => Self::Debug,
            "info" | "inf" | "information" => Self::Info,
            "warn" | "warning" | "wrn" => Self::Warn,
            "error" | "err" => Self::Error,
            "fatal" | "panic" | "critical" | "crit" => Self::Fatal,
            _ => Self::Unknown,
        }
    }

    /// Numeric levels as used by bunyan/pino style loggers
    fn from_number(n: u64) -> Self {
        match n {
            0..=10 => Self::Trace,
            11..=20 => Self::Debug,
            21..=30 => Self::Info,
            31..=40 => Self::Warn,
            41..=50 => Self::Error,
            _ => Self::Fatal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Unknown => "unknown",
        }
    }
}

/// Structure extracted from one raw log line
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedLine<'a> {
    /// Timestamp prefix added by the API server (`timestamps=true`)
    pub timestamp: Option<DateTime<Utc>>,

    /// The line without its timestamp prefix
    pub body: &'a str,

    pub level: LogLevel,

    /// Top-level fields if the body is a JSON object
    pub fields: Option<Map<String, Value>>,
}

impl ParsedLine<'_> {
    /// The message field of a JSON line, or the whole body
    pub fn message(&self) -> &str {
        self.fields
            .as_ref()
            .and_then(|fields| {
                MESSAGE_FIELDS
                    .iter()
                    .find_map(|key| fields.get(*key).and_then(Value::as_str))
            })
            .unwrap_or(self.body)
    }
}

/// Log parser for extracting structure from raw log lines
pub struct LogParser;

impl LogParser {
    pub fn parse(raw: &str) -> ParsedLine<'_> {
        let (timestamp, body) = Self::split_timestamp(raw);

        match Self::json_fields(body) {
            Some(fields) => ParsedLine {
                timestamp,
                body,
                level: Self::level_from_fields(&fields),
                fields: Some(fields),
            },
            None => ParsedLine {
                timestamp,
                body,
                level: Self::level_from_text(body),
                fields: None,
            },
        }
    }

    /// Split an RFC 3339 prefix such as `2024-01-15T10:30:00.123456789Z`
    fn split_timestamp(raw: &str) -> (Option<DateTime<Utc>>, &str) {
        let Some((prefix, rest)) = raw.split_once(' ') else {
            return (None, raw);
        };
        match DateTime::parse_from_rfc3339(prefix) {
            Ok(ts) => (Some(ts.with_timezone(&Utc)), rest),
            Err(_) => (None, raw),
        }
    }

    fn json_fields(body: &str) -> Option<Map<String, Value>> {
        let trimmed = body.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        match serde_json::from_str(trimmed).ok()? {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    fn level_from_fields(fields: &Map<String, Value>) -> LogLevel {
        LEVEL_FIELDS
            .iter()
            .filter_map(|key| fields.get(*key))
            .find_map(|value| match value {
                Value::String(s) => Some(LogLevel::parse(s)),
                Value::Number(n) => n.as_u64().map(LogLevel::from_number),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn level_from_text(body: &str) -> LogLevel {
        TEXT_LEVEL
            .captures(body)
            .map(|caps| LogLevel::parse(&caps[1]))
            .unwrap_or_default()
    }
}
