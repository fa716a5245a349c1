use chrono::{DateTime, Utc};
use serde::Serialize;

use super::StreamSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Warn,
    Error,
    System,
    Command,
}

impl From<StreamSource> for LogKind {
    fn from(source: StreamSource) -> Self {
        match source {
            StreamSource::Stdout => LogKind::Info,
            StreamSource::Stderr => LogKind::Warn,
        }
    }
}

/// One rendered line of the console view. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub text: String,
    pub kind: LogKind,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new<S: Into<String>>(text: S, kind: LogKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            kind,
            timestamp,
        }
    }

    pub fn now<S: Into<String>>(text: S, kind: LogKind) -> Self {
        Self::new(text, kind, Utc::now())
    }

    pub fn system<S: Into<String>>(text: S) -> Self {
        Self::now(text, LogKind::System)
    }

    pub fn error<S: Into<String>>(text: S) -> Self {
        Self::now(text, LogKind::Error)
    }

    pub fn command<S: Into<String>>(text: S) -> Self {
        Self::now(text, LogKind::Command)
    }
}
