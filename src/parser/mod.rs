//! Turns raw console lines into log entries and player events.
//!
//! The matching rules live in a [`LogParser`] so server distributions with
//! different wording can ship their own [`LogPatterns`] without touching the
//! supervisor.

use chrono::Utc;
use regex::Regex;

use crate::{
    config::{LogEntry, LogKind, StreamLine},
    error::ParserError,
};

/// Structured events recognised in server output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    PlayerJoined(String),
    PlayerLeft(String),
    RosterReplaced(Vec<String>),
}

/// Result of parsing one non-empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub entry: LogEntry,
    pub event: Option<ParsedEvent>,
}

pub trait LogParser: Send + Sync {
    /// Extracts at most one event from an already trimmed line.
    fn parse_event(&self, line: &str) -> Option<ParsedEvent>;

    /// Pattern capturing the `HH:MM:SS` prefix of a line, if the
    /// distribution prints one.
    fn timestamp_pattern(&self) -> Option<&Regex> {
        None
    }

    /// Trims the line, drops it when empty, tags it with its stream kind and
    /// extracts an event.
    fn parse_line(&self, raw: &StreamLine) -> Option<ParsedLine> {
        let text = raw.msg().trim();
        if text.is_empty() {
            return None;
        }

        let timestamp = self
            .timestamp_pattern()
            .and_then(|re| raw.extract_timestamp(re))
            .unwrap_or_else(Utc::now);

        Some(ParsedLine {
            entry: LogEntry::new(text, LogKind::from(raw.source), timestamp),
            event: self.parse_event(text),
        })
    }
}

/// Regex set for join, leave and roster lines. Each pattern must capture
/// the player name (join/leave) or the comma separated name list (roster)
/// in group 1.
#[derive(Debug, Clone)]
pub struct LogPatterns {
    join: Regex,
    leave: Regex,
    roster: Regex,
    timestamp: Regex,
}

impl LogPatterns {
    pub fn new(join: &str, leave: &str, roster: &str) -> Result<Self, ParserError> {
        Ok(Self {
            join: compile(join)?,
            leave: compile(leave)?,
            roster: compile(roster)?,
            timestamp: compile(r"^\[(\d{2}:\d{2}:\d{2})")?,
        })
    }

    /// Wording used by vanilla and vanilla-derived servers (Paper, Fabric,
    /// Forge).
    pub fn vanilla() -> Result<Self, ParserError> {
        Self::new(
            r": (\S+) joined the game",
            r": (\S+) left the game",
            r"There are \d+ of a max(?: of)? \d+ players online:(.*)$",
        )
    }
}

fn compile(pattern: &str) -> Result<Regex, ParserError> {
    Regex::new(pattern).map_err(|e| ParserError::InvalidPattern(e.to_string()))
}

impl LogParser for LogPatterns {
    fn parse_event(&self, line: &str) -> Option<ParsedEvent> {
        if let Some(caps) = self.join.captures(line) {
            return Some(ParsedEvent::PlayerJoined(caps[1].to_string()));
        }

        if let Some(caps) = self.leave.captures(line) {
            return Some(ParsedEvent::PlayerLeft(caps[1].to_string()));
        }

        if let Some(caps) = self.roster.captures(line) {
            let names = caps
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            return Some(ParsedEvent::RosterReplaced(names));
        }

        None
    }

    fn timestamp_pattern(&self) -> Option<&Regex> {
        Some(&self.timestamp)
    }
}
