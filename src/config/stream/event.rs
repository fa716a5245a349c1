use std::fmt::{self, Display};

use super::line::StreamLine;

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// `None` when the process was ended by a signal.
    pub code: Option<i32>,
}

impl Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "code {}", code),
            None => write!(f, "signal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    StdLine { line: StreamLine },

    Exited { report: ExitReport },
}

/// Message from a running instance's pump tasks to the panel's owner loop.
/// `generation` numbers the process lifetime that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceEvent {
    pub generation: u64,

    pub payload: EventPayload,
}

impl InstanceEvent {
    pub fn line(generation: u64, line: StreamLine) -> Self {
        Self {
            generation,
            payload: EventPayload::StdLine { line },
        }
    }

    pub fn exited(generation: u64, report: ExitReport) -> Self {
        Self {
            generation,
            payload: EventPayload::Exited { report },
        }
    }
}

impl Display for InstanceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            EventPayload::StdLine { line } => {
                write!(f, "[#{} {:?}] {}", self.generation, line.source, line)
            }
            EventPayload::Exited { report } => {
                write!(f, "[#{}] exited ({})", self.generation, report)
            }
        }
    }
}
