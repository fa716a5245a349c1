use serde::Serialize;

use crate::{
    config::{LogEntry, PanelConfig},
    instance::InstanceStatus,
};

use super::{download::DownloadState, presence::Player, stats::StatsSample};

/// Run state, roster and uptime as seen by viewers and `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub running: bool,
    pub state: InstanceStatus,
    pub players: Vec<Player>,
    pub uptime: Option<i64>,
}

/// Messages pushed to viewers, serialized as JSON objects tagged by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PanelEvent {
    History {
        entries: Vec<LogEntry>,
    },
    Log {
        entry: LogEntry,
    },
    Players {
        players: Vec<Player>,
    },
    Uptime {
        seconds: i64,
    },
    Status(StatusReport),
    Stats(StatsSample),
    Download(DownloadState),
    Config(PanelConfig),
}

impl PanelEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PanelEvent::History { .. } => "history",
            PanelEvent::Log { .. } => "log",
            PanelEvent::Players { .. } => "players",
            PanelEvent::Uptime { .. } => "uptime",
            PanelEvent::Status(_) => "status",
            PanelEvent::Stats(_) => "stats",
            PanelEvent::Download(_) => "download",
            PanelEvent::Config(_) => "config",
        }
    }
}
