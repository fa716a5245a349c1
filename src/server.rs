pub mod actions;
pub mod domain;
pub mod download;
pub mod history;
pub mod hub;
pub mod message;
pub mod presence;
pub mod stats;

pub use actions::PlayerAction;
pub use domain::{FileEntry, Panel};
pub use download::DownloadState;
pub use message::{PanelEvent, StatusReport};
pub use presence::Player;
pub use stats::StatsSample;
