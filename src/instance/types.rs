use std::path::PathBuf;

use serde::Serialize;

use crate::config::PanelConfig;

/// Launch parameters for one server process.
#[derive(Debug, Clone)]
pub struct InstanceData {
    pub root_dir: PathBuf,
    pub jar_path: PathBuf,
    pub java_path: PathBuf,
    pub memory: String,
}

impl From<&PanelConfig> for InstanceData {
    fn from(config: &PanelConfig) -> Self {
        Self {
            root_dir: config.server_dir.clone(),
            jar_path: PathBuf::from(&config.server_jar),
            java_path: config.java_path.clone(),
            memory: config.memory.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Killing,
}
