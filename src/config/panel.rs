use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{info, warn};

use crate::{config::MinecraftType, error::ConfigError};

pub const DEFAULT_SERVER_JAR: &str = "server.jar";
pub const DEFAULT_SERVER_DIR: &str = "server";
pub const DEFAULT_MEMORY: &str = "2G";
pub const DEFAULT_JAVA_PATH: &str = "java";
pub const DEFAULT_UI_PORT: u16 = 3000;

/// Persisted panel settings. Keys on disk are the camelCase names below;
/// missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelConfig {
    pub server_jar: String,
    pub server_dir: PathBuf,
    pub memory: String,
    pub java_path: PathBuf,
    pub ui_port: u16,
    pub server_type: MinecraftType,
    pub server_version: String,
}

/// Partial update sent by the UI; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelConfigUpdate {
    pub server_jar: Option<String>,
    pub server_dir: Option<PathBuf>,
    pub memory: Option<String>,
    pub java_path: Option<PathBuf>,
    pub ui_port: Option<u16>,
    pub server_type: Option<MinecraftType>,
    pub server_version: Option<String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            server_jar: DEFAULT_SERVER_JAR.to_string(),
            server_dir: PathBuf::from(DEFAULT_SERVER_DIR),
            memory: DEFAULT_MEMORY.to_string(),
            java_path: PathBuf::from(DEFAULT_JAVA_PATH),
            ui_port: DEFAULT_UI_PORT,
            server_type: MinecraftType::Vanilla,
            server_version: String::new(),
        }
    }
}

impl PanelConfig {
    /// Reads the config file, merging it over the defaults. A missing or
    /// unreadable file yields the defaults.
    pub async fn load(path: &Path) -> Self {
        match Self::try_load(path).await {
            Ok(Some(config)) => {
                info!(event = "config_loaded", path = %path.display());
                config
            }
            Ok(None) => {
                info!(event = "config_default", path = %path.display());
                Self::default()
            }
            Err(err) => {
                warn!(event = "config_invalid", path = %path.display(), error = %err);
                Self::default()
            }
        }
    }

    async fn try_load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let config = serde_json::from_slice(&data)?;
        Ok(Some(config))
    }

    /// Rewrites the whole config file.
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_vec_pretty(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(path).await?;
        file.write_all(&json).await?;
        file.flush().await?;
        Ok(())
    }

    pub fn apply(&mut self, update: PanelConfigUpdate) {
        if let Some(v) = update.server_jar {
            self.server_jar = v;
        }
        if let Some(v) = update.server_dir {
            self.server_dir = v;
        }
        if let Some(v) = update.memory {
            self.memory = v;
        }
        if let Some(v) = update.java_path {
            self.java_path = v;
        }
        if let Some(v) = update.ui_port {
            self.ui_port = v;
        }
        if let Some(v) = update.server_type {
            self.server_type = v;
        }
        if let Some(v) = update.server_version {
            self.server_version = v;
        }
    }

    pub fn jar_path(&self) -> PathBuf {
        self.server_dir.join(&self.server_jar)
    }

    pub fn properties_path(&self) -> PathBuf {
        self.server_dir.join("server.properties")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PanelConfig::load(&dir.path().join("config.json")).await;
        assert_eq!(config, PanelConfig::default());
    }

    #[tokio::test]
    async fn partial_file_is_merged_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"memory":"4G","serverType":"paper"}"#).unwrap();

        let config = PanelConfig::load(&path).await;

        assert_eq!(config.memory, "4G");
        assert_eq!(config.server_type, MinecraftType::Paper);
        assert_eq!(config.server_jar, DEFAULT_SERVER_JAR);
        assert_eq!(config.ui_port, DEFAULT_UI_PORT);
    }

    #[tokio::test]
    async fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert_eq!(PanelConfig::load(&path).await, PanelConfig::default());
    }

    #[tokio::test]
    async fn save_writes_every_key_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = PanelConfig::default();
        config.apply(PanelConfigUpdate {
            server_jar: Some("paper.jar".into()),
            ui_port: Some(8080),
            ..Default::default()
        });
        config.save(&path).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        for key in [
            "serverJar",
            "serverDir",
            "memory",
            "javaPath",
            "uiPort",
            "serverType",
            "serverVersion",
        ] {
            assert!(raw.get(key).is_some(), "missing key {key}");
        }

        let reloaded = PanelConfig::load(&path).await;
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.server_jar, "paper.jar");
        assert_eq!(reloaded.ui_port, 8080);
    }
}
