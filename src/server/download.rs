//! Fetching server artifacts and running the Forge installer.
//!
//! A download is one sequential task: resolve, stream to `<name>.part`,
//! rename, optionally install, then switch the config over. Progress is
//! published as [`PanelEvent::Download`] snapshots. There is no way to cancel
//! a transfer once accepted.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use serde::Serialize;
use tokio::{
    fs::{self, File},
    io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader},
    process::Command,
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    config::{LogEntry, LogKind, MinecraftType, MinecraftVersion, PanelConfigUpdate},
    error::{PanelError, Result},
    manifests::{Artifact, source_for},
};

use super::{domain::Panel, message::PanelEvent};

/// Minimum spacing between two progress broadcasts.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadState {
    pub artifact_name: String,
    pub bytes_received: u64,
    pub bytes_total: Option<u64>,
    pub done: bool,
    pub error: Option<String>,
}

impl DownloadState {
    pub fn pending<S: Into<String>>(artifact_name: S) -> Self {
        Self {
            artifact_name: artifact_name.into(),
            bytes_received: 0,
            bytes_total: None,
            done: false,
            error: None,
        }
    }

    pub fn in_flight(&self) -> bool {
        !self.done && self.error.is_none()
    }
}

impl Panel {
    /// Accepts a download of `version` for `kind` and runs it in the
    /// background. Fails right away if another download is still in flight
    /// or the version is malformed.
    pub async fn download(self: &Arc<Self>, kind: MinecraftType, version: &str) -> Result<()> {
        let version = version.trim();
        {
            let mut slot = self.download.lock().await;
            if slot.as_ref().is_some_and(DownloadState::in_flight) {
                return Err(PanelError::DownloadInProgress);
            }
            version.parse::<MinecraftVersion>()?;

            let state = DownloadState::pending(format!("{kind} {version}"));
            *slot = Some(state.clone());
            self.hub.broadcast(&PanelEvent::Download(state)).await;
        }

        info!(event = "download_accepted", kind = %kind, version);
        tokio::spawn(self.clone().run_download(kind, version.to_string()));
        Ok(())
    }

    async fn run_download(self: Arc<Self>, kind: MinecraftType, version: String) {
        self.push_log(LogEntry::system(format!(
            "Downloading {kind} server {version}"
        )))
        .await;

        match self.fetch_and_install(kind, &version).await {
            Ok(jar) => {
                self.update_download(|s| s.done = true).await;
                self.push_log(LogEntry::system(format!(
                    "Download complete: {jar} is now the server jar"
                )))
                .await;
                info!(event = "download_complete", kind = %kind, version, jar);
            }
            Err(err) => {
                let message = err.to_string();
                self.update_download(|s| s.error = Some(message.clone()))
                    .await;
                self.push_log(LogEntry::error(message)).await;
                warn!(event = "download_failed", kind = %kind, version, error = %err);
            }
        }
    }

    async fn fetch_and_install(&self, kind: MinecraftType, version: &str) -> Result<String> {
        let artifact = source_for(kind).resolve(&self.http, version).await?;
        let server_dir = self.config.read().await.server_dir.clone();

        self.update_download(|s| {
            s.artifact_name = artifact.file_name.clone();
            s.bytes_total = artifact.size;
        })
        .await;

        let path = self.fetch_artifact(&artifact, &server_dir).await?;
        let jar = if artifact.installer {
            self.run_installer(&path, &server_dir).await?
        } else {
            artifact.file_name.clone()
        };

        self.save_config(PanelConfigUpdate {
            server_jar: Some(jar.clone()),
            server_type: Some(kind),
            server_version: Some(version.to_string()),
            ..Default::default()
        })
        .await?;

        Ok(jar)
    }

    /// Streams `artifact` into `dir`. The file only appears under its final
    /// name once complete.
    pub(crate) async fn fetch_artifact(&self, artifact: &Artifact, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).await?;
        let target = dir.join(&artifact.file_name);
        let part = dir.join(format!("{}.part", artifact.file_name));

        let result = self.stream_to_file(&artifact.url, &part).await;
        if let Err(err) = result {
            if let Err(cleanup) = fs::remove_file(&part).await {
                debug!(event = "part_cleanup_failed", file = %part.display(), error = %cleanup);
            }
            return Err(err);
        }

        fs::rename(&part, &target).await?;
        Ok(target)
    }

    async fn stream_to_file(&self, url: &str, part: &Path) -> Result<()> {
        let network = |e: reqwest::Error| PanelError::DownloadFailure(e.to_string());

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(network)?;

        if let Some(len) = response.content_length() {
            self.update_download(|s| s.bytes_total = Some(len)).await;
        }

        let mut file = File::create(part).await?;
        let mut received = 0u64;
        let mut last_report = Instant::now();

        while let Some(chunk) = response.chunk().await.map_err(network)? {
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            if last_report.elapsed() >= PROGRESS_INTERVAL {
                last_report = Instant::now();
                self.update_download(|s| s.bytes_received = received).await;
            }
        }
        file.flush().await?;

        self.update_download(|s| s.bytes_received = received).await;
        Ok(())
    }

    /// Runs `java -jar <installer> --installServer` in `dir` and returns the
    /// name of the jar it produced.
    async fn run_installer(&self, installer: &Path, dir: &Path) -> Result<String> {
        let java = self.config.read().await.java_path.clone();
        self.push_log(LogEntry::system("Running Forge installer"))
            .await;

        let mut child = Command::new(&java)
            .arg("-jar")
            .arg(installer)
            .arg("--installServer")
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PanelError::InstallerFailure(e.to_string()))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (status, _, _) = tokio::join!(
            child.wait(),
            self.forward_output(stdout, LogKind::Info),
            self.forward_output(stderr, LogKind::Warn),
        );
        let status = status.map_err(|e| PanelError::InstallerFailure(e.to_string()))?;

        remove_installer_leftovers(installer).await;

        if !status.success() {
            return Err(PanelError::InstallerFailure(format!(
                "installer exited with {status}"
            )));
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        let stem = installer
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix("-installer.jar"))
            .unwrap_or("forge-");
        pick_server_jar(&names, stem).ok_or_else(|| {
            PanelError::InstallerFailure("installer did not produce a server jar".into())
        })
    }

    async fn forward_output<R: AsyncRead + Unpin>(&self, stream: Option<R>, kind: LogKind) {
        let Some(stream) = stream else {
            return;
        };
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let text = line.trim();
            if !text.is_empty() {
                self.push_log(LogEntry::now(text, kind)).await;
            }
        }
    }

    /// Mutates the current download state and broadcasts the result.
    async fn update_download<F: FnOnce(&mut DownloadState)>(&self, apply: F) {
        let mut slot = self.download.lock().await;
        if let Some(state) = slot.as_mut() {
            apply(state);
            self.hub
                .broadcast(&PanelEvent::Download(state.clone()))
                .await;
        }
    }

    pub async fn download_state(&self) -> Option<DownloadState> {
        self.download.lock().await.clone()
    }

    /// Versions offered for `kind`, newest first.
    pub async fn versions(&self, kind: MinecraftType) -> Result<Vec<String>> {
        Ok(source_for(kind).versions(&self.http).await?)
    }
}

async fn remove_installer_leftovers(installer: &Path) {
    let log = installer.with_extension("jar.log");
    for path in [installer.to_path_buf(), log] {
        if let Err(err) = fs::remove_file(&path).await {
            debug!(event = "installer_cleanup_skipped", file = %path.display(), error = %err);
        }
    }
}

/// Chooses the runnable jar the Forge installer produced for `stem`
/// (`forge-<mc>-<build>`). Jars from other installs are ignored.
fn pick_server_jar(names: &[String], stem: &str) -> Option<String> {
    let mut candidates: Vec<&String> = names
        .iter()
        .filter(|n| {
            n.strip_prefix(stem).is_some_and(|rest| {
                rest == ".jar" || (rest.starts_with('-') && rest.ends_with(".jar"))
            })
        })
        .filter(|n| !n.ends_with("-installer.jar"))
        .collect();
    candidates.sort();

    candidates
        .iter()
        .find(|n| n.ends_with("-shim.jar"))
        .or_else(|| candidates.iter().find(|n| n.contains("universal")))
        .or_else(|| candidates.first())
        .map(|n| n.to_string())
}

#[cfg(test)]
mod tests {
    use axum::{Router, routing::get};
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::PanelConfig;

    fn panel_in(dir: &Path) -> Arc<Panel> {
        let config = PanelConfig {
            server_dir: dir.to_path_buf(),
            ..PanelConfig::default()
        };
        Panel::new(config, dir.join("panel.json")).unwrap()
    }

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn in_flight_until_done_or_errored() {
        let mut state = DownloadState::pending("paper 1.21.1");
        assert!(state.in_flight());
        state.done = true;
        assert!(!state.in_flight());

        let mut failed = DownloadState::pending("paper 1.21.1");
        failed.error = Some("boom".into());
        assert!(!failed.in_flight());
    }

    #[tokio::test]
    async fn second_download_is_rejected_while_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let panel = panel_in(dir.path());
        let pending = DownloadState::pending("vanilla 1.21.1");
        *panel.download.lock().await = Some(pending.clone());

        let err = panel
            .download(MinecraftType::Vanilla, "1.20.4")
            .await
            .unwrap_err();

        assert!(matches!(err, PanelError::DownloadInProgress));
        assert_eq!(panel.download_state().await, Some(pending));
    }

    #[tokio::test]
    async fn malformed_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let panel = panel_in(dir.path());

        let err = panel
            .download(MinecraftType::Paper, "latest-please")
            .await
            .unwrap_err();

        assert!(matches!(err, PanelError::InvalidVersion(_)));
        assert_eq!(panel.download_state().await, None);
    }

    #[tokio::test]
    async fn artifact_is_streamed_then_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let panel = panel_in(dir.path());
        *panel.download.lock().await = Some(DownloadState::pending("vanilla 1.21.1"));
        let body = vec![7u8; 64 * 1024];
        let served = body.clone();
        let base = serve(Router::new().route("/server.jar", get(move || async move { served }))).await;

        let artifact = Artifact {
            file_name: "minecraft_server.1.21.1.jar".into(),
            url: format!("{base}/server.jar"),
            size: None,
            installer: false,
        };
        let path = panel.fetch_artifact(&artifact, dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join("minecraft_server.1.21.1.jar"));
        assert_eq!(std::fs::read(&path).unwrap(), body);
        assert!(!dir.path().join("minecraft_server.1.21.1.jar.part").exists());
        let state = panel.download_state().await.unwrap();
        assert_eq!(state.bytes_received, body.len() as u64);
        assert_eq!(state.bytes_total, Some(body.len() as u64));
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let panel = panel_in(dir.path());
        let base = serve(Router::new()).await;

        let artifact = Artifact {
            file_name: "paper-1.21.1-100.jar".into(),
            url: format!("{base}/missing.jar"),
            size: None,
            installer: false,
        };
        let err = panel.fetch_artifact(&artifact, dir.path()).await.unwrap_err();

        assert!(matches!(err, PanelError::DownloadFailure(_)));
        assert!(!dir.path().join("paper-1.21.1-100.jar").exists());
        assert!(!dir.path().join("paper-1.21.1-100.jar.part").exists());
    }

    #[test]
    fn forge_jar_selection() {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(
            pick_server_jar(
                &names(&[
                    "forge-1.20.4-49.0.3-installer.jar",
                    "forge-1.20.4-49.0.3-shim.jar",
                    "run.sh",
                ]),
                "forge-1.20.4-49.0.3",
            ),
            Some("forge-1.20.4-49.0.3-shim.jar".into())
        );
        assert_eq!(
            pick_server_jar(
                &names(&[
                    "forge-1.12.2-14.23.5.2860.jar",
                    "forge-1.12.2-14.23.5.2860-universal.jar",
                ]),
                "forge-1.12.2-14.23.5.2860",
            ),
            Some("forge-1.12.2-14.23.5.2860-universal.jar".into())
        );
        assert_eq!(
            pick_server_jar(
                &names(&["forge-1.8.9-11.15.1.2318-1.8.9.jar", "eula.txt"]),
                "forge-1.8.9-11.15.1.2318",
            ),
            Some("forge-1.8.9-11.15.1.2318-1.8.9.jar".into())
        );
        assert_eq!(
            pick_server_jar(&names(&["forge-1.20.1-installer.jar"]), "forge-1.20.1"),
            None
        );
    }

    #[test]
    fn forge_jar_from_previous_install_is_ignored() {
        let names = vec![
            "forge-1.20.1-47.3.0-shim.jar".to_string(),
            "forge-1.21.1-52.0.1-shim.jar".to_string(),
        ];

        assert_eq!(
            pick_server_jar(&names, "forge-1.21.1-52.0.1"),
            Some("forge-1.21.1-52.0.1-shim.jar".into())
        );
        assert_eq!(pick_server_jar(&names, "forge-1.19.2-43.3.0"), None);
    }
}
