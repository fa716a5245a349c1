use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use serde::Serialize;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
    sync::{Mutex, RwLock, mpsc, watch},
    time::{Instant, interval, sleep},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::{
        LogEntry, PanelConfig, PanelConfigUpdate, StreamLine, properties,
        stream::{EventPayload, ExitReport, InstanceEvent},
    },
    error::{PanelError, Result, ServerError},
    instance::{InstanceData, InstanceHandle, InstanceStatus, command_line},
    parser::{LogParser, LogPatterns},
    utils::{is_safe_file_name, uptime_seconds},
};

use super::{
    actions::PlayerAction,
    download::DownloadState,
    history::HistoryStore,
    hub::{BroadcastHub, VIEWER_QUEUE, encode},
    message::{PanelEvent, StatusReport},
    presence::{Player, PresenceTracker},
    stats::{StatsSample, StatsSampler},
};

pub const STATS_PERIOD: Duration = Duration::from_secs(1);
const EVENT_QUEUE: usize = 1024;

/// State touched by both output ingestion and lifecycle operations. Always
/// accessed through `Panel::core`.
#[derive(Debug, Default)]
struct Core {
    process: Option<InstanceHandle>,
    presence: PresenceTracker,
    history: HistoryStore,
}

impl Core {
    fn generation(&self) -> Option<u64> {
        self.process.as_ref().map(InstanceHandle::generation)
    }

    fn uptime(&self) -> Option<i64> {
        self.process
            .as_ref()
            .map(|p| uptime_seconds(p.started_at()))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

/// The panel's single owning context: supervised process, derived state,
/// viewers, config and the download slot.
pub struct Panel {
    core: Mutex<Core>,
    status: watch::Sender<InstanceStatus>,
    pub(super) hub: BroadcastHub,
    pub(super) config: RwLock<PanelConfig>,
    config_path: PathBuf,
    stats: RwLock<Option<StatsSample>>,
    pub(super) download: Mutex<Option<DownloadState>>,
    parser: Box<dyn LogParser>,
    pub(super) http: reqwest::Client,
    events_tx: mpsc::Sender<InstanceEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<InstanceEvent>>>,
    next_generation: AtomicU64,
    shutdown: CancellationToken,
}

impl Panel {
    pub fn new(config: PanelConfig, config_path: PathBuf) -> Result<Arc<Self>> {
        Ok(Self::with_parser(
            config,
            config_path,
            Box::new(LogPatterns::vanilla()?),
        ))
    }

    pub fn with_parser(
        config: PanelConfig,
        config_path: PathBuf,
        parser: Box<dyn LogParser>,
    ) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let (status, _) = watch::channel(InstanceStatus::Stopped);

        Arc::new(Self {
            core: Mutex::new(Core::default()),
            status,
            hub: BroadcastHub::new(),
            config: RwLock::new(config),
            config_path,
            stats: RwLock::new(None),
            download: Mutex::new(None),
            parser,
            http: reqwest::Client::new(),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            next_generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        })
    }

    /// Starts the event owner loop and the stats sampler. Calling it twice
    /// only starts the sampler again.
    pub async fn spawn_workers(self: &Arc<Self>) {
        if let Some(rx) = self.events_rx.lock().await.take() {
            tokio::spawn(self.clone().run_events(rx));
        }
        tokio::spawn(self.clone().run_stats());
    }

    async fn run_events(self: Arc<Self>, mut rx: mpsc::Receiver<InstanceEvent>) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    break;
                }
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_instance_event(event).await,
                        None => break,
                    }
                }
            }
        }
        debug!(event = "event_loop_closed");
    }

    async fn run_stats(self: Arc<Self>) {
        let mut sampler = StatsSampler::new();
        let mut ticker = interval(STATS_PERIOD);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    break;
                }
                _ = ticker.tick() => {
                    let sample = sampler.sample().await;
                    *self.stats.write().await = Some(sample);
                    self.hub.broadcast(&PanelEvent::Stats(sample)).await;
                }
            }
        }
    }

    async fn handle_instance_event(&self, event: InstanceEvent) {
        debug!(event = "instance_event", detail = %event);
        match event.payload {
            EventPayload::StdLine { line } => self.ingest_line(event.generation, &line).await,
            EventPayload::Exited { report } => self.handle_exit(event.generation, report).await,
        }
    }

    /// Parses one output line into the history and, for the live process,
    /// into the roster.
    async fn ingest_line(&self, generation: u64, line: &StreamLine) {
        let Some(parsed) = self.parser.parse_line(line) else {
            return;
        };

        let mut core = self.core.lock().await;
        self.append_locked(&mut core, parsed.entry).await;

        let Some(event) = parsed.event else {
            return;
        };
        if core.generation() != Some(generation) {
            debug!(event = "stale_player_event", generation);
            return;
        }
        core.presence.apply(&event);
        self.broadcast_players(&core).await;
    }

    async fn handle_exit(&self, generation: u64, report: ExitReport) {
        let mut core = self.core.lock().await;
        if core.generation() != Some(generation) {
            debug!(event = "stale_exit", generation);
            return;
        }

        core.process = None;
        core.presence.clear();
        self.status.send_replace(InstanceStatus::Stopped);

        self.append_locked(
            &mut core,
            LogEntry::system(format!("Server process exited ({report})")),
        )
        .await;
        self.broadcast_players(&core).await;
        self.broadcast_status(&core).await;
        info!(event = "server_exited", generation, code = %report);
    }

    async fn append_locked(&self, core: &mut Core, entry: LogEntry) {
        core.history.append(entry.clone());
        self.hub.broadcast(&PanelEvent::Log { entry }).await;
    }

    /// Appends an entry produced outside the server process.
    pub async fn push_log(&self, entry: LogEntry) {
        let mut core = self.core.lock().await;
        self.append_locked(&mut core, entry).await;
    }

    async fn broadcast_players(&self, core: &Core) {
        self.hub
            .broadcast(&PanelEvent::Players {
                players: core.presence.snapshot(),
            })
            .await;
    }

    async fn broadcast_status(&self, core: &Core) {
        self.hub
            .broadcast(&PanelEvent::Status(self.status_locked(core)))
            .await;
    }

    fn status_locked(&self, core: &Core) -> StatusReport {
        let state = *self.status.borrow();
        StatusReport {
            running: core.process.is_some(),
            state,
            players: core.presence.snapshot(),
            uptime: core.uptime(),
        }
    }

    fn set_status(&self, status: InstanceStatus) {
        self.status.send_replace(status);
    }

    // Process supervision

    pub async fn start(&self) -> Result<()> {
        let config = self.config.read().await.clone();
        let mut core = self.core.lock().await;

        if core.process.is_some() {
            return Err(ServerError::AlreadyRunning.into());
        }

        let jar = config.jar_path();
        let jar_present = fs::metadata(&jar)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !jar_present {
            return Err(ServerError::ArtifactMissing(jar.display().to_string()).into());
        }

        if self.accept_eula(&config.server_dir).await? {
            self.append_locked(
                &mut core,
                LogEntry::system("Accepted the Minecraft EULA (eula.txt written)"),
            )
            .await;
        }

        self.set_status(InstanceStatus::Starting);
        let data = InstanceData::from(&config);
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.append_locked(
            &mut core,
            LogEntry::system(format!("Starting server: {}", command_line(&data))),
        )
        .await;

        match InstanceHandle::spawn(&data, generation, self.events_tx.clone()) {
            Ok(handle) => {
                let pid = handle.pid();
                core.process = Some(handle);
                self.set_status(InstanceStatus::Running);
                self.broadcast_status(&core).await;
                info!(event = "server_started", generation, pid = ?pid, jar = %jar.display());
                Ok(())
            }
            Err(err) => {
                core.process = None;
                self.set_status(InstanceStatus::Stopped);
                self.append_locked(
                    &mut core,
                    LogEntry::system(format!("Failed to start server: {err}")),
                )
                .await;
                self.broadcast_status(&core).await;
                warn!(event = "server_spawn_failed", error = %err);
                Err(err.into())
            }
        }
    }

    /// Writes `eula.txt` when absent. Returns whether it was written.
    async fn accept_eula(&self, server_dir: &Path) -> Result<bool> {
        let eula_path = server_dir.join("eula.txt");
        if fs::try_exists(&eula_path).await.unwrap_or(false) {
            return Ok(false);
        }

        let mut out = File::create(&eula_path)
            .await
            .map_err(|e| ServerError::WriteEULAFailed(e.to_string()))?;

        out.write_all(b"#Generated by MineGuard\neula=true\n")
            .await
            .map_err(|e| ServerError::WriteEULAFailed(e.to_string()))?;

        Ok(true)
    }

    /// Asks the server to shut down by itself. Returns without waiting for
    /// the exit.
    pub async fn stop(&self) -> Result<()> {
        let mut core = self.core.lock().await;
        let Some(handle) = core.process.as_ref() else {
            return Err(ServerError::NotRunning.into());
        };

        handle.send_command("stop")?;
        self.set_status(InstanceStatus::Stopping);
        self.append_locked(&mut core, LogEntry::system("Stopping server"))
            .await;
        self.broadcast_status(&core).await;
        Ok(())
    }

    /// Terminates the server immediately. Unsaved world data is lost.
    pub async fn kill(&self) -> Result<()> {
        let mut core = self.core.lock().await;
        let Some(handle) = core.process.as_ref() else {
            return Err(ServerError::NotRunning.into());
        };

        handle.kill();
        self.set_status(InstanceStatus::Killing);
        self.append_locked(&mut core, LogEntry::system("Killing server process"))
            .await;
        self.broadcast_status(&core).await;
        Ok(())
    }

    pub async fn send_command(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServerError::EmptyCommand.into());
        }

        let mut core = self.core.lock().await;
        let Some(handle) = core.process.as_ref() else {
            return Err(ServerError::NotRunning.into());
        };

        handle.send_command(text)?;
        self.append_locked(&mut core, LogEntry::command(text)).await;
        Ok(())
    }

    pub async fn player_action(
        &self,
        action: &str,
        player: &str,
        argument: Option<&str>,
    ) -> Result<String> {
        let action: PlayerAction = action.parse()?;
        let command = action.command(player, argument);
        self.send_command(&command).await?;
        Ok(command)
    }

    /// Stops the server if needed, escalating to a kill after `grace`, then
    /// ends the background workers.
    pub async fn shutdown(&self, grace: Duration) {
        match self.stop().await {
            Err(PanelError::Server(ServerError::NotRunning)) => {}
            Ok(()) => {
                info!(event = "shutdown_stopping_server");
                let mut rx = self.status.subscribe();
                let stopped = tokio::time::timeout(
                    grace,
                    rx.wait_for(|s| *s == InstanceStatus::Stopped),
                )
                .await
                .is_ok();
                if !stopped {
                    warn!(event = "shutdown_kill_server", reason = "grace elapsed");
                    self.kill_and_wait().await;
                }
            }
            Err(err) => {
                warn!(event = "shutdown_kill_server", reason = %err);
                self.kill_and_wait().await;
            }
        }
        self.shutdown.cancel();
    }

    async fn kill_and_wait(&self) {
        _ = self.kill().await;
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.is_running().await && Instant::now() < deadline {
            sleep(Duration::from_millis(50)).await;
        }
    }

    // Read side

    pub async fn is_running(&self) -> bool {
        self.core.lock().await.process.is_some()
    }

    pub async fn status(&self) -> StatusReport {
        let core = self.core.lock().await;
        self.status_locked(&core)
    }

    pub fn subscribe_status(&self) -> watch::Receiver<InstanceStatus> {
        self.status.subscribe()
    }

    pub async fn players(&self) -> Vec<Player> {
        self.core.lock().await.presence.snapshot()
    }

    pub async fn history(&self) -> Vec<LogEntry> {
        self.core.lock().await.history.snapshot()
    }

    pub async fn uptime(&self) -> Option<i64> {
        self.core.lock().await.uptime()
    }

    pub async fn config(&self) -> PanelConfig {
        self.config.read().await.clone()
    }

    pub async fn stats(&self) -> Option<StatsSample> {
        *self.stats.read().await
    }

    // Viewers

    /// Registers a viewer and queues its catch-up messages: history, status,
    /// config, stats and download state, in that order. The history snapshot
    /// and registration happen under the core lock, so no entry is missed or
    /// sent twice.
    pub async fn attach_viewer(&self) -> (Uuid, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(VIEWER_QUEUE);
        let config = self.config().await;
        let stats = self.stats().await;
        let download = self.download.lock().await.clone();

        let core = self.core.lock().await;
        let mut replay = vec![
            PanelEvent::History {
                entries: core.history.snapshot(),
            },
            PanelEvent::Status(self.status_locked(&core)),
            PanelEvent::Config(config),
        ];
        if let Some(sample) = stats {
            replay.push(PanelEvent::Stats(sample));
        }
        if let Some(state) = download {
            replay.push(PanelEvent::Download(state));
        }

        for event in &replay {
            if let Some(text) = encode(event) {
                _ = tx.try_send(text);
            }
        }
        let id = self.hub.register(tx).await;
        drop(core);

        (id, rx)
    }

    pub async fn detach_viewer(&self, id: &Uuid) {
        self.hub.unregister(id).await;
    }

    /// Encoded uptime tick, present only while a process runs.
    pub async fn uptime_message(&self) -> Option<String> {
        let seconds = self.uptime().await?;
        encode(&PanelEvent::Uptime { seconds })
    }

    // Config and files

    /// Applies `update`, persists the result and only then swaps it in.
    pub async fn save_config(&self, update: PanelConfigUpdate) -> Result<PanelConfig> {
        let saved = {
            let mut current = self.config.write().await;
            let mut next = current.clone();
            next.apply(update);
            next.save(&self.config_path).await?;
            *current = next.clone();
            next
        };
        info!(event = "config_saved", path = %self.config_path.display());
        self.hub.broadcast(&PanelEvent::Config(saved.clone())).await;
        Ok(saved)
    }

    pub async fn properties(&self) -> Result<Vec<(String, String)>> {
        let path = self.config.read().await.properties_path();
        Ok(properties::read(&path).await?)
    }

    pub async fn save_properties(&self, updates: &[(String, String)]) -> Result<()> {
        let path = self.config.read().await.properties_path();
        properties::write(&path, updates).await?;
        info!(event = "properties_saved", path = %path.display(), keys = updates.len());
        Ok(())
    }

    pub async fn list_files(&self) -> Result<Vec<FileEntry>> {
        let dir = self.config.read().await.server_dir.clone();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            files.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
                is_dir: meta.is_dir(),
            });
        }
        files.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
        Ok(files)
    }

    async fn resolve_file(&self, name: &str) -> Result<PathBuf> {
        if !is_safe_file_name(name) {
            return Err(PanelError::InvalidFileName(name.to_string()));
        }
        Ok(self.config.read().await.server_dir.join(name))
    }

    pub async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve_file(name).await?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        info!(event = "file_uploaded", file = %path.display(), size = bytes.len());
        Ok(())
    }

    pub async fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.resolve_file(name).await?;
        let meta = fs::metadata(&path).await?;
        if meta.is_dir() {
            fs::remove_dir_all(&path).await?;
        } else {
            fs::remove_file(&path).await?;
        }
        info!(event = "file_deleted", file = %path.display());
        Ok(())
    }
}
