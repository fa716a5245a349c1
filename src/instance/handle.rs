use std::{process::Stdio, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, BufWriter},
    process::{self, Child, ChildStdin},
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::stream::{ExitReport, InstanceEvent, StreamLine, StreamSource},
    error::ServerError,
};

use super::InstanceData;

/// How long the exit report waits for the output pumps to hit EOF.
const PUMP_DRAIN: Duration = Duration::from_secs(2);

/// Commands waiting for the stdin writer.
const STDIN_QUEUE: usize = 1024;

/// A live server process. The child itself is owned by a waiter task; this
/// handle only reaches it through the stdin queue and the kill token.
#[derive(Debug)]
pub struct InstanceHandle {
    generation: u64,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    stdin_tx: mpsc::Sender<String>,
    kill: CancellationToken,
}

impl InstanceHandle {
    /// Launches the server and wires its streams into `events`. Every line
    /// and the final exit report are tagged with `generation`.
    pub fn spawn(
        data: &InstanceData,
        generation: u64,
        events: mpsc::Sender<InstanceEvent>,
    ) -> Result<Self, ServerError> {
        let mut child = build_start_command(data)
            .spawn()
            .map_err(|e| ServerError::SpawnFailure(e.to_string()))?;

        let pipes = take_pipes(&mut child);
        let (stdout, stderr, stdin) = match pipes {
            Ok(pipes) => pipes,
            Err(err) => {
                _ = child.start_kill();
                return Err(err);
            }
        };

        let pid = child.id();
        let kill = CancellationToken::new();
        let closed = CancellationToken::new();
        let (stdin_tx, stdin_rx) = mpsc::channel(STDIN_QUEUE);

        let stdout_pump = pump(stdout, StreamSource::Stdout, generation, events.clone());
        let stderr_pump = pump(stderr, StreamSource::Stderr, generation, events.clone());
        spawn_stdin_writer(stdin, stdin_rx, closed.clone());
        spawn_waiter(
            child,
            generation,
            kill.clone(),
            closed,
            [stdout_pump, stderr_pump],
            events,
        );

        info!(event = "instance_spawned", generation, pid = ?pid);

        Ok(Self {
            generation,
            pid,
            started_at: Utc::now(),
            stdin_tx,
            kill,
        })
    }

    /// Queues a line for the child's stdin without waiting. A full queue
    /// means the child stopped reading and is reported as a write failure.
    pub fn send_command<S: Into<String>>(&self, cmd: S) -> Result<(), ServerError> {
        let mut command = cmd.into();
        if !command.ends_with('\n') {
            command.push('\n');
        }

        self.stdin_tx.try_send(command).map_err(|err| {
            let full = matches!(err, mpsc::error::TrySendError::Full(_));
            warn!(event = "stdin_rejected", generation = self.generation, full);
            ServerError::StdinWriteFailed
        })
    }

    /// Requests immediate termination. The exit report still arrives through
    /// the event channel.
    pub fn kill(&self) {
        info!(event = "instance_kill", generation = self.generation, pid = ?self.pid);
        self.kill.cancel();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

pub fn build_start_command(data: &InstanceData) -> process::Command {
    let mut command = process::Command::new(&data.java_path);
    command
        .args(start_args(data))
        .current_dir(&data.root_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::piped());

    #[cfg(unix)]
    command.process_group(0);

    command
}

fn start_args(data: &InstanceData) -> Vec<String> {
    vec![
        format!("-Xms{}", data.memory),
        format!("-Xmx{}", data.memory),
        "-jar".to_string(),
        data.jar_path.to_string_lossy().into_owned(),
    ]
}

/// Printable form of the launch command for the console.
pub fn command_line(data: &InstanceData) -> String {
    let mut line = data.java_path.to_string_lossy().into_owned();
    for arg in start_args(data) {
        line.push(' ');
        line.push_str(&arg);
    }
    line
}

type Pipes = (
    process::ChildStdout,
    process::ChildStderr,
    process::ChildStdin,
);

fn take_pipes(child: &mut Child) -> Result<Pipes, ServerError> {
    let stdout = child.stdout.take().ok_or(ServerError::NoStdoutPipe)?;
    let stderr = child.stderr.take().ok_or(ServerError::NoStderrPipe)?;
    let stdin = child.stdin.take().ok_or(ServerError::NoStdinPipe)?;
    Ok((stdout, stderr, stdin))
}

fn pump<R>(
    reader: R,
    source: StreamSource,
    generation: u64,
    events: mpsc::Sender<InstanceEvent>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = StreamLine::from_bytes(&buf, source);
                    if events
                        .send(InstanceEvent::line(generation, line))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(err) => {
                    warn!(event = "pump_read_error", generation, source = ?source, error = %err);
                    break;
                }
            }
        }
        debug!(event = "pump_closed", generation, source = ?source);
    })
}

fn spawn_stdin_writer(
    stdin: ChildStdin,
    mut stdin_rx: mpsc::Receiver<String>,
    closed: CancellationToken,
) {
    tokio::spawn(async move {
        let mut writer = BufWriter::new(stdin);

        loop {
            tokio::select! {
                _ = closed.cancelled() => {
                    break;
                }
                maybe_cmd = stdin_rx.recv() => {
                    let Some(cmd) = maybe_cmd else {
                        break;
                    };
                    let written = async {
                        writer.write_all(cmd.as_bytes()).await?;
                        writer.flush().await
                    };
                    if let Err(err) = written.await {
                        warn!(event = "stdin_write_error", error = %err);
                    }
                }
            }
        }
    });
}

fn spawn_waiter(
    mut child: Child,
    generation: u64,
    kill: CancellationToken,
    closed: CancellationToken,
    pumps: [JoinHandle<()>; 2],
    events: mpsc::Sender<InstanceEvent>,
) {
    tokio::spawn(async move {
        let early = tokio::select! {
            status = child.wait() => Some(status),
            _ = kill.cancelled() => None,
        };

        let status = match early {
            Some(status) => status,
            None => {
                if let Err(err) = child.start_kill() {
                    warn!(event = "kill_failed", generation, error = %err);
                }
                child.wait().await
            }
        };

        let report = match status {
            Ok(status) => ExitReport {
                code: status.code(),
            },
            Err(err) => {
                warn!(event = "wait_failed", generation, error = %err);
                ExitReport { code: None }
            }
        };

        let drained = timeout(PUMP_DRAIN, async {
            for pump in pumps {
                _ = pump.await;
            }
        })
        .await;
        if drained.is_err() {
            warn!(event = "pump_drain_timeout", generation);
        }

        closed.cancel();
        info!(event = "instance_exited", generation, code = %report);
        _ = events.send(InstanceEvent::exited(generation, report)).await;
    });
}
