use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    config::{MinecraftType, PanelConfig, PanelConfigUpdate},
    error::{PanelError, ServerError},
    server::{FileEntry, Panel, StatusReport},
};

type ApiResult<T> = Result<T, PanelError>;

#[derive(Debug, Serialize)]
pub struct Ack {
    ok: bool,
    message: String,
}

fn ack<S: Into<String>>(message: S) -> Json<Ack> {
    Json(Ack {
        ok: true,
        message: message.into(),
    })
}

#[derive(Debug, Serialize)]
struct Failure {
    ok: bool,
    error: String,
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status = match &self {
            PanelError::Server(ServerError::AlreadyRunning | ServerError::NotRunning)
            | PanelError::DownloadInProgress => StatusCode::CONFLICT,
            PanelError::Server(ServerError::ArtifactMissing(_)) => StatusCode::NOT_FOUND,
            PanelError::Server(ServerError::EmptyCommand)
            | PanelError::UnknownAction(_)
            | PanelError::UnknownServerType(_)
            | PanelError::InvalidVersion(_)
            | PanelError::InvalidFileName(_) => StatusCode::BAD_REQUEST,
            PanelError::Io(err) if err.kind() == std::io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            warn!(event = "request_failed", error = %self);
        }

        let body = Failure {
            ok: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub async fn start(State(panel): State<Arc<Panel>>) -> ApiResult<Json<Ack>> {
    panel.start().await?;
    Ok(ack("Server starting"))
}

pub async fn stop(State(panel): State<Arc<Panel>>) -> ApiResult<Json<Ack>> {
    panel.stop().await?;
    Ok(ack("Stop command sent"))
}

pub async fn kill(State(panel): State<Arc<Panel>>) -> ApiResult<Json<Ack>> {
    panel.kill().await?;
    Ok(ack("Server killed"))
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    command: String,
}

pub async fn command(
    State(panel): State<Arc<Panel>>,
    Json(req): Json<CommandRequest>,
) -> ApiResult<Json<Ack>> {
    panel.send_command(&req.command).await?;
    Ok(ack(format!("Sent: {}", req.command.trim())))
}

#[derive(Debug, Deserialize)]
pub struct PlayerActionRequest {
    action: String,
    player: String,
    #[serde(default)]
    argument: Option<String>,
}

pub async fn player_action(
    State(panel): State<Arc<Panel>>,
    Json(req): Json<PlayerActionRequest>,
) -> ApiResult<Json<Ack>> {
    let command = panel
        .player_action(&req.action, &req.player, req.argument.as_deref())
        .await?;
    Ok(ack(format!("Sent: {command}")))
}

pub async fn status(State(panel): State<Arc<Panel>>) -> Json<StatusReport> {
    Json(panel.status().await)
}

pub async fn get_config(State(panel): State<Arc<Panel>>) -> Json<PanelConfig> {
    Json(panel.config().await)
}

pub async fn save_config(
    State(panel): State<Arc<Panel>>,
    Json(update): Json<PanelConfigUpdate>,
) -> ApiResult<Json<PanelConfig>> {
    Ok(Json(panel.save_config(update).await?))
}

pub async fn get_properties(State(panel): State<Arc<Panel>>) -> ApiResult<Json<Map<String, Value>>> {
    let map = panel
        .properties()
        .await?
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    Ok(Json(map))
}

pub async fn save_properties(
    State(panel): State<Arc<Panel>>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<Ack>> {
    let updates: Vec<(String, String)> = body
        .into_iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, value)
        })
        .collect();
    panel.save_properties(&updates).await?;
    Ok(ack(format!("Saved {} properties", updates.len())))
}

pub async fn list_files(State(panel): State<Arc<Panel>>) -> ApiResult<Json<Vec<FileEntry>>> {
    Ok(Json(panel.list_files().await?))
}

pub async fn upload_file(
    State(panel): State<Arc<Panel>>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Ack>> {
    panel.write_file(&name, &body).await?;
    Ok(ack(format!("Uploaded {name}")))
}

pub async fn delete_file(
    State(panel): State<Arc<Panel>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Ack>> {
    panel.delete_file(&name).await?;
    Ok(ack(format!("Deleted {name}")))
}

pub async fn versions(
    State(panel): State<Arc<Panel>>,
    Path(server_type): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let kind: MinecraftType = server_type
        .parse()
        .map_err(PanelError::UnknownServerType)?;
    Ok(Json(panel.versions(kind).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    server_type: String,
    version: String,
}

pub async fn download(
    State(panel): State<Arc<Panel>>,
    Json(req): Json<DownloadRequest>,
) -> ApiResult<Json<Ack>> {
    let kind: MinecraftType = req
        .server_type
        .parse()
        .map_err(PanelError::UnknownServerType)?;
    panel.download(kind, &req.version).await?;
    Ok(ack(format!("Downloading {kind} {}", req.version.trim())))
}
