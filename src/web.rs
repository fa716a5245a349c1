//! HTTP control surface and the viewer push channel.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Html,
    routing::{get, post, put},
};

use crate::server::Panel;

mod api;
mod ws;

/// Largest file accepted by the upload route.
const MAX_UPLOAD: usize = 512 * 1024 * 1024;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub fn router(panel: Arc<Panel>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws::ws_handler))
        .route("/api/start", post(api::start))
        .route("/api/stop", post(api::stop))
        .route("/api/kill", post(api::kill))
        .route("/api/command", post(api::command))
        .route("/api/player-action", post(api::player_action))
        .route("/api/status", get(api::status))
        .route("/api/config", get(api::get_config).post(api::save_config))
        .route(
            "/api/properties",
            get(api::get_properties).post(api::save_properties),
        )
        .route("/api/files", get(api::list_files))
        .route(
            "/api/files/{name}",
            put(api::upload_file)
                .delete(api::delete_file)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD)),
        )
        .route("/api/versions/{server_type}", get(api::versions))
        .route("/api/download", post(api::download))
        .with_state(panel)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use axum::{body::Bytes, http::StatusCode};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use super::*;
    use crate::config::PanelConfig;

    fn server_in(dir: &Path) -> (TestServer, Arc<Panel>) {
        let config = PanelConfig {
            server_dir: dir.to_path_buf(),
            ..PanelConfig::default()
        };
        let panel = Panel::new(config, dir.join("panel.json")).unwrap();
        let server = TestServer::builder()
            .http_transport()
            .build(router(panel.clone()))
            .unwrap();
        (server, panel)
    }

    #[tokio::test]
    async fn start_without_jar_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _) = server_in(dir.path());

        let response = server.post("/api/start").await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["ok"], false);
        assert!(body["error"].as_str().unwrap().contains("Server jar not found"));
    }

    #[tokio::test]
    async fn control_errors_map_to_status_codes() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _) = server_in(dir.path());

        server.post("/api/kill").await.assert_status(StatusCode::CONFLICT);
        server.post("/api/stop").await.assert_status(StatusCode::CONFLICT);
        server
            .post("/api/command")
            .json(&json!({ "command": "  " }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .post("/api/player-action")
            .json(&json!({ "action": "smite", "player": "Steve" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/api/versions/bukkit")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .post("/api/download")
            .json(&json!({ "serverType": "paper", "version": "nope" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_reports_stopped_server() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _) = server_in(dir.path());

        let body: Value = server.get("/api/status").await.json();

        assert_eq!(body["running"], false);
        assert_eq!(body["state"], "stopped");
        assert_eq!(body["players"], json!([]));
        assert_eq!(body["uptime"], Value::Null);
    }

    #[tokio::test]
    async fn config_partial_update_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let (server, panel) = server_in(dir.path());

        let body: Value = server
            .post("/api/config")
            .json(&json!({ "memory": "4G", "serverType": "paper" }))
            .await
            .json();

        assert_eq!(body["memory"], "4G");
        assert_eq!(body["serverType"], "paper");
        assert_eq!(body["serverJar"], "server.jar");
        assert_eq!(panel.config().await.memory, "4G");
        assert!(dir.path().join("panel.json").exists());

        let current: Value = server.get("/api/config").await.json();
        assert_eq!(current["memory"], "4G");
    }

    #[tokio::test]
    async fn properties_are_merged_into_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("server.properties"),
            "#Minecraft server properties\nmotd=A Minecraft Server\nmax-players=20\n",
        )
        .unwrap();
        let (server, _) = server_in(dir.path());

        server
            .post("/api/properties")
            .json(&json!({ "max-players": 10, "pvp": false }))
            .await
            .assert_status_ok();

        let text = std::fs::read_to_string(dir.path().join("server.properties")).unwrap();
        assert!(text.starts_with("#Minecraft server properties\nmotd=A Minecraft Server\nmax-players=10\n"));
        assert!(text.contains("pvp=false"));

        let body: Value = server.get("/api/properties").await.json();
        assert_eq!(body["max-players"], "10");
    }

    #[tokio::test]
    async fn files_upload_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _) = server_in(dir.path());

        server
            .put("/api/files/whitelist.json")
            .bytes(Bytes::from_static(b"[]"))
            .await
            .assert_status_ok();
        let listing: Value = server.get("/api/files").await.json();
        assert!(
            listing
                .as_array()
                .unwrap()
                .iter()
                .any(|f| f["name"] == "whitelist.json" && f["size"] == 2)
        );

        server
            .put("/api/files/a%5Cb")
            .bytes(Bytes::from_static(b"x"))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .delete("/api/files/whitelist.json")
            .await
            .assert_status_ok();
        server
            .delete("/api/files/whitelist.json")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn index_page_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _) = server_in(dir.path());

        let response = server.get("/").await;

        response.assert_status_ok();
        assert!(response.text().contains("MineGuard"));
    }

    #[tokio::test]
    async fn viewer_receives_replay_then_live_events() {
        let dir = tempfile::tempdir().unwrap();
        let (server, panel) = server_in(dir.path());
        panel
            .push_log(crate::config::LogEntry::system("before connect"))
            .await;

        let mut ws = server
            .get_websocket("/ws")
            .await
            .into_websocket()
            .await;

        let history: Value = serde_json::from_str(&ws.receive_text().await).unwrap();
        assert_eq!(history["type"], "history");
        assert_eq!(history["entries"][0]["text"], "before connect");
        let status: Value = serde_json::from_str(&ws.receive_text().await).unwrap();
        assert_eq!(status["type"], "status");
        let config: Value = serde_json::from_str(&ws.receive_text().await).unwrap();
        assert_eq!(config["type"], "config");
        assert_eq!(config["serverJar"], "server.jar");

        panel
            .push_log(crate::config::LogEntry::system("after connect"))
            .await;
        let live: Value = serde_json::from_str(&ws.receive_text().await).unwrap();
        assert_eq!(live["type"], "log");
        assert_eq!(live["entry"]["text"], "after connect");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn uptime_ticks_only_while_running() {
        use std::{os::unix::fs::PermissionsExt, time::Duration};

        use axum_test::TestWebSocket;

        async fn next_frame(ws: &mut TestWebSocket, wait: Duration) -> Option<Value> {
            let text = tokio::time::timeout(wait, ws.receive_text()).await.ok()?;
            serde_json::from_str(&text).ok()
        }

        let dir = tempfile::tempdir().unwrap();
        let java = dir.path().join("fake-java.sh");
        std::fs::write(&java, "#!/bin/sh\nwhile IFS= read -r line; do :; done\n").unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.path().join("server.jar"), b"").unwrap();
        let config = PanelConfig {
            server_dir: dir.path().to_path_buf(),
            java_path: java,
            ..PanelConfig::default()
        };
        let panel = Panel::new(config, dir.path().join("panel.json")).unwrap();
        panel.spawn_workers().await;
        let server = TestServer::builder()
            .http_transport()
            .build(router(panel.clone()))
            .unwrap();

        server.post("/api/start").await.assert_status_ok();
        let mut ws = server.get_websocket("/ws").await.into_websocket().await;

        let mut ticked = false;
        for _ in 0..50 {
            let Some(frame) = next_frame(&mut ws, Duration::from_secs(3)).await else {
                break;
            };
            if frame["type"] == "uptime" {
                assert!(frame["seconds"].as_i64().unwrap() >= 0);
                ticked = true;
                break;
            }
        }
        assert!(ticked, "no uptime frame while running");

        server.post("/api/kill").await.assert_status_ok();
        let mut exited = false;
        for _ in 0..50 {
            let Some(frame) = next_frame(&mut ws, Duration::from_secs(3)).await else {
                break;
            };
            if frame["type"] == "status" && frame["running"] == false {
                exited = true;
                break;
            }
        }
        assert!(exited, "no stopped status after kill");

        let quiet_until = tokio::time::Instant::now() + Duration::from_millis(2500);
        while let Some(wait) = quiet_until.checked_duration_since(tokio::time::Instant::now()) {
            match next_frame(&mut ws, wait).await {
                Some(frame) => assert_ne!(frame["type"], "uptime"),
                None => break,
            }
        }
    }
}
