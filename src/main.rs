use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mineguard_panel::{config::PanelConfig, server::Panel, web};

/// How long a running server gets to stop on its own when the panel exits.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "mineguard-panel", version, about = "Web panel for a single Minecraft server")]
struct Args {
    /// Panel config file, created on first save.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Address the web UI binds to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Overrides `uiPort` from the config file.
    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    debug: bool,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("MINEGUARD_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    let config = PanelConfig::load(&args.config).await;
    let port = args.port.unwrap_or(config.ui_port);
    let addr: SocketAddr = match format!("{}:{}", args.host, port).parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!(event = "invalid_addr", host = %args.host, port, error = %err);
            return;
        }
    };
    if !addr.ip().is_loopback() {
        warn!(event = "public_bind", addr = %addr, "the panel has no authentication");
    }

    let panel = match Panel::new(config, args.config.clone()) {
        Ok(panel) => panel,
        Err(err) => {
            error!(event = "panel_init_failed", error = %err);
            return;
        }
    };
    panel.spawn_workers().await;

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(event = "bind_failed", addr = %addr, error = %err);
            return;
        }
    };
    info!(event = "panel_listening", addr = %addr, config = %args.config.display());

    let shutdown = async {
        _ = tokio::signal::ctrl_c().await;
        info!(event = "shutdown_requested");
    };

    if let Err(err) = axum::serve(listener, web::router(panel.clone()))
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!(event = "serve_failed", error = %err);
    }

    panel.shutdown(SHUTDOWN_GRACE).await;
    info!(event = "panel_stopped");
}
