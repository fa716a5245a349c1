use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::time::interval;
use tokio_stream::wrappers::{IntervalStream, ReceiverStream};
use tracing::debug;

use crate::server::Panel;

const UPTIME_TICK: Duration = Duration::from_secs(1);

pub async fn ws_handler(ws: WebSocketUpgrade, State(panel): State<Arc<Panel>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_viewer(panel, socket))
}

/// Pumps the viewer's queue into the socket until either side goes away.
/// Incoming frames are ignored apart from close.
async fn serve_viewer(panel: Arc<Panel>, socket: WebSocket) {
    let (id, queue) = panel.attach_viewer().await;
    let (mut sender, mut receiver) = socket.split();
    let mut outbound = ReceiverStream::new(queue);
    let mut ticks = IntervalStream::new(interval(UPTIME_TICK));

    loop {
        tokio::select! {
            next = outbound.next() => {
                let Some(text) = next else {
                    break;
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Some(_) = ticks.next() => {
                if let Some(text) = panel.uptime_message().await {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    panel.detach_viewer(&id).await;
    debug!(event = "viewer_closed", viewer = %id);
}
