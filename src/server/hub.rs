use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::message::PanelEvent;

/// Messages a viewer may have queued before it is considered not ready.
pub const VIEWER_QUEUE: usize = 512;

/// Serializes an event for the wire.
pub fn encode(event: &PanelEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(event = "encode_error", kind = event.kind(), error = %err);
            None
        }
    }
}

/// Fan-out of panel events to connected viewers. Each viewer owns a
/// bounded queue; a full queue means the viewer is not write-ready and the
/// message is skipped for it.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    viewers: RwLock<HashMap<Uuid, mpsc::Sender<String>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, tx: mpsc::Sender<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.viewers.write().await.insert(id, tx);
        info!(event = "viewer_connected", viewer = %id);
        id
    }

    pub async fn unregister(&self, id: &Uuid) {
        if self.viewers.write().await.remove(id).is_some() {
            info!(event = "viewer_disconnected", viewer = %id);
        }
    }

    pub async fn viewer_count(&self) -> usize {
        self.viewers.read().await.len()
    }

    pub async fn broadcast(&self, event: &PanelEvent) {
        let Some(text) = encode(event) else {
            return;
        };

        let mut closed = Vec::new();
        {
            let viewers = self.viewers.read().await;
            for (id, tx) in viewers.iter() {
                match tx.try_send(text.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(event = "viewer_skipped", viewer = %id, kind = event.kind());
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut viewers = self.viewers.write().await;
            for id in closed {
                viewers.remove(&id);
                info!(event = "viewer_dropped", viewer = %id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uptime(seconds: i64) -> PanelEvent {
        PanelEvent::Uptime { seconds }
    }

    #[tokio::test]
    async fn every_ready_viewer_receives_the_message() {
        let hub = BroadcastHub::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        hub.register(tx1).await;
        hub.register(tx2).await;

        hub.broadcast(&uptime(5)).await;

        let expected = r#"{"type":"uptime","seconds":5}"#;
        assert_eq!(rx1.recv().await.unwrap(), expected);
        assert_eq!(rx2.recv().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn full_viewer_is_skipped_not_dropped() {
        let hub = BroadcastHub::new();
        let (tx, mut rx) = mpsc::channel(1);
        hub.register(tx).await;

        hub.broadcast(&uptime(1)).await;
        hub.broadcast(&uptime(2)).await;

        assert_eq!(hub.viewer_count().await, 1);
        assert_eq!(rx.recv().await.unwrap(), r#"{"type":"uptime","seconds":1}"#);
        assert!(rx.try_recv().is_err());

        hub.broadcast(&uptime(3)).await;
        assert_eq!(rx.recv().await.unwrap(), r#"{"type":"uptime","seconds":3}"#);
    }

    #[tokio::test]
    async fn closed_viewer_is_removed() {
        let hub = BroadcastHub::new();
        let (tx, rx) = mpsc::channel(1);
        hub.register(tx).await;
        drop(rx);

        hub.broadcast(&uptime(1)).await;

        assert_eq!(hub.viewer_count().await, 0);
    }

    #[tokio::test]
    async fn unregister_stops_delivery() {
        let hub = BroadcastHub::new();
        let (tx, mut rx) = mpsc::channel(4);
        let id = hub.register(tx).await;
        hub.unregister(&id).await;

        hub.broadcast(&uptime(1)).await;

        assert!(rx.recv().await.is_none());
    }
}
