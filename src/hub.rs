use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::gauge;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::Alert;

/// Per-subscriber queue depth. A subscriber this far behind is dropped.
pub const SUBSCRIBER_BUFFER: usize = 256;

pub type SubscriberId = Uuid;

/// Downstream sink for classified alerts.
#[async_trait]
pub trait AlertPublisher: Send + Sync {
    /// Deliver `alert` to every live subscriber, returning how many got it.
    async fn publish(&self, alert: &Alert) -> anyhow::Result<usize>;
}

/// Sending half of one subscriber's queue, owned by the hub while registered.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    tx: mpsc::Sender<Arc<str>>,
}

impl SubscriberHandle {
    /// New handle plus the receiving half the connection task drains.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

/// Live subscriber set with isolated, non-blocking fan-out.
///
/// Every subscriber has its own bounded queue; `publish` only ever uses
/// `try_send`, so a stalled or closed subscriber can neither block nor fail
/// delivery to the others. Such subscribers are pruned after the pass.
#[derive(Clone, Default)]
pub struct BroadcastHub {
    subscribers: Arc<RwLock<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the handle was already registered.
    pub async fn register(&self, handle: SubscriberHandle) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let added = subscribers.insert(handle.id, handle.tx).is_none();
        gauge!("ws_subscribers").set(subscribers.len() as f64);
        added
    }

    /// Returns false if the subscriber was not registered.
    pub async fn unregister(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let removed = subscribers.remove(&id).is_some();
        gauge!("ws_subscribers").set(subscribers.len() as f64);
        removed
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Deliver one pre-serialized text payload to every subscriber.
    pub async fn publish_text(&self, payload: Arc<str>) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        {
            let subscribers = self.subscribers.read().await;
            for (id, tx) in subscribers.iter() {
                match tx.try_send(payload.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(subscriber = %id, "Subscriber queue full, dropping subscriber");
                        dead.push(*id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        tracing::debug!(subscriber = %id, "Subscriber gone, pruning");
                        dead.push(*id);
                    }
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in &dead {
                subscribers.remove(id);
            }
            gauge!("ws_subscribers").set(subscribers.len() as f64);
        }

        delivered
    }
}

#[async_trait]
impl AlertPublisher for BroadcastHub {
    async fn publish(&self, alert: &Alert) -> anyhow::Result<usize> {
        let payload: Arc<str> = serde_json::to_string(alert)?.into();
        Ok(self.publish_text(payload).await)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
