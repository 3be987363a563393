//! Process-wide channel availability map.
//!
//! Written only by the availability prober; the UI layer reads statuses
//! and may subscribe to per-channel updates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use super::channel_types::ChannelStatus;

/// A single status change, delivered to subscribers as it is published.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub channel_id: String,
    pub status: ChannelStatus,
}

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct StatusStore {
    statuses: Arc<RwLock<HashMap<String, ChannelStatus>>>,
    events: broadcast::Sender<StatusUpdate>,
}

impl StatusStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            statuses: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    /// Current status for a channel; channels never probed are `Unknown`.
    pub async fn get(&self, channel_id: &str) -> ChannelStatus {
        self.statuses
            .read()
            .await
            .get(channel_id)
            .copied()
            .unwrap_or_default()
    }

    pub async fn snapshot(&self) -> HashMap<String, ChannelStatus> {
        self.statuses.read().await.clone()
    }

    /// Subscribe to status updates. Subscribers interested in a single
    /// row filter by `channel_id`.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.events.subscribe()
    }

    pub(crate) async fn set(&self, channel_id: &str, status: ChannelStatus) {
        self.statuses
            .write()
            .await
            .insert(channel_id.to_string(), status);
        // No subscribers is fine
        let _ = self.events.send(StatusUpdate {
            channel_id: channel_id.to_string(),
            status,
        });
    }

    #[allow(dead_code)]
    pub(crate) async fn set_many(&self, updates: HashMap<String, ChannelStatus>) {
        let mut statuses = self.statuses.write().await;
        for (channel_id, status) in updates {
            statuses.insert(channel_id.clone(), status);
            let _ = self.events.send(StatusUpdate { channel_id, status });
        }
    }

    pub(crate) async fn clear(&self) {
        self.statuses.write().await.clear();
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}
