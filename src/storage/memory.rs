//! In-memory channel store with optional JSON persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::persist::{read_json, write_json_atomic};
use crate::playlist::PlaylistEntry;
use crate::storage::{Channel, ChannelId, ChannelStore, ResultRecord};

/// Results kept per channel; older entries are dropped first.
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    channels: Vec<Channel>,
    #[serde(default)]
    results: HashMap<ChannelId, Vec<ResultRecord>>,
}

/// A thread-safe channel directory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    channels: Arc<DashMap<ChannelId, Channel>>,
    by_url: Arc<DashMap<String, ChannelId>>,
    results: Arc<DashMap<ChannelId, Vec<ResultRecord>>>,
    next_id: Arc<AtomicU64>,
    persistence_path: Option<PathBuf>,
    persist_lock: Arc<tokio::sync::Mutex<()>>,
}

impl MemoryStore {
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            persistence_path,
            ..Self::default()
        }
    }

    /// Load from `path` if it exists; later changes are persisted back to it.
    pub async fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let store = Self::new(Some(path.to_path_buf()));
        if let Some(data) = read_json::<StoreFile>(path).await? {
            let mut max_id = 0;
            for channel in data.channels {
                max_id = max_id.max(channel.id);
                store.by_url.insert(channel.url.clone(), channel.id);
                store.channels.insert(channel.id, channel);
            }
            for (id, history) in data.results {
                store.results.insert(id, history);
            }
            store.next_id.store(max_id, Ordering::SeqCst);
            tracing::info!(
                path = %path.display(),
                channels = store.channels.len(),
                "Loaded channel store"
            );
        }
        Ok(store)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn get_channel(&self, id: ChannelId) -> Option<Channel> {
        self.channels.get(&id).map(|r| r.value().clone())
    }

    /// Result history of a channel, oldest first.
    pub fn results_for(&self, id: ChannelId) -> Vec<ResultRecord> {
        self.results.get(&id).map(|r| r.value().clone()).unwrap_or_default()
    }

    pub fn latest_result(&self, id: ChannelId) -> Option<ResultRecord> {
        self.results.get(&id).and_then(|r| r.value().last().cloned())
    }

    fn to_file(&self) -> StoreFile {
        let mut channels: Vec<Channel> = self.channels.iter().map(|r| r.value().clone()).collect();
        channels.sort_by_key(|c| c.id);
        let results = self
            .results
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        StoreFile { channels, results }
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock().await;
        write_json_atomic(path, &self.to_file()).await
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn list_channels(&self) -> Result<Vec<Channel>, StoreError> {
        let mut channels: Vec<Channel> = self.channels.iter().map(|r| r.value().clone()).collect();
        channels.sort_by_key(|c| c.id);
        Ok(channels)
    }

    async fn add_channels_bulk(&self, items: &[PlaylistEntry]) -> Result<Vec<ChannelId>, StoreError> {
        let mut ids = Vec::with_capacity(items.len());
        let mut added = 0usize;

        for item in items {
            let id = match self.by_url.entry(item.url.clone()) {
                Entry::Occupied(existing) => *existing.get(),
                Entry::Vacant(slot) => {
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                    self.channels.insert(
                        id,
                        Channel { id, name: item.name.clone(), url: item.url.clone() },
                    );
                    slot.insert(id);
                    added += 1;
                    id
                }
            };
            ids.push(id);
        }

        tracing::info!(received = items.len(), added, "Imported channels");
        if added > 0 {
            self.persist().await?;
        }
        Ok(ids)
    }

    async fn insert_result(&self, result: ResultRecord) -> Result<(), StoreError> {
        {
            let mut history = self.results.entry(result.channel_id).or_default();
            history.push(result);
            if history.len() > HISTORY_LIMIT {
                let excess = history.len() - HISTORY_LIMIT;
                history.drain(..excess);
            }
        }
        self.persist().await
    }
}
