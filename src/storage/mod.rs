//! Channel directory and result history.
//!
//! # Responsibilities
//! - Own channel identity (`Channel` is immutable once created)
//! - Deduplicate imported playlist entries by URL
//! - Record every probe result as it completes
//!
//! # Design Decisions
//! - Orchestrators depend on the `ChannelStore` trait only
//! - `MemoryStore` is the shipped backend, with optional JSON persistence

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::playlist::PlaylistEntry;
use crate::probe::{ProbeOutcome, ProbeStatus};

pub use memory::MemoryStore;

pub type ChannelId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub url: String,
}

/// One persisted probe result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub channel_id: ChannelId,
    pub status: ProbeStatus,
    pub notes: String,
    /// Bytes per second, when a throughput sample was taken.
    pub throughput: Option<f64>,
    /// Probe wall time in seconds.
    pub startup_latency: Option<f64>,
    pub resolution: Option<String>,
    pub checked_at: u64,
}

impl ResultRecord {
    pub fn from_outcome(
        channel_id: ChannelId,
        outcome: &ProbeOutcome,
        throughput: Option<f64>,
        checked_at: u64,
    ) -> Self {
        Self {
            channel_id,
            status: outcome.status,
            notes: outcome.notes.clone(),
            throughput,
            startup_latency: outcome.probe_duration,
            resolution: outcome.resolution.clone(),
            checked_at,
        }
    }
}

#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// All channels, ordered by id.
    async fn list_channels(&self) -> Result<Vec<Channel>, StoreError>;

    /// Import entries; returns one id per entry, reusing the id of a known URL.
    async fn add_channels_bulk(&self, items: &[PlaylistEntry]) -> Result<Vec<ChannelId>, StoreError>;

    async fn insert_result(&self, result: ResultRecord) -> Result<(), StoreError>;
}
