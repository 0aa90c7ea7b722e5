//! Shared handle to a running session.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::health::ChannelHealthRecord;
use crate::observability::metrics;
use crate::session::snapshot::SessionSnapshot;
use crate::session::store::SnapshotStore;

struct SessionState {
    snapshot: SessionSnapshot,
    store: SnapshotStore,
}

/// Cloneable handle; every clone refers to the same snapshot.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

impl Session {
    /// Write the initial snapshot and wrap it. Failing to write here is fatal.
    pub async fn start(store: SnapshotStore, snapshot: SessionSnapshot) -> Result<Self, StoreError> {
        store.write(&snapshot).await?;
        metrics::record_snapshot_write(true);
        tracing::info!(
            path = %store.path().display(),
            channels = snapshot.channels.len(),
            iteration = snapshot.iteration,
            "Session started"
        );
        Ok(Self {
            inner: Arc::new(Mutex::new(SessionState { snapshot, store })),
        })
    }

    /// Mutate one record and persist the snapshot, under the session lock.
    ///
    /// Returns `None` when `index` is out of range.
    pub async fn update<F, R>(&self, index: usize, f: F) -> Option<R>
    where
        F: FnOnce(&mut ChannelHealthRecord) -> R,
    {
        let mut state = self.inner.lock().await;
        let record = state.snapshot.channels.get_mut(index)?;
        let result = f(record);

        let SessionState { snapshot, store } = &*state;
        match store.write(snapshot).await {
            Ok(()) => metrics::record_snapshot_write(true),
            Err(e) => {
                metrics::record_snapshot_write(false);
                tracing::warn!(path = %store.path().display(), error = %e, "Snapshot write failed");
            }
        }
        Some(result)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.snapshot.clone()
    }

    pub async fn record(&self, index: usize) -> Option<ChannelHealthRecord> {
        self.inner.lock().await.snapshot.channels.get(index).cloned()
    }

    pub async fn channel_count(&self) -> usize {
        self.inner.lock().await.snapshot.channels.len()
    }
}
