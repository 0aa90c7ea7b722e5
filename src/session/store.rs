//! Snapshot file.

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::persist::{read_json, write_json_atomic};
use crate::session::snapshot::SessionSnapshot;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the snapshot file.
    pub async fn write(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        write_json_atomic(&self.path, snapshot).await
    }

    /// The last written snapshot, if any.
    pub async fn load(&self) -> Result<Option<SessionSnapshot>, StoreError> {
        read_json(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LoopMode;
    use std::time::Duration;

    #[tokio::test]
    async fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("results.json"));
        assert!(store.load().await.unwrap().is_none());

        let snapshot = SessionSnapshot::new(vec![], 10, Duration::from_secs(5), LoopMode::Single, 1);
        store.write(&snapshot).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(snapshot));
    }
}
