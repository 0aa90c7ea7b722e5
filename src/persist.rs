//! Atomic JSON persistence.
//!
//! Readers never observe a torn file: content goes to `<path>.tmp` first and
//! is renamed over the target.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// Serialize `value` and atomically replace `path` with it.
pub async fn write_json_atomic<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
    }

    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, &json)
        .await
        .map_err(|source| StoreError::Io { path: temp_path.clone(), source })?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;

    Ok(())
}

/// Read and deserialize `path`; `Ok(None)` when it does not exist.
pub async fn read_json<T>(path: &Path) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io { path: path.to_path_buf(), source }),
    }
}
