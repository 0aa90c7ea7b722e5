//! Externally supplied channel allow-list.

use std::collections::HashSet;
use std::path::Path;
use serde::Deserialize;

use crate::error::MonitorError;
use crate::playlist::PlaylistEntry;

#[derive(Debug, Deserialize)]
struct SelectedChannel {
    url: Option<String>,
}

/// Set of URLs restricting which playlist entries are imported and probed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSelection {
    urls: HashSet<String>,
}

impl ChannelSelection {
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a JSON array of objects; entries without a `url` are ignored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let selected: Vec<SelectedChannel> = serde_json::from_str(json)?;
        Ok(Self::from_urls(selected.into_iter().filter_map(|c| c.url)))
    }

    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        let json = std::fs::read_to_string(path).map_err(|e| MonitorError::Selection {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&json).map_err(|e| MonitorError::Selection {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Keep only selected entries, preserving order.
    pub fn filter(&self, entries: Vec<PlaylistEntry>) -> Vec<PlaylistEntry> {
        entries.into_iter().filter(|e| self.contains(&e.url)).collect()
    }
}
