//! Where a playlist comes from.

use std::path::PathBuf;
use url::Url;

use crate::error::MonitorError;
use crate::fetch::Fetcher;
use crate::playlist::{parse_m3u, PlaylistEntry};

/// A playlist location: a local file or a remote `http(s)` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistSource {
    File(PathBuf),
    Remote(Url),
}

impl PlaylistSource {
    /// `http`/`https` URLs are remote; anything else is a local path.
    pub fn parse(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => PlaylistSource::Remote(url),
            _ => PlaylistSource::File(PathBuf::from(source)),
        }
    }

    pub async fn read(&self, fetcher: &Fetcher) -> Result<String, MonitorError> {
        match self {
            PlaylistSource::File(path) => {
                tracing::info!(path = %path.display(), "Reading local playlist");
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| MonitorError::Playlist { path: path.clone(), source })
            }
            PlaylistSource::Remote(url) => {
                tracing::info!(url = %url, "Fetching remote playlist");
                Ok(fetcher.fetch_text(url.as_str()).await?)
            }
        }
    }

    pub async fn load(&self, fetcher: &Fetcher) -> Result<Vec<PlaylistEntry>, MonitorError> {
        let text = self.read(fetcher).await?;
        Ok(parse_m3u(&text))
    }
}

impl std::fmt::Display for PlaylistSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaylistSource::File(path) => write!(f, "{}", path.display()),
            PlaylistSource::Remote(url) => write!(f, "{}", url),
        }
    }
}
