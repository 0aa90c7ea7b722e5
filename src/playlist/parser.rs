//! M3U playlist parsing.

use serde::{Deserialize, Serialize};

/// Name used when an `#EXTINF` line carries no title.
const UNNAMED: &str = "unknown";

/// One `(name, url)` pair from a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub name: String,
    pub url: String,
}

/// Parse a plain M3U playlist into entries, in source order.
///
/// The name is whatever follows the first comma of an `#EXTINF` line; the URL
/// is the next non-empty line that is not a comment. An `#EXTINF` with no URL
/// after it is dropped.
pub fn parse_m3u(text: &str) -> Vec<PlaylistEntry> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut entries = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if line.starts_with("#EXTINF") {
            let name = line
                .split_once(',')
                .map(|(_, name)| name.trim())
                .unwrap_or(UNNAMED);

            let mut j = i + 1;
            while j < lines.len() && (lines[j].is_empty() || lines[j].starts_with('#')) {
                j += 1;
            }
            if let Some(url) = lines.get(j) {
                entries.push(PlaylistEntry {
                    name: name.to_string(),
                    url: url.to_string(),
                });
            }
            i = j;
        }
        i += 1;
    }

    entries
}
