//! Playlist intake.
//!
//! # Data Flow
//! ```text
//! PlaylistSource (file path or http(s) URL)
//!     → source.rs (read file / Fetcher::fetch_text)
//!     → parser.rs (#EXTINF name + next URL line)
//!     → selection.rs (optional URL allow-list)
//!     → (name, url) pairs handed to storage
//! ```

pub mod parser;
pub mod selection;
pub mod source;

pub use parser::{parse_m3u, PlaylistEntry};
pub use selection::ChannelSelection;
pub use source::PlaylistSource;
