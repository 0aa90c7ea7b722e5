//! Session aggregate.
//!
//! # Data Flow
//! ```text
//! Orchestrator
//!     → Session::update(index, |record| ...)   (one session-wide lock)
//!     → mutate ChannelHealthRecord
//!     → SnapshotStore::write (temp file + rename)
//! ```
//!
//! # Design Decisions
//! - All mutation goes through `Session::update`; writes are totally ordered
//! - The whole snapshot is rewritten on every mutation, so readers always see
//!   a consistent document
//! - A failed write is logged and counted; the in-memory state stays authoritative

pub mod handle;
pub mod snapshot;
pub mod store;

pub use handle::Session;
pub use snapshot::{LoopMode, SessionSnapshot};
pub use store::SnapshotStore;
