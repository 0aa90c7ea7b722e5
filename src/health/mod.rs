//! Per-channel health records.
//!
//! # Data Flow
//! ```text
//! Probe outcomes and live events:
//!     → record.rs (apply to ChannelHealthRecord)
//!     → session snapshot (written after every mutation)
//!
//! Between iterations (carry_over.rs):
//!     final records of iteration N
//!     → CarryOver (disconnects + buffering history by channel id)
//!     → fresh pending records for iteration N+1
//! ```
//!
//! # Design Decisions
//! - Status moves forward only: pending → testing → pass | issue | error
//! - Counters derived from event lists are recomputed on finalize
//! - Only longitudinal history carries over; everything else resets

pub mod carry_over;
pub mod record;
pub mod state;

pub use carry_over::CarryOver;
pub use record::{ChannelHealthRecord, IssueCounts};
pub use state::ChannelStatus;
