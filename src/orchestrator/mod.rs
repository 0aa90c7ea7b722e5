//! Orchestration policies.
//!
//! # Data Flow
//! ```text
//! SessionRunner (runner.rs)
//!     playlist → import → carry-over → Session
//!     → SequentialOrchestrator (sequential.rs): one channel at a time,
//!       long continuous probe + progress task writing the snapshot
//!
//! Monitor (monitor.rs)
//!     every interval: list channels
//!     → one task per channel behind a semaphore → probe_once
//!     → insert_result as each finishes → publish sweep
//! ```
//!
//! # Design Decisions
//! - Per-channel failures become outcomes; only the channel list is fatal
//! - Stopping is cooperative: in-flight probes always finish

pub mod monitor;
pub mod runner;
pub mod sequential;

pub use monitor::{Monitor, MonitorState, SweepEntry};
pub use runner::{import_channels, run_monitor, IterationOutcome, RunEnd, RunSummary, SessionRunner};
pub use sequential::{ChannelReport, SequentialOrchestrator};
