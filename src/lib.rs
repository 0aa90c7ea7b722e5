//! IPTV stream monitor library.
//!
//! Probes live streams with `ffprobe`, classifies what it sees and keeps a
//! per-channel health record that survives across monitoring iterations.

pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod orchestrator;
pub mod persist;
pub mod playlist;
pub mod probe;
pub mod resilience;
pub mod session;
pub mod storage;

pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use lifecycle::Shutdown;
pub use orchestrator::{Monitor, SessionRunner};
pub use probe::{FfprobeProber, StreamProber};
