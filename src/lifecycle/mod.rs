//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!     second signal  → immediate exit
//!
//! Shutdown (shutdown.rs):
//!     trigger → session runner stops the current iteration
//!             → monitor finishes its sweep and stops
//! ```
//!
//! # Design Decisions
//! - One broadcast coordinator; every long-running task subscribes
//! - The last written snapshot is always consistent, so an interrupted
//!   iteration needs no cleanup

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
