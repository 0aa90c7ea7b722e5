//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Remote fetch attempt fails:
//!     → backoff.rs (delay before the next attempt)
//!     → fetch retries until max_attempts is exhausted
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline; timeouts live with the caller
//! - No delay after the final attempt

pub mod backoff;
