//! Remote text and stream retrieval.
//!
//! # Responsibilities
//! - Retrieve playlists over HTTP with bounded retries
//! - Sample a stream's first bytes to estimate throughput
//!
//! # Design Decisions
//! - Each attempt has its own deadline (client timeout)
//! - Delay between attempts grows linearly (see `resilience::backoff`)
//! - The last attempt's error is kept for diagnosis

pub mod client;

pub use client::{Fetcher, ThroughputSample};
