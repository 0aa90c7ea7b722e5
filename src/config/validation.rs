//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (durations > 0, concurrency > 0, attempts > 0)
//! - Check addresses parse when the feature using them is enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MonitorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use crate::config::schema::{MonitorConfig, SessionMode};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field,
            message: "must be greater than zero".to_string(),
        });
    }
}

pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.probe.ffprobe_path.trim().is_empty() {
        errors.push(ValidationError {
            field: "probe.ffprobe_path",
            message: "must not be empty".to_string(),
        });
    }

    positive(&mut errors, "fetch.timeout_secs", config.fetch.timeout_secs);
    positive(&mut errors, "fetch.max_attempts", config.fetch.max_attempts as u64);

    positive(&mut errors, "session.duration_secs", config.session.duration_secs);
    positive(&mut errors, "session.progress_interval_secs", config.session.progress_interval_secs);
    positive(&mut errors, "session.seed_timeout_secs", config.session.seed_timeout_secs);
    if config.session.mode == SessionMode::Periodic {
        positive(&mut errors, "session.check_interval_secs", config.session.check_interval_secs);
    }

    positive(&mut errors, "monitor.interval_secs", config.monitor.interval_secs);
    positive(&mut errors, "monitor.concurrency", config.monitor.concurrency as u64);
    positive(&mut errors, "monitor.probe_timeout_secs", config.monitor.probe_timeout_secs);
    if config.monitor.sample_throughput {
        positive(&mut errors, "monitor.sample_max_bytes", config.monitor.sample_max_bytes);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            message: format!("'{}' is not a socket address", config.observability.metrics_address),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
