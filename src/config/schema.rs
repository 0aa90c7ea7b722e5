//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Root configuration for the IPTV monitor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// External inspection process settings.
    pub probe: ProbeConfig,

    /// Remote playlist retrieval settings.
    pub fetch: FetchConfig,

    /// Sequential session settings.
    pub session: SessionConfig,

    /// Periodic bounded-concurrency sweep settings.
    pub monitor: SweepConfig,

    /// Channel storage settings.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Settings for the `ffprobe` invocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Path or name of the ffprobe binary.
    pub ffprobe_path: String,

    /// User agent passed to ffprobe for HTTP inputs.
    pub user_agent: Option<String>,

    /// Extra arguments inserted before `-i <url>`.
    pub extra_input_args: Vec<String>,

    /// How long output readers may drain after the process ends, in milliseconds.
    pub reader_grace_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: "ffprobe".to_string(),
            user_agent: None,
            extra_input_args: Vec::new(),
            reader_grace_ms: 2000,
        }
    }
}

impl ProbeConfig {
    pub fn reader_grace(&self) -> Duration {
        Duration::from_millis(self.reader_grace_ms)
    }
}

/// Settings for remote text retrieval.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Total attempts before giving up.
    pub max_attempts: u32,

    /// Backoff step in milliseconds: the delay after attempt `n` is `n * step`.
    pub backoff_step_ms: u64,

    /// User agent header for playlist requests.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_attempts: 3,
            backoff_step_ms: 2000,
            user_agent: "IPTVMonitor/1.0".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }
}

/// How a sequential session measures each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// One inspection process per channel for the whole session.
    #[default]
    Continuous,
    /// Repeated short probes per channel for the whole session.
    Periodic,
}

/// Sequential session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Measurement window per channel in seconds.
    pub duration_secs: u64,

    /// Continuous or periodic measurement.
    pub mode: SessionMode,

    /// Pause between probes in periodic mode, in seconds.
    pub check_interval_secs: u64,

    /// How often live progress is written while a continuous probe runs.
    pub progress_interval_secs: u64,

    /// Upper bound for the seeding probe (and each periodic probe).
    pub seed_timeout_secs: u64,

    /// Where the session snapshot is written.
    pub snapshot_path: PathBuf,

    /// Optional JSON list of `{ "url": ... }` objects restricting the run.
    pub selection_path: Option<PathBuf>,

    /// Resume carry-over counters from an existing snapshot on startup.
    pub resume: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            mode: SessionMode::Continuous,
            check_interval_secs: 1,
            progress_interval_secs: 5,
            seed_timeout_secs: 10,
            snapshot_path: PathBuf::from("results.json"),
            selection_path: None,
            resume: false,
        }
    }
}

impl SessionConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }

    /// Bound for the seeding probe: `min(seed_timeout, duration)`.
    pub fn seed_timeout(&self) -> Duration {
        Duration::from_secs(self.seed_timeout_secs.min(self.duration_secs))
    }
}

/// Periodic sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Delay between sweeps in seconds.
    pub interval_secs: u64,

    /// Maximum probes in flight at once.
    pub concurrency: usize,

    /// Timeout for a single probe in seconds.
    pub probe_timeout_secs: u64,

    /// Also download a sample of each stream to estimate throughput.
    pub sample_throughput: bool,

    /// Byte cap for the throughput sample.
    pub sample_max_bytes: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            concurrency: 6,
            probe_timeout_secs: 15,
            sample_throughput: false,
            sample_max_bytes: 1024 * 1024,
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Channel storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Persist the channel directory and results to this JSON file.
    pub channels_path: Option<PathBuf>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
