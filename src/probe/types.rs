//! Probe results and events.

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Classification of a single short probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Pass,
    Buffering,
    Error,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Pass => "pass",
            ProbeStatus::Buffering => "buffering",
            ProbeStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one short probe. Always produced, even on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    pub notes: String,
    /// `"WxH"` when the report carried both dimensions.
    pub resolution: Option<String>,
    /// Wall time of the probe in seconds; absent on timeout or failure.
    pub probe_duration: Option<f64>,
}

impl ProbeOutcome {
    pub fn timed_out() -> Self {
        Self {
            status: ProbeStatus::Error,
            notes: "timeout".to_string(),
            resolution: None,
            probe_duration: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Error,
            notes: message.into(),
            resolution: None,
            probe_duration: None,
        }
    }
}

/// Raw output of a one-shot inspection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InspectionReport {
    /// Whether the process exited with status zero.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    /// Structured report (stdout).
    Report,
    /// Diagnostics (stderr).
    Diagnostic,
}

/// One line of inspection output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub channel: OutputChannel,
    pub text: String,
}

impl OutputLine {
    pub fn report(text: impl Into<String>) -> Self {
        Self { channel: OutputChannel::Report, text: text.into() }
    }

    pub fn diagnostic(text: impl Into<String>) -> Self {
        Self { channel: OutputChannel::Diagnostic, text: text.into() }
    }
}

/// Live event from a continuous probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// A hard failure line; counts as one disconnect.
    Error { at: u64, line: String },
    /// A stall line; duration is not measurable from the output.
    Buffering { at: u64, line: String },
    /// Both dimensions are now known.
    Resolution(String),
}

/// How a long-running inspection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEnd {
    /// The process exited on its own.
    Exited { code: Option<i32> },
    /// The process was still running at the deadline and was killed.
    Killed,
    /// The prober did not return within the deadline plus grace.
    TimedOut,
    /// The process could not be run.
    Failed(String),
}

/// Terminal classification of a continuous probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContinuousStatus {
    Pass,
    Issue,
    Error,
}

impl ContinuousStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContinuousStatus::Pass => "pass",
            ContinuousStatus::Issue => "issue",
            ContinuousStatus::Error => "error",
        }
    }
}

/// Terminal result of a continuous probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousOutcome {
    pub buffering_count: u32,
    pub error_count: u32,
    pub notes: String,
    pub resolution: Option<String>,
    pub elapsed: Duration,
    pub end: WatchEnd,
}

impl ContinuousOutcome {
    /// `pass` iff nothing was observed; `error` only when the process never ran.
    pub fn status(&self) -> ContinuousStatus {
        if matches!(self.end, WatchEnd::Failed(_)) {
            ContinuousStatus::Error
        } else if self.buffering_count == 0 && self.error_count == 0 {
            ContinuousStatus::Pass
        } else {
            ContinuousStatus::Issue
        }
    }
}
