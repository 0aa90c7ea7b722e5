//! Heuristic classification of inspection output.
//!
//! Everything here is a pure function of text, so the heuristics can be
//! refined without touching process handling or orchestration.
//!
//! # Heuristics
//! - A diagnostic line mentioning `error` or `failed` is a hard failure
//! - A diagnostic line mentioning `buffer` is a stall
//! - `width=` / `height=` fields update the tracked resolution; last pair wins
//! - A one-shot report is degraded when the process failed or the combined
//!   output mentions `error` or `buffer` anywhere (known to over-match)

use std::time::Duration;

use crate::probe::types::{InspectionReport, ProbeOutcome, ProbeStatus};

/// Signal carried by a single line of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSignal {
    Error,
    Buffering,
    Width(u32),
    Height(u32),
}

/// Extract every signal a line carries. Matching is case-insensitive.
pub fn classify_line(line: &str) -> Vec<LineSignal> {
    let mut signals = Vec::new();
    let lower = line.to_lowercase();

    if lower.contains("error") || lower.contains("failed") {
        signals.push(LineSignal::Error);
    }
    if lower.contains("buffer") {
        signals.push(LineSignal::Buffering);
    }

    for token in line.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        let Ok(value) = value.trim().parse::<u32>() else {
            continue;
        };
        match key.trim() {
            "width" => signals.push(LineSignal::Width(value)),
            "height" => signals.push(LineSignal::Height(value)),
            _ => {}
        }
    }

    signals
}

/// Tracks the most recent width and height seen in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionTracker {
    width: Option<u32>,
    height: Option<u32>,
}

impl ResolutionTracker {
    /// Apply a signal; returns true when the resolution changed.
    pub fn observe(&mut self, signal: LineSignal) -> bool {
        let before = self.resolution();
        match signal {
            LineSignal::Width(w) => self.width = Some(w),
            LineSignal::Height(h) => self.height = Some(h),
            _ => return false,
        }
        let after = self.resolution();
        after.is_some() && after != before
    }

    /// Feed every line of a report.
    pub fn observe_text(&mut self, text: &str) {
        for line in text.lines() {
            for signal in classify_line(line) {
                self.observe(signal);
            }
        }
    }

    /// `"WxH"` once both dimensions are known.
    pub fn resolution(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        }
    }
}

/// Degraded iff the process failed or the text mentions `error`/`buffer`.
pub fn classify_report(success: bool, text: &str) -> ProbeStatus {
    let lower = text.to_lowercase();
    if !success || lower.contains("error") || lower.contains("buffer") {
        ProbeStatus::Buffering
    } else {
        ProbeStatus::Pass
    }
}

/// Turn a finished one-shot report into an outcome.
pub fn evaluate_report(report: &InspectionReport, elapsed: Duration) -> ProbeOutcome {
    let combined = format!("{}\n{}", report.stdout, report.stderr);
    let status = classify_report(report.success, &combined);

    let mut tracker = ResolutionTracker::default();
    tracker.observe_text(&report.stdout);
    let resolution = tracker.resolution();

    let mut notes = Vec::new();
    if !report.success {
        notes.push(format!("ffprobe error: {}", report.stderr.trim()));
    } else {
        if report.stdout.contains("codec_type=audio") {
            notes.push("[audio detected]".to_string());
        }
        match &resolution {
            Some(res) => notes.push(format!("[video detected {}]", res)),
            None if report.stdout.contains("codec_type=video") => notes.push("[video detected]".to_string()),
            None => {}
        }
        if status == ProbeStatus::Buffering {
            notes.push("[ffprobe buffering]".to_string());
        }
    }

    ProbeOutcome {
        status,
        notes: notes.join(" "),
        resolution,
        probe_duration: Some(elapsed.as_secs_f64()),
    }
}
