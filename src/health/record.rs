//! The aggregate health record of one channel.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::round2;
use crate::health::state::ChannelStatus;
use crate::probe::tally::{truncate_front, NOTES_CAP};
use crate::probe::{ContinuousOutcome, ProbeEvent, ProbeOutcome, ProbeStatus};
use crate::storage::{Channel, ChannelId};

/// Event counts for the current window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub buffering: u32,
    pub errors: u32,
}

/// Health of one channel as written to the session snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelHealthRecord {
    pub id: ChannelId,
    pub name: String,
    pub url: String,
    pub status: ChannelStatus,
    pub details: String,
    pub resolution: Option<String>,
    /// Wall time of the most recent short probe, in seconds.
    pub last_probe_seconds: Option<f64>,
    pub tested_seconds: u64,
    pub issues: IssueCounts,
    pub disconnects_count: usize,
    /// Unix timestamps, one per error event.
    pub disconnects: Vec<u64>,
    pub buffering_total_seconds: f64,
    pub buffering_events: Vec<f64>,
}

impl ChannelHealthRecord {
    /// A fresh record with no history.
    pub fn pending(channel: &Channel) -> Self {
        Self {
            id: channel.id,
            name: channel.name.clone(),
            url: channel.url.clone(),
            ..Self::default()
        }
    }

    /// Move to `next` if the transition is legal.
    pub fn transition(&mut self, next: ChannelStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            tracing::warn!(
                channel = %self.name,
                from = %self.status,
                to = %next,
                "Rejected status transition"
            );
            false
        }
    }

    pub fn mark_testing(&mut self) -> bool {
        self.transition(ChannelStatus::Testing)
    }

    /// Take notes and resolution from the seeding probe.
    pub fn seed(&mut self, outcome: &ProbeOutcome) {
        self.details = outcome.notes.clone();
        if outcome.resolution.is_some() {
            self.resolution = outcome.resolution.clone();
        }
        self.last_probe_seconds = outcome.probe_duration;
    }

    /// Apply one live event from a continuous probe.
    pub fn apply_event(&mut self, event: &ProbeEvent) {
        match event {
            ProbeEvent::Error { at, line } => {
                self.disconnects.push(*at);
                self.disconnects_count = self.disconnects.len();
                self.issues.errors += 1;
                self.append_detail(line);
            }
            ProbeEvent::Buffering { line, .. } => {
                self.issues.buffering += 1;
                // A line that is both an error and a buffering hit is noted once.
                if self.details.rsplit('\n').next() != Some(line.as_str()) {
                    self.append_detail(line);
                }
            }
            ProbeEvent::Resolution(resolution) => {
                self.resolution = Some(resolution.clone());
            }
        }
    }

    /// Elapsed time in the window; never moves backwards.
    pub fn set_tested(&mut self, elapsed: Duration) {
        self.tested_seconds = self.tested_seconds.max(elapsed.as_secs());
    }

    /// Apply one short probe taken during a periodic window.
    pub fn record_probe(&mut self, outcome: &ProbeOutcome, at: u64) {
        self.seed(outcome);
        match outcome.status {
            ProbeStatus::Pass => {}
            ProbeStatus::Buffering => {
                self.issues.buffering += 1;
                self.buffering_events.push(round2(outcome.probe_duration.unwrap_or(0.0)));
            }
            ProbeStatus::Error => {
                self.issues.errors += 1;
                self.disconnects.push(at);
            }
        }
        self.disconnects_count = self.disconnects.len();
    }

    /// Finalize after a continuous window.
    pub fn finish_continuous(&mut self, outcome: &ContinuousOutcome, seed_notes: &str) {
        let mut details = seed_notes.trim().to_string();
        if !outcome.notes.is_empty() {
            if !details.is_empty() {
                details.push('\n');
            }
            details.push_str(&outcome.notes);
        }
        truncate_front(&mut details, NOTES_CAP);
        self.details = details;

        if outcome.resolution.is_some() {
            self.resolution = outcome.resolution.clone();
        }
        self.issues.buffering = self.issues.buffering.max(outcome.buffering_count);
        self.issues.errors = self.issues.errors.max(outcome.error_count);
        self.set_tested(outcome.elapsed);
        self.transition(outcome.status().into());
        self.finish_window();
    }

    /// Finalize after a periodic window.
    pub fn finish_periodic(&mut self, elapsed: Duration) {
        self.set_tested(elapsed);
        let status = if self.issues.buffering == 0 && self.issues.errors == 0 {
            ChannelStatus::Pass
        } else {
            ChannelStatus::Issue
        };
        self.transition(status);
        self.finish_window();
    }

    /// Recompute derived totals from the event lists.
    pub fn finish_window(&mut self) {
        self.disconnects_count = self.disconnects.len();
        self.buffering_total_seconds = round2(self.buffering_events.iter().sum());
    }

    fn append_detail(&mut self, line: &str) {
        if !self.details.is_empty() {
            self.details.push('\n');
        }
        self.details.push_str(line);
        truncate_front(&mut self.details, NOTES_CAP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::WatchEnd;

    fn channel() -> Channel {
        Channel { id: 7, name: "News".into(), url: "http://x/news".into() }
    }

    fn continuous(buffering: u32, errors: u32, end: WatchEnd) -> ContinuousOutcome {
        ContinuousOutcome {
            buffering_count: buffering,
            error_count: errors,
            notes: String::new(),
            resolution: None,
            elapsed: Duration::from_secs(30),
            end,
        }
    }

    #[test]
    fn test_pending_record() {
        let record = ChannelHealthRecord::pending(&channel());
        assert_eq!(record.status, ChannelStatus::Pending);
        assert_eq!(record.id, 7);
        assert!(record.disconnects.is_empty());
    }

    #[test]
    fn test_live_events_keep_counts_consistent() {
        let mut record = ChannelHealthRecord::pending(&channel());
        record.mark_testing();
        record.apply_event(&ProbeEvent::Error { at: 100, line: "Connection error".into() });
        record.apply_event(&ProbeEvent::Error { at: 101, line: "read failed".into() });
        record.apply_event(&ProbeEvent::Buffering { at: 102, line: "buffer".into() });
        record.apply_event(&ProbeEvent::Resolution("1280x720".into()));

        assert_eq!(record.issues, IssueCounts { buffering: 1, errors: 2 });
        assert_eq!(record.disconnects, vec![100, 101]);
        assert_eq!(record.disconnects_count, 2);
        assert_eq!(record.resolution.as_deref(), Some("1280x720"));
        assert_eq!(record.details, "Connection error\nread failed\nbuffer");
    }

    #[test]
    fn test_line_with_two_signals_noted_once() {
        let mut record = ChannelHealthRecord::pending(&channel());
        let line = "buffer read error".to_string();
        record.apply_event(&ProbeEvent::Error { at: 1, line: line.clone() });
        record.apply_event(&ProbeEvent::Buffering { at: 1, line });
        assert_eq!(record.details, "buffer read error");
        assert_eq!(record.issues, IssueCounts { buffering: 1, errors: 1 });
    }

    #[test]
    fn test_finish_continuous_pass_and_issue() {
        let mut record = ChannelHealthRecord::pending(&channel());
        record.mark_testing();
        record.finish_continuous(&continuous(0, 0, WatchEnd::Killed), "[video detected]");
        assert_eq!(record.status, ChannelStatus::Pass);
        assert_eq!(record.details, "[video detected]");
        assert_eq!(record.tested_seconds, 30);

        let mut record = ChannelHealthRecord::pending(&channel());
        record.mark_testing();
        record.apply_event(&ProbeEvent::Buffering { at: 1, line: "buffer".into() });
        let mut outcome = continuous(1, 0, WatchEnd::Killed);
        outcome.notes = "buffer".into();
        record.finish_continuous(&outcome, "");
        assert_eq!(record.status, ChannelStatus::Issue);
        assert_eq!(record.issues.buffering, 1);
        assert_eq!(record.details, "buffer");
    }

    #[test]
    fn test_finish_continuous_error_when_probe_never_ran() {
        let mut record = ChannelHealthRecord::pending(&channel());
        record.mark_testing();
        record.finish_continuous(&continuous(0, 0, WatchEnd::Failed("spawn".into())), "");
        assert_eq!(record.status, ChannelStatus::Error);
    }

    #[test]
    fn test_issues_never_decrease() {
        let mut record = ChannelHealthRecord::pending(&channel());
        record.mark_testing();
        record.apply_event(&ProbeEvent::Error { at: 1, line: "error".into() });
        record.apply_event(&ProbeEvent::Error { at: 2, line: "error".into() });
        record.finish_continuous(&continuous(0, 1, WatchEnd::Killed), "");
        assert_eq!(record.issues.errors, 2);
        assert_eq!(record.disconnects_count, 2);
    }

    #[test]
    fn test_tested_seconds_monotonic() {
        let mut record = ChannelHealthRecord::default();
        record.set_tested(Duration::from_secs(10));
        record.set_tested(Duration::from_secs(4));
        assert_eq!(record.tested_seconds, 10);
    }

    #[test]
    fn test_periodic_window() {
        let mut record = ChannelHealthRecord::pending(&channel());
        record.mark_testing();
        let buffering = ProbeOutcome {
            status: ProbeStatus::Buffering,
            notes: "[ffprobe buffering]".into(),
            resolution: Some("640x360".into()),
            probe_duration: Some(1.234),
        };
        record.record_probe(&buffering, 50);
        record.record_probe(&buffering, 51);
        record.record_probe(&ProbeOutcome::timed_out(), 52);
        record.finish_periodic(Duration::from_secs(9));

        assert_eq!(record.status, ChannelStatus::Issue);
        assert_eq!(record.buffering_events, vec![1.23, 1.23]);
        assert_eq!(record.buffering_total_seconds, 2.46);
        assert_eq!(record.disconnects, vec![52]);
        assert_eq!(record.disconnects_count, 1);
        assert_eq!(record.issues, IssueCounts { buffering: 2, errors: 1 });
        assert_eq!(record.resolution.as_deref(), Some("640x360"));
        assert_eq!(record.details, "timeout");
    }

    #[test]
    fn test_terminal_status_cannot_regress() {
        let mut record = ChannelHealthRecord::pending(&channel());
        record.mark_testing();
        record.finish_periodic(Duration::from_secs(1));
        assert_eq!(record.status, ChannelStatus::Pass);
        assert!(!record.mark_testing());
        assert_eq!(record.status, ChannelStatus::Pass);
    }

    #[test]
    fn test_snapshot_field_names() {
        let record = ChannelHealthRecord::pending(&channel());
        let value = serde_json::to_value(&record).unwrap();
        for key in [
            "id", "name", "url", "status", "details", "resolution", "tested_seconds", "issues",
            "disconnects_count", "disconnects", "buffering_total_seconds", "buffering_events",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["status"], "pending");
        assert_eq!(value["issues"]["buffering"], 0);
    }
}
