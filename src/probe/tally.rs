//! Running tally of a continuous probe.

use std::time::Duration;

use crate::probe::classify::{classify_line, LineSignal, ResolutionTracker};
use crate::probe::types::{ContinuousOutcome, OutputChannel, OutputLine, ProbeEvent, WatchEnd};

/// Upper bound on retained note text; older text is dropped first.
pub const NOTES_CAP: usize = 4096;

/// Folds output lines into counters and events.
///
/// Error and buffering signals only count on diagnostic lines, dimensions
/// only on report lines. Only diagnostic lines carrying a signal become notes.
#[derive(Debug, Default)]
pub struct ContinuousTally {
    buffering_count: u32,
    error_count: u32,
    notes: String,
    tracker: ResolutionTracker,
}

impl ContinuousTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one line; returns the events it produced.
    pub fn observe(&mut self, line: &OutputLine, at: u64) -> Vec<ProbeEvent> {
        let mut events = Vec::new();
        let text = line.text.trim_end();

        match line.channel {
            OutputChannel::Diagnostic => {
                if text.is_empty() {
                    return events;
                }
                let mut noted = false;
                for signal in classify_line(text) {
                    match signal {
                        LineSignal::Error => {
                            self.error_count += 1;
                            events.push(ProbeEvent::Error { at, line: text.to_string() });
                        }
                        LineSignal::Buffering => {
                            self.buffering_count += 1;
                            events.push(ProbeEvent::Buffering { at, line: text.to_string() });
                        }
                        _ => continue,
                    }
                    if !noted {
                        self.push_note(text);
                        noted = true;
                    }
                }
            }
            OutputChannel::Report => {
                for signal in classify_line(text) {
                    if matches!(signal, LineSignal::Width(_) | LineSignal::Height(_))
                        && self.tracker.observe(signal)
                    {
                        if let Some(res) = self.tracker.resolution() {
                            events.push(ProbeEvent::Resolution(res));
                        }
                    }
                }
            }
        }

        events
    }

    pub fn buffering_count(&self) -> u32 {
        self.buffering_count
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Consume the tally into a terminal outcome.
    pub fn finish(mut self, end: WatchEnd, elapsed: Duration) -> ContinuousOutcome {
        if let WatchEnd::Failed(message) = &end {
            let message = format!("ffprobe error: {}", message);
            self.push_note(&message);
        }
        ContinuousOutcome {
            buffering_count: self.buffering_count,
            error_count: self.error_count,
            notes: self.notes,
            resolution: self.tracker.resolution(),
            elapsed,
            end,
        }
    }

    fn push_note(&mut self, text: &str) {
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        self.notes.push_str(text);
        truncate_front(&mut self.notes, NOTES_CAP);
    }
}

/// Drop leading text so at most `cap` bytes remain, on a char boundary.
pub(crate) fn truncate_front(text: &mut String, cap: usize) {
    if text.len() <= cap {
        return;
    }
    let mut cut = text.len() - cap;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    text.drain(..cut);
}
