//! Stream probing.
//!
//! # Responsibilities
//! - Run a bounded one-shot inspection and classify it (`probe_once`)
//! - Run a long inspection, stream its output into live events and a
//!   terminal tally (`probe_continuous`)
//! - Keep the inspection tool behind the `StreamProber` seam
//!
//! # Data Flow
//! ```text
//! StreamProber::watch ──lines──▶ ContinuousTally ──ProbeEvent──▶ caller
//!        │                              │
//!        └──── WatchEnd ───────────────▶└──▶ ContinuousOutcome
//! ```
//!
//! # Design Decisions
//! - Both entry points are infallible: every failure becomes an outcome
//! - Lines are drained while the process runs, never buffered to the end
//! - A backstop deadline guards against probers that ignore `max_duration`

pub mod classify;
pub mod ffprobe;
pub mod tally;
pub mod types;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::clock::unix_now;
use crate::error::ProbeError;
use crate::observability::metrics;

pub use classify::{classify_line, classify_report, LineSignal, ResolutionTracker};
pub use ffprobe::FfprobeProber;
pub use tally::ContinuousTally;
pub use types::{
    ContinuousOutcome, ContinuousStatus, InspectionReport, OutputChannel, OutputLine, ProbeEvent,
    ProbeOutcome, ProbeStatus, WatchEnd,
};

/// Extra time a prober gets past `max_duration` before it is abandoned.
pub const WATCH_GRACE: Duration = Duration::from_secs(5);

/// An external media inspection tool.
#[async_trait]
pub trait StreamProber: Send + Sync {
    /// One-shot inspection; returns the captured output.
    async fn inspect(&self, url: &str) -> Result<InspectionReport, ProbeError>;

    /// Inspect for up to `max_duration`, pushing every output line as it arrives.
    async fn watch(
        &self,
        url: &str,
        max_duration: Duration,
        lines: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<WatchEnd, ProbeError>;
}

/// Run a bounded one-shot probe. Never fails.
pub async fn probe_once<P>(prober: &P, url: &str, limit: Duration) -> ProbeOutcome
where
    P: StreamProber + ?Sized,
{
    let started = Instant::now();

    let outcome = match timeout(limit, prober.inspect(url)).await {
        Err(_) => ProbeOutcome::timed_out(),
        Ok(Err(e)) => ProbeOutcome::failed(e.to_string()),
        Ok(Ok(report)) => classify::evaluate_report(&report, started.elapsed()),
    };

    tracing::debug!(
        url = %url,
        status = %outcome.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Probe finished"
    );
    metrics::record_probe(
        "once",
        outcome.status.as_str(),
        outcome.probe_duration.map(Duration::from_secs_f64),
    );

    outcome
}

/// Run a continuous probe for `max_duration`, forwarding live events.
///
/// Events are best-effort: a dropped receiver does not stop the probe.
pub async fn probe_continuous<P>(
    prober: &P,
    url: &str,
    max_duration: Duration,
    events: mpsc::UnboundedSender<ProbeEvent>,
) -> ContinuousOutcome
where
    P: StreamProber + ?Sized,
{
    let started = Instant::now();
    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    let mut tally = ContinuousTally::new();

    let watch = timeout(max_duration + WATCH_GRACE, prober.watch(url, max_duration, line_tx));
    tokio::pin!(watch);

    let end = loop {
        tokio::select! {
            biased;
            Some(line) = line_rx.recv() => forward(&mut tally, &line, &events),
            result = &mut watch => break match result {
                Ok(Ok(end)) => end,
                Ok(Err(e)) => WatchEnd::Failed(e.to_string()),
                Err(_) => {
                    tracing::warn!(url = %url, "Prober overran its deadline; abandoning");
                    WatchEnd::TimedOut
                }
            },
        }
    };

    while let Ok(line) = line_rx.try_recv() {
        forward(&mut tally, &line, &events);
    }

    let outcome = tally.finish(end, started.elapsed());
    let status = outcome.status();

    tracing::info!(
        url = %url,
        status = status.as_str(),
        buffering = outcome.buffering_count,
        errors = outcome.error_count,
        elapsed_secs = outcome.elapsed.as_secs(),
        "Continuous probe finished"
    );
    metrics::record_probe("continuous", status.as_str(), Some(outcome.elapsed));

    outcome
}

fn forward(tally: &mut ContinuousTally, line: &OutputLine, events: &mpsc::UnboundedSender<ProbeEvent>) {
    for event in tally.observe(line, unix_now()) {
        let kind = match &event {
            ProbeEvent::Error { .. } => "error",
            ProbeEvent::Buffering { .. } => "buffering",
            ProbeEvent::Resolution(_) => "resolution",
        };
        metrics::record_probe_event(kind);
        let _ = events.send(event);
    }
}
