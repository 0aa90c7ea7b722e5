//! Sequential long-duration sessions.
//!
//! # Per-Channel Protocol
//! ```text
//! 1. record → testing                       (snapshot)
//! 2. continuous: seed probe, min(seed_timeout, window)
//!                                           (snapshot: details, resolution)
//!    then probe for the window while a progress task applies
//!    live events every progress_interval    (snapshot per tick)
//! 3. periodic: short probes every check_interval until the window
//!    ends, each one counted                 (snapshot per probe)
//! 4. finalize status and derived totals     (snapshot)
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::clock::unix_now;
use crate::config::{SessionConfig, SessionMode};
use crate::health::{ChannelHealthRecord, ChannelStatus, IssueCounts};
use crate::probe::{probe_continuous, probe_once, ProbeEvent, ProbeOutcome, StreamProber};
use crate::session::Session;
use crate::storage::ChannelId;

/// Summary of one channel's window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelReport {
    pub id: ChannelId,
    pub name: String,
    pub url: String,
    pub status: ChannelStatus,
    pub notes: String,
    pub issues: IssueCounts,
}

impl From<&ChannelHealthRecord> for ChannelReport {
    fn from(record: &ChannelHealthRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            url: record.url.clone(),
            status: record.status,
            notes: record.details.clone(),
            issues: record.issues,
        }
    }
}

/// Runs each channel of a session in order, one at a time.
pub struct SequentialOrchestrator {
    prober: Arc<dyn StreamProber>,
    config: SessionConfig,
}

impl SequentialOrchestrator {
    pub fn new(prober: Arc<dyn StreamProber>, config: SessionConfig) -> Self {
        Self { prober, config }
    }

    pub async fn run(&self, session: &Session) -> Vec<ChannelReport> {
        let total = session.channel_count().await;
        let mut reports = Vec::with_capacity(total);

        for index in 0..total {
            if let Some(report) = self.run_channel(session, index, total).await {
                tracing::info!(
                    channel = %report.name,
                    status = %report.status,
                    buffering = report.issues.buffering,
                    errors = report.issues.errors,
                    "Channel finished"
                );
                reports.push(report);
            }
        }

        reports
    }

    async fn run_channel(&self, session: &Session, index: usize, total: usize) -> Option<ChannelReport> {
        let record = session.record(index).await?;
        let url = record.url.clone();

        tracing::info!(
            channel = %record.name,
            position = index + 1,
            total,
            mode = ?self.config.mode,
            "Testing channel"
        );

        session.update(index, |r| r.mark_testing()).await;

        match self.config.mode {
            SessionMode::Continuous => {
                let seed = probe_once(self.prober.as_ref(), &url, self.config.seed_timeout()).await;
                session.update(index, |r| r.seed(&seed)).await;
                self.run_continuous(session, index, &url, &seed).await
            }
            SessionMode::Periodic => self.run_periodic(session, index, &url).await,
        }

        session.record(index).await.map(|r| ChannelReport::from(&r))
    }

    async fn run_continuous(&self, session: &Session, index: usize, url: &str, seed: &ProbeOutcome) {
        let started = Instant::now();
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        // Stops the progress task even if this future is dropped.
        let _stop_progress = cancel.clone().drop_guard();

        let progress = tokio::spawn(progress_loop(
            session.clone(),
            index,
            rx,
            started,
            self.config.progress_interval(),
            cancel.clone(),
        ));

        let outcome = probe_continuous(self.prober.as_ref(), url, self.config.duration(), tx).await;

        cancel.cancel();
        let mut remaining = match progress.await {
            Ok(rx) => Some(rx),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Progress task failed");
                None
            }
        };

        session
            .update(index, |r| {
                if let Some(rx) = remaining.as_mut() {
                    while let Ok(event) = rx.try_recv() {
                        r.apply_event(&event);
                    }
                }
                r.finish_continuous(&outcome, &seed.notes);
            })
            .await;
    }

    async fn run_periodic(&self, session: &Session, index: usize, url: &str) {
        let started = Instant::now();
        let window = self.config.duration();

        loop {
            let remaining = window.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }

            let limit = self.config.seed_timeout().min(remaining).max(Duration::from_secs(1));
            let outcome = probe_once(self.prober.as_ref(), url, limit).await;
            let at = unix_now();
            session
                .update(index, |r| {
                    r.record_probe(&outcome, at);
                    r.set_tested(started.elapsed());
                })
                .await;

            let remaining = window.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(self.config.check_interval().min(remaining)).await;
        }

        session.update(index, |r| r.finish_periodic(started.elapsed())).await;
    }
}

/// Apply queued events and elapsed time every `every` until cancelled.
///
/// Hands the receiver back so the caller can drain what is left.
async fn progress_loop(
    session: Session,
    index: usize,
    mut events: mpsc::UnboundedReceiver<ProbeEvent>,
    started: Instant,
    every: Duration,
    cancel: CancellationToken,
) -> mpsc::UnboundedReceiver<ProbeEvent> {
    let every = every.max(Duration::from_millis(10));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                session
                    .update(index, |r| {
                        while let Ok(event) = events.try_recv() {
                            r.apply_event(&event);
                        }
                        r.set_tested(started.elapsed());
                    })
                    .await;
            }
        }
    }

    events
}
