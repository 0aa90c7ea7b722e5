//! Session runner: playlist to finished snapshot, once or in a loop.
//!
//! # Data Flow
//! ```text
//! PlaylistSource → parse_m3u → ChannelSelection::filter
//!     → ChannelStore::add_channels_bulk → list_channels (imported ids only)
//!     → CarryOver::seed (history from the previous iteration)
//!     → Session::start → SequentialOrchestrator::run
//!     → final snapshot → carry-over for the next iteration
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::clock::unix_now;
use crate::config::SessionConfig;
use crate::error::MonitorError;
use crate::fetch::Fetcher;
use crate::health::{CarryOver, ChannelStatus};
use crate::orchestrator::monitor::Monitor;
use crate::orchestrator::sequential::{ChannelReport, SequentialOrchestrator};
use crate::playlist::{ChannelSelection, PlaylistSource};
use crate::probe::StreamProber;
use crate::session::{LoopMode, Session, SessionSnapshot, SnapshotStore};
use crate::storage::{Channel, ChannelId, ChannelStore};

/// Load, filter and import a playlist; returns the imported channels by id.
pub async fn import_channels(
    store: &dyn ChannelStore,
    fetcher: &Fetcher,
    source: &PlaylistSource,
    selection: Option<&ChannelSelection>,
) -> Result<Vec<Channel>, MonitorError> {
    let entries = source.load(fetcher).await?;
    let parsed = entries.len();
    let entries = match selection {
        Some(selection) => selection.filter(entries),
        None => entries,
    };

    tracing::info!(source = %source, parsed, selected = entries.len(), "Playlist loaded");

    let ids: HashSet<ChannelId> = store.add_channels_bulk(&entries).await?.into_iter().collect();
    let channels = store
        .list_channels()
        .await?
        .into_iter()
        .filter(|c| ids.contains(&c.id))
        .collect();

    Ok(channels)
}

/// Import a playlist, then sweep it until shutdown.
///
/// An empty import ends at once with `NoChannels`; the loop never starts.
pub async fn run_monitor(
    monitor: &Monitor,
    store: &dyn ChannelStore,
    fetcher: &Fetcher,
    source: &PlaylistSource,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<RunEnd, MonitorError> {
    let channels = import_channels(store, fetcher, source, None).await?;
    if channels.is_empty() {
        tracing::info!(source = %source, "No channels to monitor");
        return Ok(RunEnd::NoChannels);
    }

    tracing::info!(channels = channels.len(), "Monitoring channels");
    monitor.start();
    let _ = shutdown.recv().await;
    monitor.stop();
    monitor.join().await;
    Ok(RunEnd::Interrupted)
}

#[derive(Debug, Clone, PartialEq)]
pub enum IterationOutcome {
    /// Nothing to test after filtering.
    NoChannels,
    Completed {
        snapshot: SessionSnapshot,
        reports: Vec<ChannelReport>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Every iteration the loop mode allows has run.
    Finished,
    NoChannels,
    /// Shutdown arrived mid-iteration.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub iterations_completed: u32,
    pub last_snapshot: Option<SessionSnapshot>,
    pub end: RunEnd,
}

pub struct SessionRunner {
    store: Arc<dyn ChannelStore>,
    prober: Arc<dyn StreamProber>,
    fetcher: Fetcher,
    config: SessionConfig,
    snapshots: SnapshotStore,
}

impl SessionRunner {
    pub fn new(
        store: Arc<dyn ChannelStore>,
        prober: Arc<dyn StreamProber>,
        fetcher: Fetcher,
        config: SessionConfig,
    ) -> Self {
        let snapshots = SnapshotStore::new(config.snapshot_path.clone());
        Self { store, prober, fetcher, config, snapshots }
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Run one iteration over the imported channels.
    pub async fn run_iteration(
        &self,
        source: &PlaylistSource,
        selection: Option<&ChannelSelection>,
        loop_mode: LoopMode,
        iteration: u32,
        carry: &CarryOver,
    ) -> Result<IterationOutcome, MonitorError> {
        let channels = import_channels(self.store.as_ref(), &self.fetcher, source, selection).await?;
        if channels.is_empty() {
            tracing::info!(source = %source, "No channels to test");
            return Ok(IterationOutcome::NoChannels);
        }

        let records = channels.iter().map(|c| carry.seed(c)).collect();
        let snapshot = SessionSnapshot::new(records, unix_now(), self.config.duration(), loop_mode, iteration);
        let session = Session::start(self.snapshots.clone(), snapshot).await?;

        tracing::info!(
            iteration,
            loop_mode = %loop_mode,
            channels = channels.len(),
            carried = carry.len(),
            "Iteration starting"
        );

        let orchestrator = SequentialOrchestrator::new(self.prober.clone(), self.config.clone());
        let reports = orchestrator.run(&session).await;

        Ok(IterationOutcome::Completed {
            snapshot: session.snapshot().await,
            reports,
        })
    }

    /// Run iterations until the loop mode is exhausted or shutdown arrives.
    ///
    /// A closed shutdown channel counts as shutdown.
    pub async fn run(
        &self,
        source: &PlaylistSource,
        selection: Option<&ChannelSelection>,
        loop_mode: LoopMode,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunSummary, MonitorError> {
        let mut carry = self.resume_carry_over().await;
        let mut summary = RunSummary {
            iterations_completed: 0,
            last_snapshot: None,
            end: RunEnd::Finished,
        };

        let mut iteration = 1;
        while loop_mode.allows(iteration) {
            let outcome = tokio::select! {
                result = self.run_iteration(source, selection, loop_mode, iteration, &carry) => result?,
                _ = shutdown.recv() => {
                    tracing::info!(iteration, "Shutdown requested; stopping session");
                    summary.end = RunEnd::Interrupted;
                    return Ok(summary);
                }
            };

            match outcome {
                IterationOutcome::NoChannels => {
                    summary.end = RunEnd::NoChannels;
                    return Ok(summary);
                }
                IterationOutcome::Completed { snapshot, reports } => {
                    let issues = reports.iter().filter(|r| r.status != ChannelStatus::Pass).count();
                    tracing::info!(
                        iteration,
                        channels = reports.len(),
                        with_issues = issues,
                        "Iteration complete"
                    );
                    carry = CarryOver::from_records(&snapshot.channels);
                    summary.last_snapshot = Some(snapshot);
                    summary.iterations_completed += 1;
                }
            }

            iteration = iteration.saturating_add(1);
        }

        Ok(summary)
    }

    async fn resume_carry_over(&self) -> CarryOver {
        if !self.config.resume {
            return CarryOver::empty();
        }
        match self.snapshots.load().await {
            Ok(Some(previous)) => {
                tracing::info!(
                    path = %self.snapshots.path().display(),
                    channels = previous.channels.len(),
                    "Resuming history from previous snapshot"
                );
                CarryOver::from_records(&previous.channels)
            }
            Ok(None) => CarryOver::empty(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read previous snapshot; starting fresh");
                CarryOver::empty()
            }
        }
    }
}
