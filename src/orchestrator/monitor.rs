//! Bounded-concurrency periodic sweeps.
//!
//! # States
//! ```text
//! Idle → Running: start()
//! Running → Stopped: stop(); the current sweep finishes first
//! Stopped → Running: start() again
//! ```
//!
//! # Design Decisions
//! - One spawned task per channel, admitted by a semaphore
//! - Results are persisted as each probe completes, not at sweep end
//! - A panicked probe task is reported as that channel's error outcome

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::unix_now;
use crate::config::SweepConfig;
use crate::error::StoreError;
use crate::fetch::Fetcher;
use crate::observability::metrics;
use crate::probe::{probe_once, ProbeOutcome, ProbeStatus, StreamProber};
use crate::storage::{Channel, ChannelStore, ResultRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MonitorState {
    Idle = 0,
    Running = 1,
    Stopped = 2,
}

impl From<u8> for MonitorState {
    fn from(value: u8) -> Self {
        match value {
            1 => MonitorState::Running,
            2 => MonitorState::Stopped,
            _ => MonitorState::Idle,
        }
    }
}

/// One channel's result within a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepEntry {
    pub channel: Channel,
    pub outcome: ProbeOutcome,
    /// Bytes per second, when sampling is enabled and succeeded.
    pub throughput: Option<f64>,
}

struct MonitorInner {
    store: Arc<dyn ChannelStore>,
    prober: Arc<dyn StreamProber>,
    sampler: Option<Fetcher>,
    config: SweepConfig,
    state: AtomicU8,
    latest: watch::Sender<Arc<Vec<SweepEntry>>>,
}

/// Periodically probes every stored channel.
pub struct Monitor {
    inner: Arc<MonitorInner>,
    task: Mutex<Option<JoinHandle<()>>>,
    cancel: Mutex<CancellationToken>,
}

impl Monitor {
    pub fn new(store: Arc<dyn ChannelStore>, prober: Arc<dyn StreamProber>, config: SweepConfig) -> Self {
        let (latest, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(MonitorInner {
                store,
                prober,
                sampler: None,
                config,
                state: AtomicU8::new(MonitorState::Idle as u8),
                latest,
            }),
            task: Mutex::new(None),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Also measure throughput with `fetcher` after each healthy probe.
    pub fn with_sampler(self, fetcher: Fetcher) -> Self {
        let Monitor { inner, task, cancel } = self;
        let inner = match Arc::try_unwrap(inner) {
            Ok(mut inner) => {
                inner.sampler = Some(fetcher);
                Arc::new(inner)
            }
            Err(shared) => {
                tracing::warn!("Monitor already shared; throughput sampling not enabled");
                shared
            }
        };
        Self { inner, task, cancel }
    }

    pub fn state(&self) -> MonitorState {
        MonitorState::from(self.inner.state.load(Ordering::SeqCst))
    }

    /// Start the sweep loop. No-op while a loop is still running.
    pub fn start(&self) {
        let mut task = lock(&self.task);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("Monitor already running");
            return;
        }

        let token = CancellationToken::new();
        *lock(&self.cancel) = token.clone();
        self.inner.state.store(MonitorState::Running as u8, Ordering::SeqCst);

        tracing::info!(
            interval_secs = self.inner.config.interval_secs,
            concurrency = self.inner.config.concurrency,
            "Monitor starting"
        );

        let inner = self.inner.clone();
        *task = Some(tokio::spawn(async move { inner.run_loop(token).await }));
    }

    /// Ask the loop to stop after the current sweep; interrupts the pause between sweeps.
    pub fn stop(&self) {
        self.inner.state.store(MonitorState::Stopped as u8, Ordering::SeqCst);
        lock(&self.cancel).cancel();
    }

    /// Wait for the loop to exit.
    pub async fn join(&self) {
        let handle = lock(&self.task).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Monitor loop failed");
            }
        }
    }

    /// Run a single sweep now.
    pub async fn run_once(&self) -> Result<Vec<SweepEntry>, StoreError> {
        self.inner.sweep().await
    }

    /// Receive every completed sweep.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<SweepEntry>>> {
        self.inner.latest.subscribe()
    }
}

impl MonitorInner {
    async fn run_loop(self: Arc<Self>, cancel: CancellationToken) {
        let interval = self.config.interval();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.sweep().await {
                Ok(entries) => tracing::info!(channels = entries.len(), "Sweep complete"),
                Err(e) => tracing::error!(error = %e, "Sweep failed: could not list channels"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        self.state.store(MonitorState::Stopped as u8, Ordering::SeqCst);
        tracing::info!("Monitor stopped");
    }

    async fn sweep(&self) -> Result<Vec<SweepEntry>, StoreError> {
        let started = Instant::now();
        let channels = self.store.list_channels().await?;
        if channels.is_empty() {
            tracing::debug!("No channels to sweep");
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let timeout = self.config.probe_timeout();
        let mut pending = FuturesUnordered::new();

        for channel in channels {
            let semaphore = semaphore.clone();
            let prober = self.prober.clone();
            let sampler = self.sampler.clone().map(|f| (f, self.config.sample_max_bytes));
            let url = channel.url.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                probe_channel(prober, sampler, &url, timeout).await
            });
            pending.push(async move { (channel, handle.await) });
        }

        let mut entries = Vec::with_capacity(pending.len());
        while let Some((channel, joined)) = pending.next().await {
            let (outcome, throughput) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(channel = %channel.name, error = %e, "Probe task failed");
                    (ProbeOutcome::failed(format!("probe task failed: {}", e)), None)
                }
            };

            let record = ResultRecord::from_outcome(channel.id, &outcome, throughput, unix_now());
            if let Err(e) = self.store.insert_result(record).await {
                tracing::warn!(channel = %channel.name, error = %e, "Failed to persist result");
            }

            entries.push(SweepEntry { channel, outcome, throughput });
        }

        entries.sort_by_key(|e| e.channel.id);
        metrics::record_sweep(entries.len(), started.elapsed());
        self.latest.send_replace(Arc::new(entries.clone()));

        Ok(entries)
    }
}

async fn probe_channel(
    prober: Arc<dyn StreamProber>,
    sampler: Option<(Fetcher, u64)>,
    url: &str,
    timeout: Duration,
) -> (ProbeOutcome, Option<f64>) {
    let outcome = probe_once(prober.as_ref(), url, timeout).await;

    let throughput = match sampler {
        Some((fetcher, max_bytes)) if outcome.status != ProbeStatus::Error => {
            match fetcher.sample_bytes(url, max_bytes).await {
                Ok(sample) => sample.bytes_per_second(),
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "Throughput sample failed");
                    None
                }
            }
        }
        _ => None,
    };

    (outcome, throughput)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
