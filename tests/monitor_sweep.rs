//! Bounded-concurrency sweeps.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use iptv_monitor::config::{FetchConfig, SweepConfig};
use iptv_monitor::fetch::Fetcher;
use iptv_monitor::lifecycle::Shutdown;
use iptv_monitor::orchestrator::{run_monitor, Monitor, MonitorState, RunEnd};
use iptv_monitor::playlist::{PlaylistEntry, PlaylistSource};
use iptv_monitor::probe::ProbeStatus;
use iptv_monitor::storage::{ChannelStore, MemoryStore};

mod common;

async fn store_with(n: usize) -> MemoryStore {
    let store = MemoryStore::new(None);
    let entries: Vec<PlaylistEntry> = (0..n)
        .map(|i| PlaylistEntry {
            name: format!("ch{}", i),
            url: format!("http://streams.test/{}", i),
        })
        .collect();
    store.add_channels_bulk(&entries).await.unwrap();
    store
}

fn sweep_config(concurrency: usize) -> SweepConfig {
    SweepConfig {
        interval_secs: 3600,
        concurrency,
        probe_timeout_secs: 5,
        ..SweepConfig::default()
    }
}

#[tokio::test]
async fn test_sweep_respects_concurrency_and_persists_each_result() {
    let store = store_with(8).await;
    let prober = Arc::new(common::ConcurrencyProber::new(Duration::from_millis(50)));
    let monitor = Monitor::new(Arc::new(store.clone()), prober.clone(), sweep_config(2));

    let entries = monitor.run_once().await.unwrap();

    assert_eq!(entries.len(), 8);
    assert!(prober.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 8);
    for entry in &entries {
        assert_eq!(entry.outcome.status, ProbeStatus::Pass);
        let stored = store.latest_result(entry.channel.id).unwrap();
        assert_eq!(stored.status, ProbeStatus::Pass);
        assert_eq!(stored.resolution.as_deref(), Some("640x360"));
        assert!(stored.startup_latency.is_some());
    }
}

#[tokio::test]
async fn test_zero_concurrency_still_progresses() {
    let store = store_with(3).await;
    let prober = Arc::new(common::ConcurrencyProber::new(Duration::from_millis(5)));
    let monitor = Monitor::new(Arc::new(store), prober.clone(), sweep_config(0));

    let entries = monitor.run_once().await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(prober.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_probe_becomes_error_outcome() {
    let store = store_with(3).await;
    let prober = Arc::new(
        common::ConcurrencyProber::new(Duration::from_millis(5)).panicking_on("http://streams.test/1"),
    );
    let monitor = Monitor::new(Arc::new(store.clone()), prober, sweep_config(3));

    let entries = monitor.run_once().await.unwrap();
    assert_eq!(entries.len(), 3);

    let failed = entries.iter().find(|e| e.channel.url.ends_with("/1")).unwrap();
    assert_eq!(failed.outcome.status, ProbeStatus::Error);
    assert!(failed.outcome.notes.starts_with("probe task failed"));
    assert_eq!(store.latest_result(failed.channel.id).unwrap().status, ProbeStatus::Error);

    let passed = entries.iter().filter(|e| e.outcome.status == ProbeStatus::Pass).count();
    assert_eq!(passed, 2);
}

#[tokio::test]
async fn test_empty_store_touches_nothing() {
    let store = MemoryStore::new(None);
    let prober = Arc::new(common::ConcurrencyProber::new(Duration::ZERO));
    let monitor = Monitor::new(Arc::new(store), prober.clone(), sweep_config(2));
    let updates = monitor.subscribe();

    for _ in 0..2 {
        let entries = monitor.run_once().await.unwrap();
        assert!(entries.is_empty());
    }
    assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    assert!(!updates.has_changed().unwrap());
}

#[tokio::test]
async fn test_start_stop_restart() {
    let store = store_with(2).await;
    let prober = Arc::new(common::ConcurrencyProber::new(Duration::from_millis(10)));
    let monitor = Monitor::new(Arc::new(store), prober.clone(), sweep_config(2));
    let mut updates = monitor.subscribe();

    assert_eq!(monitor.state(), MonitorState::Idle);
    monitor.start();
    monitor.start();
    assert_eq!(monitor.state(), MonitorState::Running);

    tokio::time::timeout(Duration::from_secs(5), updates.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updates.borrow_and_update().len(), 2);

    // The loop is now in its hour-long pause; stop must interrupt it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
    monitor.stop();
    tokio::time::timeout(Duration::from_secs(2), monitor.join()).await.unwrap();
    assert_eq!(monitor.state(), MonitorState::Stopped);

    monitor.start();
    assert_eq!(monitor.state(), MonitorState::Running);
    tokio::time::timeout(Duration::from_secs(5), updates.changed())
        .await
        .unwrap()
        .unwrap();
    monitor.stop();
    tokio::time::timeout(Duration::from_secs(2), monitor.join()).await.unwrap();
    assert_eq!(prober.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_stop_lets_in_flight_sweep_finish() {
    let store = store_with(2).await;
    let prober = Arc::new(common::ConcurrencyProber::new(Duration::from_millis(300)));
    let monitor = Monitor::new(Arc::new(store.clone()), prober.clone(), sweep_config(2));

    monitor.start();
    tokio::time::sleep(Duration::from_millis(50)).await;
    monitor.stop();
    tokio::time::timeout(Duration::from_secs(5), monitor.join()).await.unwrap();

    assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
    assert!(store.latest_result(1).is_some());
    assert!(store.latest_result(2).is_some());
}

fn playlist_file(dir: &tempfile::TempDir, entries: &[(&str, &str)]) -> PlaylistSource {
    let path = dir.path().join("playlist.m3u");
    std::fs::write(&path, common::playlist(entries)).unwrap();
    PlaylistSource::File(path)
}

#[tokio::test]
async fn test_monitor_with_no_channels_exits_without_sweeping() {
    let dir = tempfile::tempdir().unwrap();
    let source = playlist_file(&dir, &[]);
    let store = Arc::new(MemoryStore::new(None));
    let prober = Arc::new(common::ConcurrencyProber::new(Duration::ZERO));
    let monitor = Monitor::new(store.clone(), prober.clone(), sweep_config(2));
    let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
    let shutdown = Shutdown::new();

    let end = tokio::time::timeout(
        Duration::from_secs(5),
        run_monitor(&monitor, store.as_ref(), &fetcher, &source, shutdown.subscribe()),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(end, RunEnd::NoChannels);
    assert_eq!(monitor.state(), MonitorState::Idle);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_monitor_sweeps_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let source = playlist_file(&dir, &[("A", "http://streams.test/a"), ("B", "http://streams.test/b")]);
    let store = Arc::new(MemoryStore::new(None));
    let prober = Arc::new(common::ConcurrencyProber::new(Duration::ZERO));
    let monitor = Monitor::new(store.clone(), prober.clone(), sweep_config(2));
    let mut updates = monitor.subscribe();
    let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
    let shutdown = Shutdown::new();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        updates.changed().await.unwrap();
        trigger.trigger();
    });

    let end = tokio::time::timeout(
        Duration::from_secs(5),
        run_monitor(&monitor, store.as_ref(), &fetcher, &source, shutdown.subscribe()),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(end, RunEnd::Interrupted);
    assert_eq!(monitor.state(), MonitorState::Stopped);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
}
