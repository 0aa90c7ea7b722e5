//! Sequential sessions driven directly through the orchestrator.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use iptv_monitor::config::{SessionConfig, SessionMode};
use iptv_monitor::health::{ChannelHealthRecord, ChannelStatus};
use iptv_monitor::orchestrator::SequentialOrchestrator;
use iptv_monitor::probe::InspectionReport;
use iptv_monitor::session::{LoopMode, Session, SessionSnapshot, SnapshotStore};
use iptv_monitor::storage::Channel;

mod common;
use common::{Script, ScriptedProber};

fn channels(urls: &[&str]) -> Vec<ChannelHealthRecord> {
    urls.iter()
        .enumerate()
        .map(|(i, url)| {
            ChannelHealthRecord::pending(&Channel {
                id: i as u64 + 1,
                name: format!("ch{}", i + 1),
                url: url.to_string(),
            })
        })
        .collect()
}

fn config(dir: &tempfile::TempDir, mode: SessionMode) -> SessionConfig {
    SessionConfig {
        duration_secs: 1,
        mode,
        check_interval_secs: 1,
        progress_interval_secs: 1,
        seed_timeout_secs: 1,
        snapshot_path: dir.path().join("results.json"),
        ..SessionConfig::default()
    }
}

async fn start(dir: &tempfile::TempDir, urls: &[&str]) -> (Session, SnapshotStore) {
    let store = SnapshotStore::new(dir.path().join("results.json"));
    let snapshot = SessionSnapshot::new(channels(urls), 0, Duration::from_secs(1), LoopMode::Single, 1);
    let session = Session::start(store.clone(), snapshot).await.unwrap();
    (session, store)
}

#[tokio::test]
async fn test_continuous_pass_and_issue() {
    let dir = tempfile::tempdir().unwrap();
    let prober = Arc::new(
        ScriptedProber::new()
            .with("http://a", Script::healthy())
            .with("http://b", Script::healthy().with_diagnostics(&["Stream buffer underflow"])),
    );
    let (session, store) = start(&dir, &["http://a", "http://b"]).await;

    let orchestrator = SequentialOrchestrator::new(prober.clone(), config(&dir, SessionMode::Continuous));
    let reports = orchestrator.run(&session).await;

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].status, ChannelStatus::Pass);
    assert_eq!(reports[1].status, ChannelStatus::Issue);
    assert_eq!(reports[1].issues.buffering, 1);
    assert_eq!(reports[1].issues.errors, 0);

    let on_disk = store.load().await.unwrap().unwrap();
    assert_eq!(on_disk.channels[0].status, ChannelStatus::Pass);
    assert_eq!(on_disk.channels[0].resolution.as_deref(), Some("1280x720"));
    assert!(on_disk.channels[0].details.contains("[video detected 1280x720]"));
    assert_eq!(on_disk.channels[1].status, ChannelStatus::Issue);
    assert!(on_disk.channels[1].details.ends_with("Stream buffer underflow"));

    assert_eq!(*prober.watch_order.lock().unwrap(), vec!["http://a", "http://b"]);
    assert_eq!(prober.inspect_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_error_lines_become_disconnects() {
    let dir = tempfile::tempdir().unwrap();
    let prober = Arc::new(ScriptedProber::new().with(
        "http://a",
        Script::healthy().with_diagnostics(&["Connection error", "Reconnect failed", "frame ok"]),
    ));
    let (session, _) = start(&dir, &["http://a"]).await;

    SequentialOrchestrator::new(prober, config(&dir, SessionMode::Continuous))
        .run(&session)
        .await;

    let record = session.record(0).await.unwrap();
    assert_eq!(record.status, ChannelStatus::Issue);
    assert_eq!(record.issues.errors, 2);
    assert_eq!(record.disconnects_count, 2);
    assert_eq!(record.disconnects.len(), 2);
    assert_eq!(record.buffering_total_seconds, 0.0);
    assert!(record.details.ends_with("Connection error\nReconnect failed"));
    assert!(!record.details.contains("frame ok"));
}

#[tokio::test]
async fn test_progress_updates_tested_seconds() {
    let dir = tempfile::tempdir().unwrap();
    let mut script = Script::healthy().holding(Duration::from_secs(5));
    script.line_gap = Duration::from_millis(200);
    let prober = Arc::new(ScriptedProber::new().with("http://a", script));
    let (session, store) = start(&dir, &["http://a"]).await;

    let mut config = config(&dir, SessionMode::Continuous);
    config.duration_secs = 2;
    let run = {
        let session = session.clone();
        tokio::spawn(async move { SequentialOrchestrator::new(prober, config).run(&session).await })
    };

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let live = store.load().await.unwrap().unwrap();
    assert_eq!(live.channels[0].status, ChannelStatus::Testing);
    assert!(live.channels[0].tested_seconds >= 1);

    let reports = run.await.unwrap();
    assert_eq!(reports[0].status, ChannelStatus::Pass);
    let record = session.record(0).await.unwrap();
    assert!(record.tested_seconds >= 2);
}

#[tokio::test]
async fn test_unrunnable_probe_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut script = Script::healthy();
    script.watch_fails = true;
    script.report = InspectionReport {
        success: false,
        stdout: String::new(),
        stderr: "No such file or directory".into(),
    };
    let prober = Arc::new(ScriptedProber::new().with("http://a", script));
    let (session, _) = start(&dir, &["http://a"]).await;

    let reports = SequentialOrchestrator::new(prober, config(&dir, SessionMode::Continuous))
        .run(&session)
        .await;

    assert_eq!(reports[0].status, ChannelStatus::Error);
    assert!(reports[0].notes.contains("ffprobe error: No such file or directory"));
}

#[tokio::test]
async fn test_periodic_mode_records_buffering_durations() {
    let dir = tempfile::tempdir().unwrap();
    let mut script = Script::healthy();
    script.report.stderr = "buffer queue full".into();
    let prober = Arc::new(ScriptedProber::new().with("http://a", script));
    let (session, _) = start(&dir, &["http://a"]).await;

    let mut config = config(&dir, SessionMode::Periodic);
    config.duration_secs = 2;
    SequentialOrchestrator::new(prober.clone(), config).run(&session).await;

    let record = session.record(0).await.unwrap();
    assert_eq!(record.status, ChannelStatus::Issue);
    assert!(!record.buffering_events.is_empty());
    assert_eq!(record.issues.buffering as usize, record.buffering_events.len());
    let sum: f64 = record.buffering_events.iter().sum();
    assert!((record.buffering_total_seconds - sum).abs() <= 0.01);
    assert_eq!(record.disconnects_count, 0);
    assert!(record.tested_seconds >= 2);
    // No seed probe: every inspection is a counted periodic probe.
    let calls = prober.inspect_calls.load(Ordering::SeqCst);
    assert!(calls >= 2);
    assert_eq!(record.issues.buffering as usize, calls as usize);
}
