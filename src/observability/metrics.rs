//! Metrics collection and exposition.
//!
//! # Metrics
//! - `iptv_probe_total` (counter): probes by mode and status
//! - `iptv_probe_duration_seconds` (histogram): wall time of one-shot probes
//! - `iptv_probe_events_total` (counter): continuous-probe events by kind
//! - `iptv_snapshot_writes_total` (counter): snapshot writes by result
//! - `iptv_sweep_duration_seconds` (histogram): Monitor sweep wall time
//! - `iptv_channels_probed` (gauge): channels in the latest sweep

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(mode: &'static str, status: &'static str, elapsed: Option<Duration>) {
    counter!("iptv_probe_total", "mode" => mode, "status" => status).increment(1);
    if let Some(elapsed) = elapsed {
        histogram!("iptv_probe_duration_seconds", "mode" => mode).record(elapsed.as_secs_f64());
    }
}

pub fn record_probe_event(kind: &'static str) {
    counter!("iptv_probe_events_total", "kind" => kind).increment(1);
}

pub fn record_snapshot_write(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    counter!("iptv_snapshot_writes_total", "result" => result).increment(1);
}

pub fn record_sweep(channels: usize, elapsed: Duration) {
    gauge!("iptv_channels_probed").set(channels as f64);
    histogram!("iptv_sweep_duration_seconds").record(elapsed.as_secs_f64());
}
