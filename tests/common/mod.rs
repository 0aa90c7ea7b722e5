//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use iptv_monitor::error::ProbeError;
use iptv_monitor::probe::{InspectionReport, OutputLine, StreamProber, WatchEnd};

/// Start a programmable mock HTTP server on an ephemeral port.
///
/// `f` returns `(status, content_type, body)` for each request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, &'static str, Vec<u8>)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut request = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => request.extend_from_slice(&buf[..n]),
                            }
                        }

                        let (status, content_type, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let head = format!(
                            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            status_text,
                            content_type,
                            body.len()
                        );
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(&body).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

pub fn healthy_report(width: u32, height: u32) -> InspectionReport {
    InspectionReport {
        success: true,
        stdout: format!("[STREAM]\ncodec_type=video\nwidth={}\nheight={}\n[/STREAM]\n", width, height),
        stderr: String::new(),
    }
}

/// What a scripted channel does when probed.
#[derive(Clone)]
pub struct Script {
    pub report: InspectionReport,
    /// Lines emitted by `watch`, in order.
    pub lines: Vec<OutputLine>,
    /// Pause between emitted lines.
    pub line_gap: Duration,
    /// How long `watch` keeps running after the last line, capped at `max_duration`.
    pub hold: Duration,
    /// `watch` fails as if the tool could not be spawned.
    pub watch_fails: bool,
}

impl Script {
    pub fn healthy() -> Self {
        Self {
            report: healthy_report(1280, 720),
            lines: vec![OutputLine::report("width=1280"), OutputLine::report("height=720")],
            line_gap: Duration::ZERO,
            hold: Duration::ZERO,
            watch_fails: false,
        }
    }

    pub fn with_diagnostics(mut self, lines: &[&str]) -> Self {
        self.lines.extend(lines.iter().map(|l| OutputLine::diagnostic(*l)));
        self
    }

    pub fn holding(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }
}

/// Prober answering from per-URL scripts. Unknown URLs fail.
#[derive(Default)]
pub struct ScriptedProber {
    scripts: HashMap<String, Script>,
    pub inspect_calls: AtomicU32,
    pub watch_order: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, script: Script) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    fn script(&self, url: &str) -> Result<&Script, ProbeError> {
        self.scripts
            .get(url)
            .ok_or_else(|| ProbeError::Failed(format!("no script for {}", url)))
    }
}

#[async_trait]
impl StreamProber for ScriptedProber {
    async fn inspect(&self, url: &str) -> Result<InspectionReport, ProbeError> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.script(url)?.report.clone())
    }

    async fn watch(
        &self,
        url: &str,
        max_duration: Duration,
        lines: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<WatchEnd, ProbeError> {
        self.watch_order.lock().unwrap().push(url.to_string());
        let script = self.script(url)?;
        if script.watch_fails {
            return Err(ProbeError::Failed("ffprobe not found".into()));
        }
        for line in &script.lines {
            if !script.line_gap.is_zero() {
                tokio::time::sleep(script.line_gap).await;
            }
            let _ = lines.send(line.clone());
        }
        tokio::time::sleep(script.hold.min(max_duration)).await;
        Ok(WatchEnd::Exited { code: Some(0) })
    }
}

/// Prober that records how many inspections overlap.
pub struct ConcurrencyProber {
    delay: Duration,
    panic_on: Option<String>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl ConcurrencyProber {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            panic_on: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn panicking_on(mut self, url: &str) -> Self {
        self.panic_on = Some(url.to_string());
        self
    }
}

#[async_trait]
impl StreamProber for ConcurrencyProber {
    async fn inspect(&self, url: &str) -> Result<InspectionReport, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on.as_deref() == Some(url) {
            panic!("probe exploded");
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(healthy_report(640, 360))
    }

    async fn watch(
        &self,
        _url: &str,
        _max_duration: Duration,
        _lines: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<WatchEnd, ProbeError> {
        Ok(WatchEnd::Exited { code: Some(0) })
    }
}

/// Prober that never returns.
pub struct HangingProber;

#[async_trait]
impl StreamProber for HangingProber {
    async fn inspect(&self, _url: &str) -> Result<InspectionReport, ProbeError> {
        std::future::pending().await
    }

    async fn watch(
        &self,
        _url: &str,
        _max_duration: Duration,
        _lines: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<WatchEnd, ProbeError> {
        std::future::pending().await
    }
}

pub fn playlist(entries: &[(&str, &str)]) -> String {
    let mut text = String::from("#EXTM3U\n");
    for (name, url) in entries {
        text.push_str(&format!("#EXTINF:-1 tvg-id=\"{}\",{}\n{}\n", name, name, url));
    }
    text
}
