//! `ffprobe` backend.
//!
//! # Design Decisions
//! - `kill_on_drop` so an abandoned probe never leaks a process
//! - Output is read as bytes and decoded lossily; streams emit odd encodings
//! - Readers get a short grace period after exit, then are aborted

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::probe::types::{InspectionReport, OutputChannel, OutputLine, WatchEnd};
use crate::probe::StreamProber;

/// Runs the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    config: ProbeConfig,
}

impl FfprobeProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// First line of `ffprobe -version`, if the binary runs.
    pub async fn version(&self) -> Option<String> {
        let output = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|l| l.trim().to_string())
    }

    pub fn inspect_args(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-v", "error", "-show_streams", "-show_format"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.push_input(&mut args, url);
        args
    }

    pub fn watch_args(&self, url: &str, max_duration: Duration) -> Vec<String> {
        let mut args: Vec<String> = ["-v", "error", "-show_streams", "-show_packets", "-read_intervals"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(format!("%+{}", max_duration.as_secs().max(1)));
        self.push_input(&mut args, url);
        args
    }

    fn push_input(&self, args: &mut Vec<String>, url: &str) {
        if let Some(ua) = &self.config.user_agent {
            args.push("-user_agent".to_string());
            args.push(ua.clone());
        }
        args.extend(self.config.extra_input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(url.to_string());
    }

    fn command(&self, args: Vec<String>) -> Command {
        let mut cmd = Command::new(&self.config.ffprobe_path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> ProbeError {
        ProbeError::Spawn {
            program: self.config.ffprobe_path.clone(),
            source,
        }
    }
}

#[async_trait]
impl StreamProber for FfprobeProber {
    async fn inspect(&self, url: &str) -> Result<InspectionReport, ProbeError> {
        let output = self
            .command(self.inspect_args(url))
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        Ok(InspectionReport {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn watch(
        &self,
        url: &str,
        max_duration: Duration,
        lines: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<WatchEnd, ProbeError> {
        let mut child = self
            .command(self.watch_args(url, max_duration))
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        tracing::debug!(url = %url, pid = ?child.id(), "ffprobe started");

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, OutputChannel::Report, lines.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, OutputChannel::Diagnostic, lines.clone())));
        }
        drop(lines);

        let waited = timeout(max_duration, child.wait()).await;
        let end = match waited {
            Ok(Ok(status)) => WatchEnd::Exited { code: status.code() },
            Ok(Err(e)) => {
                for handle in &readers {
                    handle.abort();
                }
                return Err(ProbeError::Io(e));
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(url = %url, error = %e, "Failed to kill ffprobe");
                }
                WatchEnd::Killed
            }
        };

        let grace = self.config.reader_grace();
        for mut handle in readers {
            if timeout(grace, &mut handle).await.is_err() {
                tracing::debug!(url = %url, "Output reader did not drain in time; aborting");
                handle.abort();
            }
        }

        Ok(end)
    }
}

/// Push each line of `reader` to `tx` until EOF or the receiver goes away.
pub async fn forward_lines<R>(reader: R, channel: OutputChannel, tx: mpsc::UnboundedSender<OutputLine>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx.send(OutputLine { channel, text }).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Output reader stopped");
                break;
            }
        }
    }
}
