//! HTTP fetcher with retries.

use std::future::Future;
use std::time::{Duration, Instant};
use reqwest::header::CONTENT_TYPE;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::resilience::backoff::linear_backoff;

/// Attempts made by [`Fetcher::sample_bytes`].
const SAMPLE_ATTEMPTS: u32 = 2;

/// Bytes echoed back in decode diagnostics.
const DIAGNOSTIC_SAMPLE_LEN: usize = 32;

/// Result of reading the head of a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    pub bytes: u64,
    pub elapsed: Duration,
}

impl ThroughputSample {
    pub fn bytes_per_second(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            Some(self.bytes as f64 / secs)
        } else {
            None
        }
    }
}

/// Retrieves remote resources with bounded retries.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, config })
    }

    /// Fetch `url` as text, retrying up to `max_attempts` times.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.with_retries(url, self.config.max_attempts, move || self.fetch_text_once(url))
            .await
    }

    /// Read up to `max_bytes` from `url`, timing the transfer.
    pub async fn sample_bytes(&self, url: &str, max_bytes: u64) -> Result<ThroughputSample, FetchError> {
        self.with_retries(url, SAMPLE_ATTEMPTS, move || self.sample_bytes_once(url, max_bytes))
            .await
    }

    async fn with_retries<T, F, Fut>(&self, url: &str, attempts: u32, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    tracing::warn!(url = %url, attempts, error = %e, "Fetch failed, giving up");
                    return Err(FetchError::Exhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = linear_backoff(attempt, self.config.backoff_step());
                    tracing::debug!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Fetch attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send(&self, url: &str) -> Result<(reqwest::Response, u16, String), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request { url: url.to_string(), source })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                content_type,
            });
        }
        Ok((response, status.as_u16(), content_type))
    }

    async fn fetch_text_once(&self, url: &str) -> Result<String, FetchError> {
        let (response, status, content_type) = self.send(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request { url: url.to_string(), source })?;
        decode_text(&body, status, &content_type)
    }

    async fn sample_bytes_once(&self, url: &str, max_bytes: u64) -> Result<ThroughputSample, FetchError> {
        let start = Instant::now();
        let (mut response, _, _) = self.send(url).await?;

        let mut bytes = 0u64;
        while bytes < max_bytes {
            let chunk = response
                .chunk()
                .await
                .map_err(|source| FetchError::Request { url: url.to_string(), source })?;
            match chunk {
                Some(chunk) => bytes += chunk.len() as u64,
                None => break,
            }
        }

        Ok(ThroughputSample {
            bytes,
            elapsed: start.elapsed(),
        })
    }
}

/// Decode a response body as UTF-8, dropping a leading byte-order mark.
pub fn decode_text(body: &[u8], status: u16, content_type: &str) -> Result<String, FetchError> {
    let body = body.strip_prefix(b"\xef\xbb\xbf").unwrap_or(body);
    String::from_utf8(body.to_vec()).map_err(|e| FetchError::Decode {
        reason: e.utf8_error().to_string(),
        status,
        content_type: content_type.to_string(),
        sample: body.iter().take(DIAGNOSTIC_SAMPLE_LEN).copied().collect(),
    })
}
