use super::{ProbeError, Prober};
use crate::config::ProbeSettings;
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

/// HTTP probe timing dispatch to response headers.
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(settings: &ProbeSettings) -> Result<Self> {
        let mut builder = Client::builder().user_agent(settings.user_agent.clone());
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> Result<u64, ProbeError> {
        let start = Instant::now();
        // Resolves once the status line and headers are in; the body is never read.
        let result = self.client.get(url).send().await;
        let latency_ms = round_millis(start.elapsed());

        let response = result.map_err(|e| ProbeError::Transport {
            cause: e.to_string(),
        })?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), latency_ms, "HTTP probe returned");
        if !status.is_success() {
            return Err(ProbeError::Http {
                status: status.as_u16(),
            });
        }
        Ok(latency_ms)
    }
}

fn round_millis(elapsed: Duration) -> u64 {
    ((elapsed.as_micros() + 500) / 1000) as u64
}
