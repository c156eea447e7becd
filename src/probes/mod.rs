use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub mod http;

pub use self::http::HttpProber;

/// Why a single probe failed. Local to that probe: never aborts a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeError {
    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("transport error: {cause}")]
    Transport { cause: String },
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Success { latency_ms: u64 },
    Failure { error: ProbeError },
}

impl ProbeOutcome {
    pub fn latency_ms(&self) -> Option<u64> {
        match self {
            ProbeOutcome::Success { latency_ms } => Some(*latency_ms),
            ProbeOutcome::Failure { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success { .. })
    }
}

impl From<Result<u64, ProbeError>> for ProbeOutcome {
    fn from(result: Result<u64, ProbeError>) -> Self {
        match result {
            Ok(latency_ms) => ProbeOutcome::Success { latency_ms },
            Err(error) => ProbeOutcome::Failure { error },
        }
    }
}

/// One recorded probe within a sequence. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub index: u32,
    pub outcome: ProbeOutcome,
    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    pub fn new(index: u32, outcome: ProbeOutcome) -> Self {
        Self {
            index,
            outcome,
            timestamp: Utc::now(),
        }
    }
}

/// A timed GET against a resolved URL.
///
/// Returns the latency in whole milliseconds. Implementations must not retry.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> Result<u64, ProbeError>;
}
