mod http;

pub use http::HttpProber;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{CheckStatus, HttpMethod, Monitor};

/// Everything the executor needs to run one probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRequest {
    pub url: String,
    pub method: HttpMethod,
    pub timeout_ms: u64,
    pub expected_status: u16,
}

impl From<&Monitor> for ProbeRequest {
    fn from(m: &Monitor) -> Self {
        Self {
            url: m.url.clone(),
            method: m.method,
            timeout_ms: m.timeout_ms,
            expected_status: m.expected_status,
        }
    }
}

/// The classified result of one probe. Always a value, never an error: the
/// executor folds timeouts, transport failures and status mismatches into
/// DOWN outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub status: CheckStatus,
    pub status_code: Option<u16>,
    /// End-to-end elapsed time including connection setup.
    pub response_time_ms: u64,
    /// Present exactly when `status` is DOWN.
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn up(status_code: u16, response_time_ms: u64) -> Self {
        Self {
            status: CheckStatus::Up,
            status_code: Some(status_code),
            response_time_ms,
            error: None,
        }
    }

    pub fn down(
        status_code: Option<u16>,
        response_time_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: CheckStatus::Down,
            status_code,
            response_time_ms,
            error: Some(error.into()),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == CheckStatus::Up
    }
}

/// Trait for executing a single bounded-time HTTP probe.
///
/// Object-safe and Send + Sync so the engine can share one prober across
/// concurrently running probe jobs. Implementations must not panic and must
/// not return errors; every failure mode is a DOWN [`ProbeOutcome`].
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, request: &ProbeRequest) -> ProbeOutcome;
}
