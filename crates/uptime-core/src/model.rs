use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bounds for user-configurable monitor fields.
pub const INTERVAL_SECS_MIN: u32 = 10;
pub const INTERVAL_SECS_MAX: u32 = 3600;
pub const TIMEOUT_MS_MIN: u64 = 100;
pub const TIMEOUT_MS_MAX: u64 = 30_000;
pub const EXPECTED_STATUS_MIN: u16 = 100;
pub const EXPECTED_STATUS_MAX: u16 = 599;
pub const NAME_MAX_LEN: usize = 120;
pub const URL_MAX_LEN: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "HEAD")]
    Head,
}

impl Default for HttpMethod {
    fn default() -> Self {
        Self::Get
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Head => write!(f, "HEAD"),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

/// Outcome classification of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Up,
    Down,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertKind {
    Down,
    Recovery,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "DOWN"),
            Self::Recovery => write!(f, "RECOVERY"),
        }
    }
}

/// A user-configured HTTP target probed periodically by the engine.
///
/// The `last_*`, `next_check_at` and `consecutive_failures` fields are owned
/// by the engine and written only through [`ProbePatch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    /// Seconds between probes.
    pub interval_secs: u32,
    /// Per-probe hard timeout in milliseconds.
    pub timeout_ms: u64,
    pub expected_status: u16,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,

    pub last_checked_at: Option<DateTime<Utc>>,
    pub next_check_at: Option<DateTime<Utc>>,
    pub last_status: Option<CheckStatus>,
    pub last_status_code: Option<u16>,
    pub last_response_time_ms: Option<u64>,
    pub consecutive_failures: u32,
}

impl Monitor {
    pub fn new(user_id: Uuid, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            url: url.into(),
            method: HttpMethod::Get,
            interval_secs: 60,
            timeout_ms: 5000,
            expected_status: 200,
            enabled: true,
            created_at: Utc::now(),
            last_checked_at: None,
            next_check_at: None,
            last_status: None,
            last_status_code: None,
            last_response_time_ms: None,
            consecutive_failures: 0,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_interval_secs(mut self, secs: u32) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// A monitor is due when enabled and its next check time is unset or past.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_check_at.map_or(true, |t| t <= now)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() || self.name.len() > NAME_MAX_LEN {
            return Err(ValidationError::Name);
        }
        if self.url.len() > URL_MAX_LEN {
            return Err(ValidationError::Url(self.url.clone()));
        }
        let parsed =
            url::Url::parse(&self.url).map_err(|_| ValidationError::Url(self.url.clone()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::Url(self.url.clone()));
        }
        if !(INTERVAL_SECS_MIN..=INTERVAL_SECS_MAX).contains(&self.interval_secs) {
            return Err(ValidationError::Interval(self.interval_secs));
        }
        if !(TIMEOUT_MS_MIN..=TIMEOUT_MS_MAX).contains(&self.timeout_ms) {
            return Err(ValidationError::Timeout(self.timeout_ms));
        }
        if !(EXPECTED_STATUS_MIN..=EXPECTED_STATUS_MAX).contains(&self.expected_status) {
            return Err(ValidationError::ExpectedStatus(self.expected_status));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must be 1-{} characters", NAME_MAX_LEN)]
    Name,
    #[error("url must be a valid http(s) URL: {0}")]
    Url(String),
    #[error("interval must be {INTERVAL_SECS_MIN}-{INTERVAL_SECS_MAX} seconds, got {0}")]
    Interval(u32),
    #[error("timeout must be {TIMEOUT_MS_MIN}-{TIMEOUT_MS_MAX} ms, got {0}")]
    Timeout(u64),
    #[error("expected status must be {EXPECTED_STATUS_MIN}-{EXPECTED_STATUS_MAX}, got {0}")]
    ExpectedStatus(u16),
}

/// Append-only record of one probe execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: Uuid,
    pub monitor_id: Uuid,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub status: CheckStatus,
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

/// Append-only DOWN/RECOVERY event derived from consecutive probe outcomes.
///
/// `read_at` is the one field mutated after creation, and only by the
/// alert-management API, never by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub monitor_id: Uuid,
    pub user_id: Uuid,
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(
        monitor_id: Uuid,
        user_id: Uuid,
        kind: AlertKind,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            monitor_id,
            user_id,
            kind,
            message: message.into(),
            timestamp,
            read_at: None,
        }
    }
}

/// Targeted update of a monitor's scheduling and summary fields, applied in a
/// single write keyed by monitor id after each probe completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbePatch {
    pub last_checked_at: DateTime<Utc>,
    pub next_check_at: DateTime<Utc>,
    pub last_status: CheckStatus,
    pub last_status_code: Option<u16>,
    pub last_response_time_ms: u64,
    pub consecutive_failures: u32,
}
