mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Alert, CheckRun, CheckStatus, Monitor, ProbePatch};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("monitor {0} not found")]
    MonitorNotFound(Uuid),
    #[error("alert {0} not found")]
    AlertNotFound(Uuid),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// One page of a timestamp-descending listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

impl<T> Page<T> {
    pub fn slice(all: Vec<T>, page: usize, limit: usize) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total = all.len();
        let pages = total.div_ceil(limit);
        let items = all
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();
        Self {
            items,
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Uptime statistics for one monitor over a trailing window.
#[derive(Debug, Clone, Serialize)]
pub struct UptimeSummary {
    pub window_hours: u32,
    pub since: DateTime<Utc>,
    pub total_checks: usize,
    pub up: usize,
    pub down: usize,
    /// Percentage rounded to two decimals; None when no checks in the window.
    pub uptime_pct: Option<f64>,
    pub avg_response_time_ms: Option<u64>,
    pub p95_response_time_ms: Option<u64>,
    pub last_status: Option<CheckStatus>,
    pub last_status_code: Option<u16>,
    pub last_response_time_ms: Option<u64>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Storage contract between the engine, the API, and the record store.
///
/// The engine touches only four operations: the due scan and the three
/// writes at the end of a probe job. Everything else serves the API.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    // Engine-facing.

    /// Monitors that are enabled and due at `now`, ordered by
    /// `next_check_at` ascending (never-checked monitors first), capped at
    /// `limit`.
    async fn due_monitors(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Monitor>, StoreError>;

    async fn append_check_run(&self, run: CheckRun) -> Result<(), StoreError>;

    async fn append_alert(&self, alert: Alert) -> Result<(), StoreError>;

    /// Apply a probe result to the monitor's scheduling fields in a single
    /// keyed write. A missing monitor (deleted mid-probe) is an error the
    /// caller logs and drops.
    async fn apply_probe_result(&self, id: Uuid, patch: ProbePatch) -> Result<(), StoreError>;

    // API-facing.

    async fn insert_monitor(&self, monitor: Monitor) -> Result<(), StoreError>;

    async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>, StoreError>;

    /// All monitors owned by `user_id`, newest first.
    async fn list_monitors(&self, user_id: Uuid) -> Result<Vec<Monitor>, StoreError>;

    /// Replace a monitor's user-configurable fields; engine-owned fields are
    /// preserved from the stored record.
    async fn update_monitor(&self, monitor: Monitor) -> Result<Monitor, StoreError>;

    /// Delete a monitor and its check runs and alerts.
    async fn delete_monitor(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_check_runs(
        &self,
        monitor_id: Uuid,
        page: usize,
        limit: usize,
    ) -> Result<Page<CheckRun>, StoreError>;

    async fn summary(
        &self,
        monitor_id: Uuid,
        window_hours: u32,
    ) -> Result<UptimeSummary, StoreError>;

    async fn list_alerts(
        &self,
        user_id: Uuid,
        monitor_id: Option<Uuid>,
        page: usize,
        limit: usize,
    ) -> Result<Page<Alert>, StoreError>;

    /// Mark one unread alert as read. Errors if the alert does not exist,
    /// belongs to another user, or was already read.
    async fn mark_alert_read(&self, user_id: Uuid, alert_id: Uuid) -> Result<Alert, StoreError>;

    /// Mark every unread alert for `user_id` as read; returns how many.
    async fn mark_all_alerts_read(&self, user_id: Uuid) -> Result<usize, StoreError>;

    async fn unread_alert_count(&self, user_id: Uuid) -> Result<usize, StoreError>;
}
