use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::{Alert, CheckRun, CheckStatus, Monitor, ProbePatch};

use super::{MonitorStore, Page, StoreError, UptimeSummary};

/// In-memory store backing the API and tests.
///
/// Monitors live in a map keyed by id; check runs and alerts are plain
/// append-only vectors, which matches their write pattern. All listings sort
/// on read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    monitors: RwLock<HashMap<Uuid, Monitor>>,
    check_runs: RwLock<Vec<CheckRun>>,
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn monitor_count(&self) -> usize {
        self.monitors.read().await.len()
    }

    pub async fn check_run_count(&self) -> usize {
        self.check_runs.read().await.len()
    }

    pub async fn alert_count(&self) -> usize {
        self.alerts.read().await.len()
    }

    pub async fn all_monitors(&self) -> Vec<Monitor> {
        self.monitors.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl MonitorStore for MemoryStore {
    async fn due_monitors(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Monitor>, StoreError> {
        let monitors = self.monitors.read().await;
        let mut due: Vec<Monitor> = monitors
            .values()
            .filter(|m| m.is_due(now))
            .cloned()
            .collect();
        // Never-checked monitors sort ahead of everything with a timestamp.
        due.sort_by_key(|m| m.next_check_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn append_check_run(&self, run: CheckRun) -> Result<(), StoreError> {
        self.check_runs.write().await.push(run);
        Ok(())
    }

    async fn append_alert(&self, alert: Alert) -> Result<(), StoreError> {
        self.alerts.write().await.push(alert);
        Ok(())
    }

    async fn apply_probe_result(&self, id: Uuid, patch: ProbePatch) -> Result<(), StoreError> {
        let mut monitors = self.monitors.write().await;
        let monitor = monitors.get_mut(&id).ok_or(StoreError::MonitorNotFound(id))?;
        monitor.last_checked_at = Some(patch.last_checked_at);
        monitor.next_check_at = Some(patch.next_check_at);
        monitor.last_status = Some(patch.last_status);
        monitor.last_status_code = patch.last_status_code;
        monitor.last_response_time_ms = Some(patch.last_response_time_ms);
        monitor.consecutive_failures = patch.consecutive_failures;
        Ok(())
    }

    async fn insert_monitor(&self, monitor: Monitor) -> Result<(), StoreError> {
        self.monitors.write().await.insert(monitor.id, monitor);
        Ok(())
    }

    async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>, StoreError> {
        Ok(self.monitors.read().await.get(&id).cloned())
    }

    async fn list_monitors(&self, user_id: Uuid) -> Result<Vec<Monitor>, StoreError> {
        let monitors = self.monitors.read().await;
        let mut owned: Vec<Monitor> = monitors
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update_monitor(&self, update: Monitor) -> Result<Monitor, StoreError> {
        let mut monitors = self.monitors.write().await;
        let stored = monitors
            .get_mut(&update.id)
            .ok_or(StoreError::MonitorNotFound(update.id))?;
        stored.name = update.name;
        stored.url = update.url;
        stored.method = update.method;
        stored.interval_secs = update.interval_secs;
        stored.timeout_ms = update.timeout_ms;
        stored.expected_status = update.expected_status;
        stored.enabled = update.enabled;
        Ok(stored.clone())
    }

    async fn delete_monitor(&self, id: Uuid) -> Result<(), StoreError> {
        let removed = self.monitors.write().await.remove(&id);
        if removed.is_none() {
            return Err(StoreError::MonitorNotFound(id));
        }
        self.check_runs.write().await.retain(|r| r.monitor_id != id);
        self.alerts.write().await.retain(|a| a.monitor_id != id);
        Ok(())
    }

    async fn list_check_runs(
        &self,
        monitor_id: Uuid,
        page: usize,
        limit: usize,
    ) -> Result<Page<CheckRun>, StoreError> {
        let runs = self.check_runs.read().await;
        let mut matching: Vec<CheckRun> = runs
            .iter()
            .filter(|r| r.monitor_id == monitor_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(Page::slice(matching, page, limit))
    }

    async fn summary(
        &self,
        monitor_id: Uuid,
        window_hours: u32,
    ) -> Result<UptimeSummary, StoreError> {
        let since = Utc::now() - Duration::hours(i64::from(window_hours));
        let runs = self.check_runs.read().await;

        let last = runs
            .iter()
            .filter(|r| r.monitor_id == monitor_id)
            .max_by_key(|r| r.timestamp);

        let windowed: Vec<&CheckRun> = runs
            .iter()
            .filter(|r| r.monitor_id == monitor_id && r.timestamp >= since)
            .collect();

        let total = windowed.len();
        let up = windowed
            .iter()
            .filter(|r| r.status == CheckStatus::Up)
            .count();
        let down = total - up;

        let uptime_pct = if total == 0 {
            None
        } else {
            Some((up as f64 / total as f64 * 10_000.0).round() / 100.0)
        };

        let avg_response_time_ms = if total == 0 {
            None
        } else {
            let sum: u64 = windowed.iter().map(|r| r.response_time_ms).sum();
            Some((sum as f64 / total as f64).round() as u64)
        };

        let p95_response_time_ms = if total == 0 {
            None
        } else {
            let mut times: Vec<u64> = windowed.iter().map(|r| r.response_time_ms).collect();
            times.sort_unstable();
            let idx = ((0.95 * times.len() as f64).ceil() as usize).saturating_sub(1);
            Some(times[idx.min(times.len() - 1)])
        };

        Ok(UptimeSummary {
            window_hours,
            since,
            total_checks: total,
            up,
            down,
            uptime_pct,
            avg_response_time_ms,
            p95_response_time_ms,
            last_status: last.map(|r| r.status),
            last_status_code: last.and_then(|r| r.status_code),
            last_response_time_ms: last.map(|r| r.response_time_ms),
            last_checked_at: last.map(|r| r.timestamp),
        })
    }

    async fn list_alerts(
        &self,
        user_id: Uuid,
        monitor_id: Option<Uuid>,
        page: usize,
        limit: usize,
    ) -> Result<Page<Alert>, StoreError> {
        let alerts = self.alerts.read().await;
        let mut matching: Vec<Alert> = alerts
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter(|a| monitor_id.is_none_or(|id| a.monitor_id == id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(Page::slice(matching, page, limit))
    }

    async fn mark_alert_read(&self, user_id: Uuid, alert_id: Uuid) -> Result<Alert, StoreError> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == alert_id && a.user_id == user_id && a.read_at.is_none())
            .ok_or(StoreError::AlertNotFound(alert_id))?;
        alert.read_at = Some(Utc::now());
        Ok(alert.clone())
    }

    async fn mark_all_alerts_read(&self, user_id: Uuid) -> Result<usize, StoreError> {
        let read_at = Utc::now();
        let mut alerts = self.alerts.write().await;
        let mut updated = 0;
        for alert in alerts
            .iter_mut()
            .filter(|a| a.user_id == user_id && a.read_at.is_none())
        {
            alert.read_at = Some(read_at);
            updated += 1;
        }
        Ok(updated)
    }

    async fn unread_alert_count(&self, user_id: Uuid) -> Result<usize, StoreError> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .filter(|a| a.user_id == user_id && a.read_at.is_none())
            .count())
    }
}
