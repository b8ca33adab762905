use std::fmt::Write;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use uptime_core::CheckStatus;

use crate::state::AppState;

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut out = String::with_capacity(4096);

    let monitors = state.store.all_monitors().await;

    writeln!(out, "# TYPE uptime_monitors gauge").unwrap();
    writeln!(out, "# HELP uptime_monitors Number of configured monitors").unwrap();
    writeln!(out, "uptime_monitors {}", monitors.len()).unwrap();

    writeln!(out, "# TYPE uptime_monitor_up gauge").unwrap();
    writeln!(
        out,
        "# HELP uptime_monitor_up Last observed status per monitor (1 up, 0 down)"
    )
    .unwrap();
    for m in &monitors {
        if let Some(status) = m.last_status {
            writeln!(
                out,
                "uptime_monitor_up{{monitor_id=\"{}\",url=\"{}\"}} {}",
                m.id,
                m.url,
                if status == CheckStatus::Up { 1 } else { 0 }
            )
            .unwrap();
        }
    }

    writeln!(out, "# TYPE uptime_monitor_consecutive_failures gauge").unwrap();
    writeln!(
        out,
        "# HELP uptime_monitor_consecutive_failures Consecutive failed checks per monitor"
    )
    .unwrap();
    for m in &monitors {
        writeln!(
            out,
            "uptime_monitor_consecutive_failures{{monitor_id=\"{}\"}} {}",
            m.id, m.consecutive_failures
        )
        .unwrap();
    }

    writeln!(
        out,
        "# TYPE uptime_monitor_last_check_timestamp_seconds gauge"
    )
    .unwrap();
    writeln!(
        out,
        "# HELP uptime_monitor_last_check_timestamp_seconds Unix timestamp of the last check"
    )
    .unwrap();
    for m in &monitors {
        if let Some(t) = m.last_checked_at {
            let secs = t.timestamp() as f64 + (t.timestamp_subsec_millis() as f64 / 1000.0);
            writeln!(
                out,
                "uptime_monitor_last_check_timestamp_seconds{{monitor_id=\"{}\"}} {:.3}",
                m.id, secs
            )
            .unwrap();
        }
    }

    writeln!(out, "# TYPE uptime_check_runs gauge").unwrap();
    writeln!(out, "# HELP uptime_check_runs Number of stored check runs").unwrap();
    writeln!(out, "uptime_check_runs {}", state.store.check_run_count().await).unwrap();

    writeln!(out, "# TYPE uptime_alerts gauge").unwrap();
    writeln!(out, "# HELP uptime_alerts Number of stored alerts").unwrap();
    writeln!(out, "uptime_alerts {}", state.store.alert_count().await).unwrap();

    if let Some(engine) = &state.engine {
        let s = engine.state().await.to_string();
        writeln!(out, "# TYPE uptime_engine_state stateset").unwrap();
        writeln!(out, "# HELP uptime_engine_state Current state of the engine").unwrap();
        for variant in &["idle", "active", "stopping", "stopped"] {
            writeln!(
                out,
                "uptime_engine_state{{engine_id=\"{}\",state=\"{}\"}} {}",
                engine.id(),
                variant,
                if s == *variant { 1 } else { 0 }
            )
            .unwrap();
        }
    }

    writeln!(out, "# EOF").unwrap();

    (
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        out,
    )
}
