//! Alert decision rules.
//!
//! A two-state machine per monitor, layered on the consecutive-failure
//! counter: below threshold, or alerted. Crossing the threshold fires DOWN
//! exactly once per incident; the first UP after an alerted incident fires
//! RECOVERY. Everything else is silent.

use crate::model::{AlertKind, CheckStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDecision {
    pub kind: AlertKind,
    pub message: String,
}

/// Decide whether the latest probe outcome warrants an alert.
///
/// `prev_failures` and `prev_status` are the monitor's values from *before*
/// this probe ran. Pure and stateless: the caller persists whatever comes
/// back.
pub fn decide_alert(
    threshold: u32,
    prev_failures: u32,
    prev_status: Option<CheckStatus>,
    current: CheckStatus,
) -> Option<AlertDecision> {
    match current {
        CheckStatus::Down => {
            // Fire only on the exact probe that crosses the threshold, so a
            // sustained outage produces one alert, not one per check.
            if prev_failures + 1 == threshold {
                Some(AlertDecision {
                    kind: AlertKind::Down,
                    message: format!(
                        "Service unreachable for {} consecutive checks",
                        threshold
                    ),
                })
            } else {
                None
            }
        }
        CheckStatus::Up => {
            // Recover only from incidents that actually alerted. A blip that
            // never reached the threshold stays silent both ways.
            if prev_status == Some(CheckStatus::Down) && prev_failures >= threshold {
                Some(AlertDecision {
                    kind: AlertKind::Recovery,
                    message: "Service recovered".to_string(),
                })
            } else {
                None
            }
        }
    }
}
