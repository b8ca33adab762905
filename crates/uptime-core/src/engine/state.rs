use serde::{Deserialize, Serialize};

/// Lifecycle of a monitoring engine instance.
///
/// The tick loop keeps running while Active; `stop()` moves to Stopping and
/// the loop parks itself in Stopped on its next pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Active,
    Stopping,
    Stopped,
}

impl EngineState {
    pub fn can_transition_to(self, target: EngineState) -> bool {
        matches!(
            (self, target),
            (EngineState::Idle, EngineState::Active)
                | (EngineState::Active, EngineState::Stopping)
                | (EngineState::Stopping, EngineState::Stopped)
                | (EngineState::Stopped, EngineState::Active)
        )
    }

    pub fn is_running(self) -> bool {
        self == EngineState::Active
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Active => write!(f, "active"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
