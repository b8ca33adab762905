#![forbid(unsafe_code)]

pub mod alert;
pub mod config;
pub mod engine;
pub mod model;
pub mod probe;
pub mod store;

pub use alert::{decide_alert, AlertDecision};
pub use config::EngineConfig;
pub use engine::{Engine, EngineState, JobQueue};
pub use model::{
    Alert, AlertKind, CheckRun, CheckStatus, HttpMethod, Monitor, ProbePatch, ValidationError,
};
pub use probe::{HttpProber, ProbeOutcome, ProbeRequest, Prober};
pub use store::{MemoryStore, MonitorStore, Page, StoreError, UptimeSummary};
