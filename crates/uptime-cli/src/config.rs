//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! log_format = "json"
//!
//! [engine]
//! tick_ms = 2000
//! max_concurrent_probes = 10
//! alert_threshold = 3
//!
//! [[monitor]]
//! name = "prod api"
//! url = "https://api.example.com/health"
//! interval_secs = 30
//!
//! [[monitor]]
//! name = "marketing site"
//! url = "https://example.com"
//! method = "HEAD"
//! expected_status = 204
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;
use uuid::Uuid;

use uptime_core::{EngineConfig, HttpMethod, Monitor};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub engine: EngineSection,

    /// Owner assigned to monitors seeded from this file. Defaults to the
    /// nil UUID so seeded monitors stay queryable across restarts.
    #[serde(default = "Uuid::nil")]
    pub seed_user_id: Uuid,

    #[serde(default)]
    pub monitor: Vec<MonitorDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_format: default_log_format(),
        }
    }
}

fn default_listen() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSection {
    pub tick_ms: Option<u64>,
    pub max_concurrent_probes: Option<usize>,
    pub alert_threshold: Option<u32>,
    pub due_scan_limit: Option<usize>,
}

impl EngineSection {
    pub fn to_engine_config(&self) -> EngineConfig {
        let mut c = EngineConfig::default();
        if let Some(v) = self.tick_ms {
            c = c.with_tick_interval(v);
        }
        if let Some(v) = self.max_concurrent_probes {
            c = c.with_max_concurrent_probes(v);
        }
        if let Some(v) = self.alert_threshold {
            c = c.with_alert_threshold(v);
        }
        if let Some(v) = self.due_scan_limit {
            c = c.with_due_scan_limit(v);
        }
        c
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorDef {
    pub name: String,
    pub url: String,
    pub method: Option<HttpMethod>,
    pub interval_secs: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub expected_status: Option<u16>,
    pub enabled: Option<bool>,
}

impl MonitorDef {
    pub fn to_monitor(&self, user_id: Uuid) -> Monitor {
        let mut m = Monitor::new(user_id, self.name.clone(), self.url.clone());
        if let Some(v) = self.method {
            m = m.with_method(v);
        }
        if let Some(v) = self.interval_secs {
            m = m.with_interval_secs(v);
        }
        if let Some(v) = self.timeout_ms {
            m = m.with_timeout_ms(v);
        }
        if let Some(v) = self.expected_status {
            m = m.with_expected_status(v);
        }
        if let Some(v) = self.enabled {
            m = m.with_enabled(v);
        }
        m
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        let mut urls = std::collections::HashSet::new();
        for def in &self.monitor {
            def.to_monitor(self.seed_user_id)
                .validate()
                .map_err(|e| format!("Invalid monitor '{}': {}", def.name, e))?;
            if !urls.insert(def.url.as_str()) {
                return Err(format!("Duplicate monitor URL: {}", def.url));
            }
        }

        match self.server.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid log_format '{}': must be 'pretty' or 'json'",
                    other
                ));
            }
        }

        Ok(())
    }
}
