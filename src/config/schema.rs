//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a managed
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::events::{DispatchMode, EventCategory};

/// Default process-wide shutdown deadline.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

/// Default per-listener close deadline.
pub const DEFAULT_LISTENER_SHUTDOWN_TIMEOUT_MS: u64 = 30_000;

/// Port used when neither the listener config nor `$PORT` provides one.
pub const DEFAULT_PORT: u16 = 8080;

/// Host used when the listener config has none.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Root configuration for a managed service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Service banner, sent as the `Server` header and used in log lines.
    pub banner: Option<String>,

    /// Forward log/info/warn/error events to the tracing console output.
    pub use_console: bool,

    /// Process-wide shutdown deadline in milliseconds.
    pub shutdown_timeout_ms: u64,

    /// Deadline for closing an individual listener, in milliseconds.
    pub listener_shutdown_timeout_ms: u64,

    /// Notify a supervising parent once the service is listening.
    pub send_ready: bool,

    /// Per-category dispatch mode overrides.
    pub dispatch: DispatchModes,

    /// Health-check request matching.
    pub health_check: HealthCheckSettings,

    /// Listeners created at build time.
    pub listeners: Vec<ListenerConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            banner: None,
            use_console: true,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            listener_shutdown_timeout_ms: DEFAULT_LISTENER_SHUTDOWN_TIMEOUT_MS,
            send_ready: false,
            dispatch: DispatchModes::default(),
            health_check: HealthCheckSettings::default(),
            listeners: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Optional dispatch mode per event category. `None` keeps the category default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchModes {
    pub startup: Option<DispatchMode>,
    pub shutdown: Option<DispatchMode>,
    pub listening: Option<DispatchMode>,
    pub log: Option<DispatchMode>,
    pub info: Option<DispatchMode>,
    pub warn: Option<DispatchMode>,
    pub error: Option<DispatchMode>,
    pub request: Option<DispatchMode>,
}

impl DispatchModes {
    /// Effective mode for a category.
    pub fn mode_for(&self, category: EventCategory) -> DispatchMode {
        let configured = match category {
            EventCategory::Startup => self.startup,
            EventCategory::Shutdown => self.shutdown,
            EventCategory::Listening => self.listening,
            EventCategory::Log => self.log,
            EventCategory::Info => self.info,
            EventCategory::Warn => self.warn,
            EventCategory::Error => self.error,
            EventCategory::Request => self.request,
        };
        configured.unwrap_or_else(|| DispatchMode::default_for(category))
    }
}

/// A string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Normalize into the canonical set form.
    pub fn to_set(&self) -> BTreeSet<String> {
        match self {
            OneOrMany::One(value) => BTreeSet::from([value.clone()]),
            OneOrMany::Many(values) => values.iter().cloned().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// Health-check matching configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckSettings {
    /// User agents answered with the health response.
    pub user_agent: OneOrMany,

    /// Paths answered with the health response.
    pub endpoint: OneOrMany,
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        Self {
            user_agent: OneOrMany::Many(vec![
                "GoogleHC/1.0".to_string(),
                "Mozilla/5.0+(compatible; UptimeRobot/2.0; http://www.uptimerobot.com/)".to_string(),
            ]),
            endpoint: OneOrMany::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Port to bind. Falls back to `$PORT`, then 8080.
    pub port: Option<u16>,

    /// Host to bind. Falls back to `0.0.0.0`.
    pub host: Option<String>,

    /// Public domain used when describing the listening address.
    pub domain: Option<String>,
}

impl ListenerConfig {
    pub fn port(port: u16) -> Self {
        Self {
            port: Some(port),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Configured port, else `$PORT`, else 8080.
    pub fn resolved_port(&self) -> u16 {
        self.port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn resolved_host(&self) -> String {
        self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string())
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
