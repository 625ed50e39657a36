//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Forward the application's message events to the log (console sink)
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (`RUST_LOG` wins)

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::events::Event;
use crate::lifecycle::Application;

/// Install the global subscriber. Fails if one is already set.
pub fn init(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}

/// Subscribe the console sink to the log, info, warn and error events.
///
/// Log and info both land at INFO.
pub fn attach_console(app: &Application) {
    app.on_log(|event: Arc<Event<String>>| async move {
        tracing::info!(target: "console", "{}", event.payload);
    });
    app.on_info(|event: Arc<Event<String>>| async move {
        tracing::info!(target: "console", "{}", event.payload);
    });
    app.on_warn(|event: Arc<Event<String>>| async move {
        tracing::warn!(target: "console", "{}", event.payload);
    });
    app.on_error(|event: Arc<Event<String>>| async move {
        tracing::error!(target: "console", "{}", event.payload);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn init_twice_fails_quietly() {
        let config = ObservabilityConfig::default();
        let _ = init(&config);
        assert!(init(&config).is_err());
    }

    #[tokio::test]
    async fn console_sink_is_opt_out() {
        let quiet = Application::new(AppConfig {
            use_console: false,
            ..AppConfig::default()
        });
        assert!(quiet.inner.on_info.is_empty());

        let loud = Application::new(AppConfig::default());
        assert_eq!(loud.inner.on_info.len(), 1);
        assert!(loud.emit(crate::events::EventCategory::Warn, "hello").await);
    }
}
