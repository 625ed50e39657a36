//! Application construction.
//!
//! Serializable settings come from [`AppConfig`]; the builder adds the parts
//! that cannot live in a config file: hook closures, the router, the
//! terminator and the readiness notifier.

use arc_swap::ArcSwap;
use axum::Router;
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::config::AppConfig;
use crate::events::{Dispatcher, Event, EventCategory, SubscriberOutcome};
use crate::health::HealthCheckConfig;
use crate::lifecycle::controller::{Application, Inner, ListenerSet};
use crate::lifecycle::shutdown::{ProcessExit, ShutdownReason, Terminate};
use crate::lifecycle::state::{RunningState, StateCell};
use crate::lifecycle::supervisor::{NotifySocket, ReadinessNotifier};
use crate::observability::logging;

type Registration = Box<dyn FnOnce(&Application) + Send>;

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    config: AppConfig,
    routes: Router,
    terminator: Arc<dyn Terminate>,
    readiness: Option<Arc<dyn ReadinessNotifier>>,
    health_check: Option<HealthCheckConfig>,
    registrations: Vec<Registration>,
}

impl ApplicationBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            routes: Router::new(),
            terminator: Arc::new(ProcessExit),
            readiness: None,
            health_check: None,
            registrations: Vec::new(),
        }
    }

    /// Downstream router served behind the lifecycle gate.
    pub fn routes(mut self, router: Router) -> Self {
        self.routes = router;
        self
    }

    /// Replace process termination (tests record exit codes instead).
    pub fn terminator(mut self, terminator: impl Terminate) -> Self {
        self.terminator = Arc::new(terminator);
        self
    }

    /// Readiness transport. Implies `send_ready`.
    pub fn readiness_notifier(mut self, notifier: impl ReadinessNotifier) -> Self {
        self.config.send_ready = true;
        self.readiness = Some(Arc::new(notifier));
        self
    }

    /// Start from this health-check config instead of the configured sets.
    pub fn health_check(mut self, config: HealthCheckConfig) -> Self {
        self.health_check = Some(config);
        self
    }

    pub fn on_startup<F, Fut, O>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<Event<()>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.registrations.push(Box::new(move |app| app.on_startup(callback)));
        self
    }

    pub fn on_shutdown<F, Fut, O>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<Event<ShutdownReason>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.registrations.push(Box::new(move |app| app.on_shutdown(callback)));
        self
    }

    pub fn on_listening<F, Fut, O>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<Event<Vec<String>>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.registrations.push(Box::new(move |app| app.on_listening(callback)));
        self
    }

    pub fn build(self) -> Application {
        let config = self.config;
        let modes = &config.dispatch;

        let readiness = match (config.send_ready, self.readiness) {
            (true, Some(notifier)) => Some(notifier),
            (true, None) => match NotifySocket::from_env() {
                Some(socket) => Some(Arc::new(socket) as Arc<dyn ReadinessNotifier>),
                None => {
                    tracing::debug!("send_ready enabled but NOTIFY_SOCKET is not set");
                    None
                }
            },
            (false, _) => None,
        };

        let health_check = self
            .health_check
            .unwrap_or_else(|| HealthCheckConfig::from(&config.health_check));

        let (state_tx, _) = watch::channel(RunningState::Initialising);

        let app = Application {
            inner: Arc::new(Inner {
                banner: config.banner.clone(),
                state: StateCell::new(RunningState::Initialising),
                state_tx,
                started_at: Instant::now(),
                shutdown_timeout: Duration::from_millis(config.shutdown_timeout_ms),
                listener_shutdown_timeout: Duration::from_millis(config.listener_shutdown_timeout_ms),

                on_startup: Dispatcher::with_mode(EventCategory::Startup, modes.mode_for(EventCategory::Startup)),
                on_shutdown: Dispatcher::with_mode(EventCategory::Shutdown, modes.mode_for(EventCategory::Shutdown)),
                on_listening: Dispatcher::with_mode(
                    EventCategory::Listening,
                    modes.mode_for(EventCategory::Listening),
                ),
                on_log: Dispatcher::with_mode(EventCategory::Log, modes.mode_for(EventCategory::Log)),
                on_info: Dispatcher::with_mode(EventCategory::Info, modes.mode_for(EventCategory::Info)),
                on_warn: Dispatcher::with_mode(EventCategory::Warn, modes.mode_for(EventCategory::Warn)),
                on_error: Dispatcher::with_mode(EventCategory::Error, modes.mode_for(EventCategory::Error)),
                on_request: Dispatcher::with_mode(EventCategory::Request, modes.mode_for(EventCategory::Request)),

                listeners: RwLock::new(ListenerSet::default()),
                health_check: ArcSwap::from_pointee(health_check),
                routes: RwLock::new(self.routes),

                terminator: self.terminator,
                readiness,
                ready_sent: AtomicBool::new(false),
            }),
        };

        if config.use_console {
            logging::attach_console(&app);
        }

        for register in self.registrations {
            register(&app);
        }

        for listener in &config.listeners {
            // Cannot fail: nothing has been started yet.
            if let Err(e) = app.add_listener(listener.clone()) {
                tracing::error!(error = %e, "Failed to register configured listener");
            }
        }

        app.state_changed(RunningState::Initialising);
        app
    }
}

impl std::fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("config", &self.config)
            .field("registrations", &self.registrations.len())
            .finish_non_exhaustive()
    }
}
