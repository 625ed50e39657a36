//! The lifecycle controller.
//!
//! [`Application`] owns the running state, one dispatcher per event
//! category, the listener collection and the live health-check
//! configuration. It is a cheap `Arc` handle: clones share everything.

use arc_swap::ArcSwap;
use axum::Router;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::config::{AppConfig, ListenerConfig};
use crate::error::LifecycleError;
use crate::events::{Dispatcher, Event, EventCategory, RequestInfo, SubscriberOutcome};
use crate::health::{HealthCheckConfig, HealthProbe, HealthReport};
use crate::lifecycle::builder::ApplicationBuilder;
use crate::lifecycle::shutdown::{ShutdownReason, Terminate};
use crate::lifecycle::state::{RunningState, StateCell};
use crate::lifecycle::supervisor::ReadinessNotifier;
use crate::net::{HttpListener, Listener, ListenerHandle, ListenerState};
use crate::observability::metrics;

/// Banner used in log lines when none is configured.
pub const DEFAULT_BANNER: &str = "service-lifecycle";

/// Handle to the service lifecycle.
#[derive(Clone)]
pub struct Application {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) banner: Option<String>,
    pub(crate) state: StateCell,
    pub(crate) state_tx: watch::Sender<RunningState>,
    pub(crate) started_at: Instant,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) listener_shutdown_timeout: Duration,

    pub(crate) on_startup: Dispatcher<()>,
    pub(crate) on_shutdown: Dispatcher<ShutdownReason>,
    pub(crate) on_listening: Dispatcher<Vec<String>>,
    pub(crate) on_log: Dispatcher<String>,
    pub(crate) on_info: Dispatcher<String>,
    pub(crate) on_warn: Dispatcher<String>,
    pub(crate) on_error: Dispatcher<String>,
    pub(crate) on_request: Dispatcher<RequestInfo>,

    pub(crate) listeners: RwLock<ListenerSet>,
    pub(crate) health_check: ArcSwap<HealthCheckConfig>,
    pub(crate) routes: RwLock<Router>,

    pub(crate) terminator: Arc<dyn Terminate>,
    pub(crate) readiness: Option<Arc<dyn ReadinessNotifier>>,
    pub(crate) ready_sent: AtomicBool,
}

/// Listener collection; append-only until `start()` seals it.
#[derive(Default)]
pub(crate) struct ListenerSet {
    pub(crate) sealed: bool,
    pub(crate) handles: Vec<ListenerHandle>,
}

impl Application {
    /// Build an application from configuration with default collaborators.
    pub fn new(config: AppConfig) -> Self {
        ApplicationBuilder::new(config).build()
    }

    pub fn builder(config: AppConfig) -> ApplicationBuilder {
        ApplicationBuilder::new(config)
    }

    /// Configured banner, if any.
    pub fn banner(&self) -> Option<&str> {
        self.inner.banner.as_deref()
    }

    /// Banner for log lines.
    pub fn display_name(&self) -> &str {
        self.banner().unwrap_or(DEFAULT_BANNER)
    }

    pub fn running_state(&self) -> RunningState {
        self.inner.state.load()
    }

    /// True iff the state is `Ready` or `Listening`.
    pub fn is_ready(&self) -> bool {
        self.running_state().is_ready()
    }

    /// Observe state changes as they happen.
    pub fn watch_state(&self) -> watch::Receiver<RunningState> {
        self.inner.state_tx.subscribe()
    }

    /// Time since this application was constructed.
    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.inner.shutdown_timeout
    }

    // --- Subscribers ---

    pub fn on_startup<F, Fut, O>(&self, callback: F)
    where
        F: Fn(Arc<Event<()>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.inner.on_startup.subscribe(callback);
    }

    pub fn on_shutdown<F, Fut, O>(&self, callback: F)
    where
        F: Fn(Arc<Event<ShutdownReason>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.inner.on_shutdown.subscribe(callback);
    }

    /// Subscribers receive the resolved listening addresses.
    pub fn on_listening<F, Fut, O>(&self, callback: F)
    where
        F: Fn(Arc<Event<Vec<String>>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.inner.on_listening.subscribe(callback);
    }

    pub fn on_log<F, Fut, O>(&self, callback: F)
    where
        F: Fn(Arc<Event<String>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.inner.on_log.subscribe(callback);
    }

    pub fn on_info<F, Fut, O>(&self, callback: F)
    where
        F: Fn(Arc<Event<String>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.inner.on_info.subscribe(callback);
    }

    pub fn on_warn<F, Fut, O>(&self, callback: F)
    where
        F: Fn(Arc<Event<String>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.inner.on_warn.subscribe(callback);
    }

    pub fn on_error<F, Fut, O>(&self, callback: F)
    where
        F: Fn(Arc<Event<String>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.inner.on_error.subscribe(callback);
    }

    pub fn on_request<F, Fut, O>(&self, callback: F)
    where
        F: Fn(Arc<Event<RequestInfo>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        self.inner.on_request.subscribe(callback);
    }

    // --- Fire-and-forget reporting ---

    pub fn log(&self, message: impl Into<String>) {
        self.spawn_emit(EventCategory::Log, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.spawn_emit(EventCategory::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.spawn_emit(EventCategory::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.spawn_emit(EventCategory::Error, message.into());
    }

    /// Dispatch a message event and wait for its subscribers.
    pub(crate) async fn emit(&self, category: EventCategory, message: impl Into<String>) -> bool {
        let dispatcher = match category {
            EventCategory::Log => &self.inner.on_log,
            EventCategory::Info => &self.inner.on_info,
            EventCategory::Warn => &self.inner.on_warn,
            EventCategory::Error => &self.inner.on_error,
            other => {
                tracing::warn!(category = %other, "Not a message category, dropping event");
                return false;
            }
        };
        dispatcher.dispatch(self.clone(), message.into()).await
    }

    fn spawn_emit(&self, category: EventCategory, message: String) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let app = self.clone();
                handle.spawn(async move {
                    if !app.emit(category, message).await {
                        tracing::debug!(category = %category, "Message subscribers reported failure");
                    }
                });
            }
            Err(_) => {
                tracing::debug!(category = %category, message = %message, "No runtime, event not dispatched");
            }
        }
    }

    /// Dispatch a request event without waiting for subscribers.
    pub(crate) fn spawn_request_event(&self, info: RequestInfo) {
        if self.inner.on_request.is_empty() {
            return;
        }
        let app = self.clone();
        tokio::spawn(async move {
            app.inner.on_request.dispatch(app.clone(), info).await;
        });
    }

    // --- State ---

    /// Move `from → to`, publishing the change. Fails with the observed state.
    pub(crate) fn transition(&self, from: RunningState, to: RunningState) -> Result<(), RunningState> {
        self.inner.state.transition(from, to)?;
        self.state_changed(to);
        Ok(())
    }

    pub(crate) fn state_changed(&self, state: RunningState) {
        self.inner.state_tx.send_replace(state);
        metrics::record_state(state);
        tracing::info!(banner = %self.display_name(), state = %state, "Running state changed");

        let message = format!("{} is {}", self.display_name(), state);
        match state {
            RunningState::ShuttingDown => self.warn(message),
            _ => self.log(message),
        }
    }

    // --- Listeners ---

    /// Register an HTTP listener. Port falls back to `$PORT` then 8080, host to `0.0.0.0`.
    pub fn add_listener(&self, config: ListenerConfig) -> Result<ListenerHandle, LifecycleError> {
        self.add_listener_with(HttpListener::new(&config))
    }

    /// Register any listener implementation.
    pub fn add_listener_with<L: Listener>(&self, listener: L) -> Result<ListenerHandle, LifecycleError> {
        let mut set = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let state = self.running_state();
        if set.sealed || state != RunningState::Initialising {
            return Err(LifecycleError::ListenersSealed(state));
        }

        let handle = ListenerHandle::new(Box::new(listener), self.inner.listener_shutdown_timeout);
        tracing::debug!(kind = handle.kind(), address = %handle.address(), "Listener registered");
        set.handles.push(handle.clone());
        Ok(handle)
    }

    /// Every registered listener, in registration order.
    pub fn listeners(&self) -> Vec<ListenerHandle> {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .handles
            .clone()
    }

    /// Listeners currently in the `Listening` state.
    pub fn active_listeners(&self) -> Vec<ListenerHandle> {
        self.listeners()
            .into_iter()
            .filter(|l| l.state() == ListenerState::Listening)
            .collect()
    }

    pub(crate) fn seal_listeners(&self) -> Vec<ListenerHandle> {
        let mut set = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        set.sealed = true;
        set.handles.clone()
    }

    // --- Routing and health ---

    /// Replace the downstream router served behind the lifecycle gate.
    /// Takes effect for listeners started afterwards.
    pub fn set_routes(&self, router: Router) {
        *self
            .inner
            .routes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = router;
    }

    pub fn routes(&self) -> Router {
        self.inner
            .routes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Current health-check configuration.
    pub fn health_check(&self) -> Arc<HealthCheckConfig> {
        self.inner.health_check.load_full()
    }

    pub fn set_health_check(&self, config: HealthCheckConfig) {
        self.inner.health_check.store(Arc::new(config));
    }

    /// Modify the health-check configuration in place.
    pub fn update_health_check<F>(&self, update: F)
    where
        F: Fn(&mut HealthCheckConfig),
    {
        self.inner.health_check.rcu(|current| {
            let mut next = HealthCheckConfig::clone(current);
            update(&mut next);
            next
        });
    }

    /// Evaluate health: state must be `Listening` and every predicate must pass.
    pub async fn health_report(&self, probe: &HealthProbe) -> HealthReport {
        let state = self.running_state();
        let healthy = state == RunningState::Listening && self.health_check().run_checks(probe).await;
        HealthReport {
            healthy,
            state,
            uptime: self.uptime().as_secs_f64(),
        }
    }

    // --- Supervisor ---

    /// Send the readiness signal, at most once per application.
    pub(crate) fn notify_ready_once(&self) {
        let Some(notifier) = self.inner.readiness.as_ref() else {
            return;
        };
        if self.inner.ready_sent.swap(true, Ordering::SeqCst) {
            return;
        }
        match notifier.notify_ready() {
            Ok(()) => tracing::info!("Readiness sent to supervisor"),
            Err(e) => self.warn(format!("Unable to notify supervisor of readiness: {}", e)),
        }
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("banner", &self.display_name())
            .field("state", &self.running_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_application_is_initialising() {
        let app = Application::new(AppConfig::default());
        assert_eq!(app.running_state(), RunningState::Initialising);
        assert!(!app.is_ready());
        assert_eq!(app.display_name(), DEFAULT_BANNER);
    }

    #[tokio::test]
    async fn listeners_are_registered_in_order() {
        let app = Application::new(AppConfig::default());
        app.add_listener(ListenerConfig::port(8081).with_host("127.0.0.1")).unwrap();
        app.add_listener(ListenerConfig::port(80).with_domain("example.com")).unwrap();

        let addresses: Vec<String> = app.listeners().iter().map(|l| l.address()).collect();
        assert_eq!(addresses, vec!["http://127.0.0.1:8081/", "http://example.com/"]);
        assert!(app.active_listeners().is_empty());
    }

    #[tokio::test]
    async fn health_config_updates_are_visible() {
        let app = Application::new(AppConfig::default());
        app.update_health_check(|config| {
            config.match_paths.insert("/healthz".to_string());
        });
        assert!(app.health_check().matches(None, "/healthz"));
        assert!(app.health_check().matches(Some("GoogleHC/1.0"), "/"));
    }

    #[tokio::test]
    async fn state_changes_are_observable() {
        let app = Application::new(AppConfig::default());
        let rx = app.watch_state();
        app.transition(RunningState::Initialising, RunningState::Starting).unwrap();
        assert_eq!(*rx.borrow(), RunningState::Starting);
    }
}
