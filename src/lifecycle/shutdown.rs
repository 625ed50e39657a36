//! Shutdown coordination.
//!
//! # Protocol
//! ```text
//! trigger (signal / message / handle)
//!     → already shutting down? ignore
//!     → state = ShuttingDown (gate starts closing connections)
//!     → arm process deadline
//!     → warn with reason
//!     → shutdown subscribers, sequential by default
//!     → exit 0 if all returned true, 1 otherwise
//! deadline expiry → fatal error, exit 2
//! ```

use std::fmt;
use std::time::Duration;

use crate::events::EventCategory;
use crate::lifecycle::controller::Application;
use crate::lifecycle::deadline::Deadline;
use crate::lifecycle::state::RunningState;
use crate::observability::metrics;

/// Process exit statuses used by the lifecycle.
pub mod exit_code {
    /// Every shutdown subscriber returned true.
    pub const SUCCESS: i32 = 0;
    /// At least one shutdown subscriber returned false or failed.
    pub const SHUTDOWN_FAILED: i32 = 1;
    /// Shutdown subscribers did not finish before the process deadline.
    pub const SHUTDOWN_TIMEOUT: i32 = 2;
    /// A listener could not be closed, or not within its own deadline.
    pub const LISTENER_CLOSE_FAILED: i32 = 3;
}

/// Forced process termination.
pub trait Terminate: Send + Sync + 'static {
    fn terminate(&self, code: i32);
}

/// Exits the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl Terminate for ProcessExit {
    fn terminate(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Why shutdown was triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A termination signal (`SIGTERM`, `SIGINT`).
    Signal(&'static str),
    /// A shutdown message from the supervisor channel.
    Message(String),
    /// An in-process request through [`ShutdownHandle`] or the API.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "Received {}", name),
            ShutdownReason::Message(message) => write!(f, "Received shutdown message '{}'", message),
            ShutdownReason::Requested => write!(f, "Shutdown requested"),
        }
    }
}

impl Application {
    /// Run the shutdown protocol. The first trigger wins; later ones return `None`.
    ///
    /// Returns the exit code handed to the terminator. With the default
    /// [`ProcessExit`] terminator this never returns on the first trigger.
    pub async fn initiate_shutdown(&self, reason: ShutdownReason) -> Option<i32> {
        let Some(previous) = self.inner.state.enter_shutdown() else {
            tracing::debug!(reason = %reason, "Shutdown already in progress, ignoring trigger");
            return None;
        };
        tracing::warn!(reason = %reason, from = %previous, "Shutdown initiated");

        let deadline = {
            let app = self.clone();
            let timeout = self.inner.shutdown_timeout;
            Deadline::arm(timeout, async move {
                app.fatal(
                    exit_code::SHUTDOWN_TIMEOUT,
                    format!("Shutdown timeout reached after {}ms", timeout.as_millis()),
                )
                .await;
            })
        };

        // The state swap in enter_shutdown happens before the reason is
        // announced, not after: warn subscribers already see ShuttingDown.
        self.state_changed(RunningState::ShuttingDown);
        self.emit(EventCategory::Warn, reason.to_string()).await;

        let ok = self.inner.on_shutdown.dispatch(self.clone(), reason).await;
        if !deadline.disarm() {
            // The deadline already terminated the process.
            return None;
        }

        let code = if ok {
            tracing::info!("Shutdown complete");
            exit_code::SUCCESS
        } else {
            self.emit(EventCategory::Error, "Shutdown callbacks did not all return true").await;
            exit_code::SHUTDOWN_FAILED
        };
        self.inner.terminator.terminate(code);
        Some(code)
    }

    /// Report a fatal condition and terminate.
    pub(crate) async fn fatal(&self, code: i32, message: String) {
        tracing::error!(code, message = %message, "Fatal lifecycle error, terminating");
        // Error subscribers get a chance to start, but cannot hold up termination.
        let report = self.emit(EventCategory::Error, message);
        let _ = tokio::time::timeout(Duration::from_millis(50), report).await;
        self.inner.terminator.terminate(code);
    }

    /// Close every listener in registration order.
    ///
    /// Meant to be called from a shutdown subscriber; each close runs under
    /// that listener's own deadline.
    pub async fn close_listeners(&self) {
        for listener in self.listeners() {
            listener.shutdown(self).await;
        }
        metrics::record_active_listeners(self.active_listeners().len());
    }

    /// Handle for requesting shutdown from elsewhere in the process.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle { app: self.clone() }
    }
}

/// Cloneable trigger for the shutdown protocol.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    app: Application,
}

impl ShutdownHandle {
    /// Start shutdown in the background.
    ///
    /// Outside a tokio runtime there is nothing to run shutdown on, so the
    /// request is logged and dropped.
    pub fn trigger(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let app = self.app.clone();
                handle.spawn(async move {
                    app.initiate_shutdown(ShutdownReason::Requested).await;
                });
            }
            Err(_) => {
                tracing::warn!("No runtime, shutdown trigger ignored");
            }
        }
    }

    /// Run shutdown and wait for it. See [`Application::initiate_shutdown`].
    pub async fn shutdown(&self) -> Option<i32> {
        self.app.initiate_shutdown(ShutdownReason::Requested).await
    }

    /// True once shutdown has been triggered.
    pub fn is_shutting_down(&self) -> bool {
        self.app.running_state() == RunningState::ShuttingDown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::config::AppConfig;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<i32>>>);

    impl Terminate for Recorder {
        fn terminate(&self, code: i32) {
            self.0.lock().unwrap().push(code);
        }
    }

    fn app_with(recorder: &Recorder, shutdown_timeout_ms: u64) -> Application {
        let config = AppConfig {
            shutdown_timeout_ms,
            ..AppConfig::default()
        };
        Application::builder(config).terminator(recorder.clone()).build()
    }

    #[tokio::test]
    async fn successful_shutdown_exits_zero() {
        let recorder = Recorder::default();
        let app = app_with(&recorder, 1_000);
        app.on_shutdown(|_| async { true });

        assert_eq!(app.initiate_shutdown(ShutdownReason::Requested).await, Some(0));
        assert_eq!(app.running_state(), RunningState::ShuttingDown);
        assert_eq!(*recorder.0.lock().unwrap(), vec![exit_code::SUCCESS]);
    }

    #[tokio::test]
    async fn failed_subscriber_exits_nonzero() {
        let recorder = Recorder::default();
        let app = app_with(&recorder, 1_000);
        app.on_shutdown(|_| async { false });
        app.on_shutdown(|_| async { true });

        assert_eq!(
            app.initiate_shutdown(ShutdownReason::Signal("SIGTERM")).await,
            Some(exit_code::SHUTDOWN_FAILED)
        );
    }

    #[tokio::test]
    async fn second_trigger_is_ignored() {
        let recorder = Recorder::default();
        let app = app_with(&recorder, 1_000);
        let runs = Arc::new(Mutex::new(0));
        let r = runs.clone();
        app.on_shutdown(move |_| {
            let r = r.clone();
            async move {
                *r.lock().unwrap() += 1;
                true
            }
        });

        let handle = app.shutdown_handle();
        let (first, second) = tokio::join!(
            app.initiate_shutdown(ShutdownReason::Signal("SIGTERM")),
            handle.shutdown()
        );
        assert_eq!(first, Some(0));
        assert_eq!(second, None);
        assert_eq!(*runs.lock().unwrap(), 1);
        assert!(handle.is_shutting_down());
    }

    #[tokio::test]
    async fn reason_is_passed_to_subscribers() {
        let recorder = Recorder::default();
        let app = app_with(&recorder, 1_000);
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        app.on_shutdown(move |event| {
            let s = s.clone();
            async move {
                *s.lock().unwrap() = Some(event.payload.clone());
            }
        });

        app.initiate_shutdown(ShutdownReason::Message("shutdown".into())).await;
        assert_eq!(*seen.lock().unwrap(), Some(ShutdownReason::Message("shutdown".into())));
    }

    #[tokio::test]
    async fn warn_subscribers_observe_shutting_down() {
        let recorder = Recorder::default();
        let app = app_with(&recorder, 1_000);
        app.start().await.unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        app.on_warn(move |event| {
            let s = s.clone();
            async move {
                s.lock().unwrap().push(event.source.running_state());
            }
        });

        app.initiate_shutdown(ShutdownReason::Signal("SIGTERM")).await;
        assert_eq!(*seen.lock().unwrap(), vec![RunningState::ShuttingDown]);
    }

    #[test]
    fn trigger_without_runtime_is_ignored() {
        let recorder = Recorder::default();
        let app = app_with(&recorder, 1_000);

        app.shutdown_handle().trigger();
        assert_eq!(app.running_state(), RunningState::Initialising);
        assert!(recorder.0.lock().unwrap().is_empty());
    }
}
