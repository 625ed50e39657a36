//! Startup orchestration.
//!
//! # Protocol
//! ```text
//! Initialising ──start()──→ Starting
//!     → startup subscribers (sequential by default)
//!     → any false? Error event, stay Starting (never ready)
//!     → Ready
//!     → each listener started in registration order
//!     → ≥1 listening? Listening + readiness signal + Listening event
//! ```
//!
//! # Design Decisions
//! - A failed startup fails open: the process keeps running but never
//!   reports ready, leaving the kill decision to the supervisor
//! - Listeners start last (traffic only when ready)
//! - A listener that cannot bind does not stop the others
//! - Once shutdown begins, no further listener is started

use crate::error::LifecycleError;
use crate::events::EventCategory;
use crate::lifecycle::controller::Application;
use crate::lifecycle::state::RunningState;
use crate::observability::metrics;

impl Application {
    /// Begin the startup protocol. Returns the state reached.
    ///
    /// Fails with [`LifecycleError::InvalidTransition`] unless the
    /// application is still initialising.
    pub async fn start(&self) -> Result<RunningState, LifecycleError> {
        self.transition(RunningState::Initialising, RunningState::Starting)
            .map_err(LifecycleError::InvalidTransition)?;
        let listeners = self.seal_listeners();

        if !self.inner.on_startup.dispatch(self.clone(), ()).await {
            tracing::error!("Startup incomplete, service will not become ready");
            self.emit(EventCategory::Error, "Startup callbacks did not all return true").await;
            return Ok(self.running_state());
        }

        if self.transition(RunningState::Starting, RunningState::Ready).is_err() {
            // Shutdown won the race.
            return Ok(self.running_state());
        }

        let mut addresses = Vec::new();
        for listener in &listeners {
            // Shutdown may begin while an earlier listener is starting.
            if self.running_state() != RunningState::Ready {
                tracing::debug!(state = %self.running_state(), "Shutdown began during startup, skipping remaining listeners");
                break;
            }
            if listener.start(self).await {
                addresses.push(listener.address());
            }
        }
        metrics::record_active_listeners(addresses.len());

        if addresses.is_empty() {
            if !listeners.is_empty() {
                tracing::warn!(count = listeners.len(), "No listener could be started");
            }
            return Ok(self.running_state());
        }

        if self.transition(RunningState::Ready, RunningState::Listening).is_err() {
            return Ok(self.running_state());
        }

        self.notify_ready_once();
        if !self.inner.on_listening.dispatch(self.clone(), addresses).await {
            tracing::warn!("Listening subscribers reported failure");
        }
        Ok(self.running_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::config::AppConfig;

    #[tokio::test]
    async fn no_listeners_stops_at_ready() {
        let app = Application::new(AppConfig::default());
        app.on_startup(|_| async { true });
        assert_eq!(app.start().await.unwrap(), RunningState::Ready);
        assert!(app.is_ready());
    }

    #[tokio::test]
    async fn failed_startup_stays_starting() {
        let app = Application::new(AppConfig::default());
        let errors = Arc::new(AtomicUsize::new(0));
        let e = errors.clone();
        app.on_error(move |event| {
            let e = e.clone();
            async move {
                if event.payload == "Startup callbacks did not all return true" {
                    e.fetch_add(1, Ordering::SeqCst);
                }
            }
        });
        app.on_startup(|_| async { false });

        assert_eq!(app.start().await.unwrap(), RunningState::Starting);
        assert!(!app.is_ready());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let app = Application::new(AppConfig::default());
        app.start().await.unwrap();
        let err = app.start().await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition(RunningState::Ready)));
        assert_eq!(app.running_state(), RunningState::Ready);
    }

    #[tokio::test]
    async fn start_during_start_is_rejected() {
        let app = Application::new(AppConfig::default());
        app.on_startup(|_| async {
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            true
        });

        let (first, second) = tokio::join!(app.start(), app.start());
        assert_eq!(first.unwrap(), RunningState::Ready);
        assert!(matches!(second, Err(LifecycleError::InvalidTransition(RunningState::Starting))));
    }

    #[tokio::test]
    async fn listeners_are_sealed_after_start() {
        let app = Application::new(AppConfig::default());
        app.start().await.unwrap();
        let err = app.add_listener(crate::config::ListenerConfig::port(0)).unwrap_err();
        assert!(matches!(err, LifecycleError::ListenersSealed(_)));
    }
}
