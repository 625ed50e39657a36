//! Shared utilities for integration tests.

use axum::{routing::get, Router};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use service_lifecycle::config::{AppConfig, ListenerConfig};
use service_lifecycle::lifecycle::{Application, RunningState, Terminate};

/// Records exit codes instead of exiting.
#[derive(Clone, Default)]
pub struct RecordingTerminator {
    codes: Arc<Mutex<Vec<i32>>>,
}

impl RecordingTerminator {
    pub fn codes(&self) -> Vec<i32> {
        self.codes.lock().unwrap().clone()
    }

    /// Wait until at least one exit code has been recorded.
    #[allow(dead_code)]
    pub async fn wait_for_exit(&self, timeout: Duration) -> Option<i32> {
        let poll = async {
            loop {
                if let Some(code) = self.codes().first().copied() {
                    return code;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.ok()
    }
}

impl Terminate for RecordingTerminator {
    fn terminate(&self, code: i32) {
        self.codes.lock().unwrap().push(code);
    }
}

/// Router answering "Hello World" on every path.
pub fn hello_router() -> Router {
    Router::new().fallback(get(|| async { "Hello World" }))
}

/// Application with a recording terminator and the hello router.
pub fn test_app(config: AppConfig) -> (Application, RecordingTerminator) {
    let terminator = RecordingTerminator::default();
    let app = Application::builder(config)
        .routes(hello_router())
        .terminator(terminator.clone())
        .build();
    (app, terminator)
}

/// Listener on an ephemeral loopback port.
#[allow(dead_code)]
pub fn loopback() -> ListenerConfig {
    ListenerConfig::port(0).with_host("127.0.0.1")
}

/// Wait for the application to reach `state`.
#[allow(dead_code)]
pub async fn wait_for_state(app: &Application, state: RunningState) {
    let mut rx = app.watch_state();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| *s == state))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed");
}
