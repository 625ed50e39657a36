//! OS signal and supervisor message handling.
//!
//! # Responsibilities
//! - Subscribe one application to SIGTERM/SIGINT
//! - Turn `shutdown` lines from a supervisor channel into shutdown triggers
//!
//! # Design Decisions
//! - Subscription is an explicit call scoped to one application, so several
//!   applications in one process (tests) do not collide
//! - Uses Tokio's signal handling (async-safe)
//! - Repeated signals are forwarded; the coordinator ignores all but the first

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;

use crate::error::LifecycleError;
use crate::lifecycle::controller::Application;
use crate::lifecycle::shutdown::ShutdownReason;

/// Supervisor message that requests shutdown.
pub const SHUTDOWN_MESSAGE: &str = "shutdown";

impl Application {
    /// Trigger shutdown on SIGTERM or SIGINT.
    #[cfg(unix)]
    pub fn listen_for_signals(&self) -> Result<JoinHandle<()>, LifecycleError> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let app = self.clone();

        Ok(tokio::spawn(async move {
            loop {
                let name = tokio::select! {
                    Some(()) = sigterm.recv() => "SIGTERM",
                    Some(()) = sigint.recv() => "SIGINT",
                    else => break,
                };
                tracing::info!(signal = name, "Signal received");
                app.trigger_shutdown(ShutdownReason::Signal(name));
            }
        }))
    }

    /// Trigger shutdown on Ctrl+C.
    #[cfg(not(unix))]
    pub fn listen_for_signals(&self) -> Result<JoinHandle<()>, LifecycleError> {
        let app = self.clone();
        Ok(tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                app.trigger_shutdown(ShutdownReason::Signal("SIGINT"));
            }
        }))
    }

    /// Trigger shutdown when a `shutdown` line arrives on `reader`.
    pub fn listen_for_messages<R>(&self, reader: R) -> JoinHandle<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let app = self.clone();
        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let message = line.trim();
                        if message == SHUTDOWN_MESSAGE {
                            app.trigger_shutdown(ShutdownReason::Message(message.to_string()));
                        } else if !message.is_empty() {
                            tracing::debug!(message = %message, "Ignoring supervisor message");
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Supervisor channel read failed");
                        break;
                    }
                }
            }
        })
    }

    fn trigger_shutdown(&self, reason: ShutdownReason) {
        let app = self.clone();
        tokio::spawn(async move {
            app.initiate_shutdown(reason).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, BufReader};

    use crate::config::AppConfig;
    use crate::lifecycle::shutdown::Terminate;
    use crate::lifecycle::RunningState;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<i32>>>);

    impl Terminate for Recorder {
        fn terminate(&self, code: i32) {
            self.0.lock().unwrap().push(code);
        }
    }

    #[tokio::test]
    async fn shutdown_message_triggers_once() {
        let recorder = Recorder::default();
        let app = Application::builder(AppConfig::default())
            .terminator(recorder.clone())
            .build();

        let (mut tx, rx) = tokio::io::duplex(64);
        let task = app.listen_for_messages(BufReader::new(rx));
        tx.write_all(b"ping\nshutdown\nshutdown\n").await.unwrap();
        drop(tx);
        task.await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(app.running_state(), RunningState::ShuttingDown);
        assert_eq!(*recorder.0.lock().unwrap(), vec![0]);
    }
}
