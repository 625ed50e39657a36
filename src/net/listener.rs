//! Listener abstraction and per-listener shutdown.
//!
//! # Responsibilities
//! - Define the [`Listener`] seam (start, close, describe)
//! - Track each listener's state (Initialising → Listening/Error → Closed)
//! - Close a listener under its own deadline, escalating to a fatal exit
//!
//! # Design Decisions
//! - Handles are cheap clones sharing one slot, so the controller and user
//!   code observe the same state
//! - The transport sits behind an async mutex; start and close never overlap
//! - Shutdown is idempotent: the second call returns immediately

use futures_util::future::BoxFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::ListenerError;
use crate::events::EventCategory;
use crate::lifecycle::deadline::Deadline;
use crate::lifecycle::exit_code;
use crate::lifecycle::Application;

/// A network endpoint the application serves on.
pub trait Listener: Send + 'static {
    /// Short name for log lines, e.g. `"http"`.
    fn kind(&self) -> &'static str;

    /// Bind and begin serving. Resolves to the bound address.
    fn start<'a>(&'a mut self, app: &'a Application) -> BoxFuture<'a, Result<SocketAddr, ListenerError>>;

    /// Stop accepting and wait for the transport to wind down.
    fn close(&mut self) -> BoxFuture<'_, Result<(), ListenerError>>;

    /// Public address, e.g. `http://example.com/`.
    fn describe_address(&self) -> String;
}

/// Listener lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ListenerState {
    Initialising = 0,
    Listening = 1,
    Error = 2,
    Closed = 3,
}

impl From<u8> for ListenerState {
    fn from(value: u8) -> Self {
        match value {
            1 => ListenerState::Listening,
            2 => ListenerState::Error,
            3 => ListenerState::Closed,
            _ => ListenerState::Initialising,
        }
    }
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ListenerState::Initialising => "init",
            ListenerState::Listening => "listening",
            ListenerState::Error => "error",
            ListenerState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Shared handle to a registered listener.
#[derive(Clone)]
pub struct ListenerHandle {
    inner: Arc<ListenerSlot>,
}

struct ListenerSlot {
    kind: &'static str,
    state: AtomicU8,
    shutdown_timeout: Duration,
    shutdown_pending: AtomicBool,
    local_addr: RwLock<Option<SocketAddr>>,
    address: RwLock<String>,
    transport: Mutex<Box<dyn Listener>>,
}

impl ListenerHandle {
    pub(crate) fn new(listener: Box<dyn Listener>, shutdown_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(ListenerSlot {
                kind: listener.kind(),
                state: AtomicU8::new(ListenerState::Initialising as u8),
                shutdown_timeout,
                shutdown_pending: AtomicBool::new(false),
                local_addr: RwLock::new(None),
                address: RwLock::new(listener.describe_address()),
                transport: Mutex::new(listener),
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.inner.kind
    }

    /// Public address. Reflects the bound port once started.
    pub fn address(&self) -> String {
        self.inner
            .address
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn state(&self) -> ListenerState {
        ListenerState::from(self.inner.state.load(Ordering::SeqCst))
    }

    /// Bound socket address, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self
            .inner
            .local_addr
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: ListenerState) {
        self.inner.state.store(state as u8, Ordering::SeqCst);
    }

    /// Start the transport. Returns true once it is listening.
    ///
    /// A listener whose shutdown has been requested is never started.
    pub(crate) async fn start(&self, app: &Application) -> bool {
        let (result, address) = {
            let mut transport = self.inner.transport.lock().await;
            if self.inner.shutdown_pending.load(Ordering::SeqCst) || self.state() == ListenerState::Closed {
                tracing::debug!(address = %self.address(), "Listener shut down before start, skipping");
                return false;
            }
            let result = transport.start(app).await;
            let address = transport.describe_address();
            // Published under the transport lock: a close cannot slip in between.
            match &result {
                Ok(addr) => {
                    *self
                        .inner
                        .local_addr
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(*addr);
                    self.set_state(ListenerState::Listening);
                }
                Err(_) => self.set_state(ListenerState::Error),
            }
            (result, address)
        };
        *self
            .inner
            .address
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = address.clone();

        match result {
            Ok(addr) => {
                tracing::info!(kind = self.kind(), local_addr = %addr, "Listener started");
                app.emit(
                    EventCategory::Info,
                    format!("{} listening at {}", app.display_name(), address),
                )
                .await;
                true
            }
            Err(e) => {
                tracing::error!(kind = self.kind(), error = %e, "Listener failed to start");
                app.emit(
                    EventCategory::Error,
                    format!("Unable to start {} listener at {}: {}", self.kind(), address, e),
                )
                .await;
                false
            }
        }
    }

    /// Close the listener within its shutdown deadline.
    ///
    /// Failure to close, or missing the deadline, terminates the process with
    /// [`exit_code::LISTENER_CLOSE_FAILED`].
    pub async fn shutdown(&self, app: &Application) {
        if self.inner.shutdown_pending.swap(true, Ordering::SeqCst) {
            tracing::debug!(address = %self.address(), "Listener shutdown already requested");
            return;
        }

        let message = format!("Unable to shutdown {} listener at {}", self.kind(), self.address());
        let deadline = {
            let app = app.clone();
            let message = message.clone();
            Deadline::arm(self.inner.shutdown_timeout, async move {
                app.fatal(exit_code::LISTENER_CLOSE_FAILED, message).await;
            })
        };

        let result = self.inner.transport.lock().await.close().await;
        match result {
            Ok(()) => {
                if deadline.disarm() {
                    self.set_state(ListenerState::Closed);
                    tracing::info!(address = %self.address(), "Listener closed");
                }
            }
            Err(e) => {
                if deadline.disarm() {
                    self.set_state(ListenerState::Error);
                    app.fatal(exit_code::LISTENER_CLOSE_FAILED, format!("{}: {}", message, e))
                        .await;
                }
            }
        }
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("kind", &self.kind())
            .field("address", &self.address())
            .field("state", &self.state())
            .finish()
    }
}
