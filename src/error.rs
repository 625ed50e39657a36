//! Error types for the lifecycle core.
//!
//! Expected, embedder-caused conditions (calling `start()` twice, adding a
//! listener too late) are typed errors returned to the caller. Failures inside
//! subscriber code never show up here: the dispatcher catches and logs them.

use thiserror::Error;

use crate::lifecycle::RunningState;

/// Errors returned by [`Application`](crate::lifecycle::Application) operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `start()` was called when the application was not initialising.
    #[error("Called start while {0}")]
    InvalidTransition(RunningState),

    /// A listener was registered after `start()` sealed the collection.
    #[error("Cannot add a listener while {0}")]
    ListenersSealed(RunningState),

    /// Underlying I/O failure (signal registration and similar).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a [`Listener`](crate::net::Listener) implementation.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The transport reported an error while closing.
    #[error("Failed to close: {0}")]
    Close(std::io::Error),

    /// The background serve task ended abnormally.
    #[error("Listener task failed: {0}")]
    Task(String),
}
