//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     start() → startup hooks → Ready → start listeners → Listening
//!
//! Shutdown (shutdown.rs):
//!     Trigger → ShuttingDown → deadline armed → shutdown hooks → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT or "shutdown" message → Trigger graceful shutdown
//!
//! Supervisor (supervisor.rs):
//!     Listening → "ready" sent once to the parent process
//! ```
//!
//! # Design Decisions
//! - Ordered startup: hooks first, then listeners
//! - State lives in one atomic; every transition is a compare-and-swap
//! - Shutdown has timeout: forced exit after deadline

pub mod builder;
pub mod controller;
pub mod deadline;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;
pub mod supervisor;

pub use builder::ApplicationBuilder;
pub use controller::{Application, DEFAULT_BANNER};
pub use shutdown::{exit_code, ProcessExit, ShutdownHandle, ShutdownReason, Terminate};
pub use signals::SHUTDOWN_MESSAGE;
pub use state::RunningState;
pub use supervisor::{NotifySocket, ReadinessNotifier};
