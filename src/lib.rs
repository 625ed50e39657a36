//! Service lifecycle library.
//!
//! Runs a network service through a supervised lifecycle: startup hooks,
//! listeners, readiness and health reporting, and a deadline-bound graceful
//! shutdown.
//!
//! # Architecture Overview
//!
//! ```text
//!     signals / supervisor messages
//!                │
//!                ▼
//!     ┌──────────────────────┐      ┌────────────────────┐
//!     │      lifecycle       │─────▶│       events       │──▶ subscribers
//!     │ state · start · stop │      │ per-category fan-out│
//!     └──────────┬───────────┘      └────────────────────┘
//!                │ start/close
//!                ▼
//!     ┌──────────────────────┐      ┌────────────────────┐
//!     │         net          │─────▶│        http        │──▶ user router
//!     │  listener handles    │      │  gate: health/503  │
//!     └──────────────────────┘      └────────────────────┘
//!
//!     Cross-cutting: config · health · observability · error
//! ```

// Core subsystems
pub mod config;
pub mod events;
pub mod lifecycle;

// Traffic
pub mod health;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod error;
pub mod observability;

pub use config::AppConfig;
pub use error::{LifecycleError, ListenerError};
pub use events::{DispatchMode, Event, EventCategory};
pub use lifecycle::{Application, ApplicationBuilder, RunningState, ShutdownHandle, ShutdownReason};
pub use net::{Listener, ListenerHandle, ListenerState};
