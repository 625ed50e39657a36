//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::http)
//!     → server.rs (TraceLayer, gate layer over the user's router)
//!     → gate.rs (health probe? not ready? shutting down?)
//!     → downstream router
//!     → response with Server / x-request-id / Connection headers
//! ```

pub mod gate;
pub mod server;

pub use gate::{lifecycle_gate, X_REQUEST_ID};
