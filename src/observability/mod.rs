//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle and gate produce:
//!     → logging.rs (tracing events, console sink for message events)
//!     → metrics.rs (state gauge, dispatch and gate counters)
//!
//! Consumers:
//!     → stdout (human or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
