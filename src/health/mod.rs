//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → checks.rs (user agent / path match?)
//!     → default predicate: state == Listening
//!     → application predicates, in order
//!     → report.rs (200 or 503 + JSON body)
//! ```
//!
//! # Design Decisions
//! - Health is evaluated per request, never cached
//! - Health and readiness are independent: a service can be ready but unhealthy

pub mod checks;
pub mod report;

pub use checks::{HealthCheckConfig, HealthPredicate, HealthProbe};
pub use report::HealthReport;
