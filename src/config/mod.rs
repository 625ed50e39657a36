//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated)
//!     → ApplicationBuilder (adds closures that cannot be serialized)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - String-or-list fields are normalized to sets before reaching the core

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AppConfig;
pub use schema::DispatchModes;
pub use schema::HealthCheckSettings;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::OneOrMany;
