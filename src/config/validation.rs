//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (deadlines > 0)
//! - Detect conflicting listeners
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.shutdown_timeout_ms == 0 {
        errors.push(ValidationError::new("shutdown_timeout_ms", "must be greater than zero"));
    }
    if config.listener_shutdown_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "listener_shutdown_timeout_ms",
            "must be greater than zero",
        ));
    }

    if config.health_check.user_agent.iter().any(|ua| ua.trim().is_empty()) {
        errors.push(ValidationError::new("health_check.user_agent", "entries must not be empty"));
    }
    for endpoint in config.health_check.endpoint.iter() {
        if !endpoint.starts_with('/') {
            errors.push(ValidationError::new(
                "health_check.endpoint",
                format!("'{}' must start with '/'", endpoint),
            ));
        }
    }

    let mut bound = HashSet::new();
    for (i, listener) in config.listeners.iter().enumerate() {
        let port = listener.resolved_port();
        // Port 0 asks the OS for a fresh port, so it never conflicts.
        if port != 0 && !bound.insert((listener.resolved_host(), port)) {
            errors.push(ValidationError::new(
                format!("listeners[{}]", i),
                format!("duplicate bind {}:{}", listener.resolved_host(), port),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
