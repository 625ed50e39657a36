//! Health response body.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::lifecycle::RunningState;

/// Body returned to health probes.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub state: RunningState,
    /// Seconds since the application was constructed.
    pub uptime: f64,
}

impl HealthReport {
    pub fn status(&self) -> StatusCode {
        if self.healthy {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}
