//! HTTP service assembly.
//!
//! Wraps the downstream router with the lifecycle gate and request tracing.
//! Listeners serve the result; tests drive it directly with `oneshot`.

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::http::gate::lifecycle_gate;
use crate::lifecycle::Application;

impl Application {
    /// The downstream router behind the lifecycle gate.
    pub fn http_service(&self) -> Router {
        self.routes()
            .layer(middleware::from_fn_with_state(self.clone(), lifecycle_gate))
            .layer(TraceLayer::new_for_http())
    }
}
