//! Lifecycle gate middleware.
//!
//! # Responsibilities
//! - Answer health probes (matched by user-agent or path) directly
//! - Refuse traffic with 503 until the application is ready
//! - Stamp the `Server` banner and an `x-request-id` on responses
//! - Ask clients to close connections once shutdown has begun

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::events::RequestInfo;
use crate::health::HealthProbe;
use crate::lifecycle::{Application, RunningState};
use crate::observability::metrics;

/// Response header carrying the per-request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

pub async fn lifecycle_gate(State(app): State<Application>, request: Request<Body>, next: Next) -> Response {
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let path = request.uri().path().to_string();

    let health_check = app.health_check();
    if health_check.matches(user_agent.as_deref(), &path) {
        metrics::record_gated_request("health");
        let probe = HealthProbe {
            method: request.method().clone(),
            path,
            user_agent,
            headers: request.headers().clone(),
        };
        let report = app.health_report(&probe).await;
        tracing::debug!(healthy = report.healthy, state = %report.state, "Health probe answered");
        return report.into_response();
    }

    let mut response = if app.is_ready() {
        metrics::record_gated_request("routed");
        let info = RequestInfo {
            id: Uuid::new_v4(),
            method: request.method().to_string(),
            path,
            user_agent,
        };
        let id = info.id;

        let mut request = request;
        request.extensions_mut().insert(info.clone());
        app.spawn_request_event(info);

        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
        response
    } else {
        metrics::record_gated_request("unavailable");
        tracing::debug!(state = %app.running_state(), path = %path, "Request refused, not ready");
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    };

    if let Some(banner) = app.banner() {
        match HeaderValue::from_str(banner) {
            Ok(value) => {
                response.headers_mut().insert(header::SERVER, value);
            }
            Err(_) => tracing::warn!(banner = %banner, "Banner is not a valid header value"),
        }
    }

    if app.running_state() == RunningState::ShuttingDown {
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
    }

    response
}
