//! Event categories and the immutable event value passed to subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

use crate::lifecycle::Application;

/// Lifecycle event categories. Each has exactly one dispatcher per application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Startup,
    Shutdown,
    Listening,
    Log,
    Info,
    Warn,
    Error,
    Request,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Startup => "startup",
            EventCategory::Shutdown => "shutdown",
            EventCategory::Listening => "listening",
            EventCategory::Log => "log",
            EventCategory::Info => "info",
            EventCategory::Warn => "warn",
            EventCategory::Error => "error",
            EventCategory::Request => "request",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dispatch, shared by every subscriber of that call.
///
/// `P` is fixed per category: `()` for startup, [`ShutdownReason`] for
/// shutdown, the resolved addresses for listening, a message for the
/// log levels and [`RequestInfo`] for requests.
///
/// [`ShutdownReason`]: crate::lifecycle::ShutdownReason
#[derive(Debug)]
pub struct Event<P> {
    pub category: EventCategory,
    pub timestamp: SystemTime,
    /// The application that dispatched this event.
    pub source: Application,
    pub payload: P,
}

/// Snapshot of an inbound request, carried by `Request` events.
#[derive(Debug, Clone, Serialize)]
pub struct RequestInfo {
    pub id: Uuid,
    pub method: String,
    pub path: String,
    pub user_agent: Option<String>,
}
