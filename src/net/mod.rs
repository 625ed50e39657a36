//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Application::add_listener
//!     → listener.rs (ListenerHandle: state, deadline-bound shutdown)
//!     → http.rs (TCP bind, axum serve behind the lifecycle gate)
//!
//! Listener States:
//!     Initialising → Listening | Error → Closed
//! ```
//!
//! # Design Decisions
//! - Listeners are registered before start and started in order
//! - Each listener closes under its own deadline
//! - Transports are pluggable through the `Listener` trait

pub mod http;
pub mod listener;

pub use http::HttpListener;
pub use listener::{Listener, ListenerHandle, ListenerState};
