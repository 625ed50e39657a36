//! Event hook subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle transition / log call
//!     → dispatcher.rs (one Dispatcher per EventCategory)
//!     → event.rs (one immutable Event<P> per dispatch)
//!     → subscribers (sequential or concurrent)
//!     → boolean AND of results back to the caller
//! ```
//!
//! # Design Decisions
//! - Payload type is fixed per category, so subscribers are type-checked
//! - Subscriber failures never escape the dispatcher

pub mod dispatcher;
pub mod event;

pub use dispatcher::{BoxError, DispatchMode, Dispatcher, Subscriber, SubscriberOutcome};
pub use event::{Event, EventCategory, RequestInfo};
