//! Per-category event fan-out.
//!
//! # Responsibilities
//! - Hold the ordered subscriber list for one event category
//! - Invoke subscribers sequentially or concurrently
//! - Isolate subscriber failures and AND the results together
//!
//! # Design Decisions
//! - A subscriber error or panic counts as `false` and is logged; siblings still run
//! - Concurrent mode polls every subscriber on the dispatching task (`join_all`),
//!   interleaved rather than parallel
//! - An empty subscriber list dispatches to `true`

use futures_util::future::{join_all, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use crate::events::{Event, EventCategory};
use crate::lifecycle::Application;
use crate::observability::metrics;

/// Boxed error returned by fallible subscribers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased subscriber callback.
pub type Subscriber<P> =
    Arc<dyn Fn(Arc<Event<P>>) -> BoxFuture<'static, Result<bool, BoxError>> + Send + Sync>;

/// Subscriber invocation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One at a time, in registration order, each fully awaited.
    Sequential,
    /// All started together, completions awaited collectively.
    Concurrent,
}

impl DispatchMode {
    /// Startup and shutdown hooks run in order; everything else fans out.
    pub fn default_for(category: EventCategory) -> Self {
        match category {
            EventCategory::Startup | EventCategory::Shutdown => DispatchMode::Sequential,
            _ => DispatchMode::Concurrent,
        }
    }
}

/// What a subscriber callback may return.
///
/// `()` counts as success, `bool` is taken as-is and `Result` maps `Err` to a
/// logged failure.
pub trait SubscriberOutcome {
    fn into_outcome(self) -> Result<bool, BoxError>;
}

impl SubscriberOutcome for () {
    fn into_outcome(self) -> Result<bool, BoxError> {
        Ok(true)
    }
}

impl SubscriberOutcome for bool {
    fn into_outcome(self) -> Result<bool, BoxError> {
        Ok(self)
    }
}

impl<T, E> SubscriberOutcome for Result<T, E>
where
    T: SubscriberOutcome,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<bool, BoxError> {
        match self {
            Ok(value) => value.into_outcome(),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fan-out for one event category.
pub struct Dispatcher<P> {
    category: EventCategory,
    mode: DispatchMode,
    subscribers: RwLock<Vec<Subscriber<P>>>,
}

impl<P: Send + Sync + 'static> Dispatcher<P> {
    /// Create a dispatcher with the category's default mode.
    pub fn new(category: EventCategory) -> Self {
        Self::with_mode(category, DispatchMode::default_for(category))
    }

    pub fn with_mode(category: EventCategory, mode: DispatchMode) -> Self {
        Self {
            category,
            mode,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.read_subscribers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a subscriber. No de-duplication.
    pub fn subscribe<F, Fut, O>(&self, callback: F)
    where
        F: Fn(Arc<Event<P>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: SubscriberOutcome + 'static,
    {
        let subscriber: Subscriber<P> =
            Arc::new(move |event: Arc<Event<P>>| callback(event).map(SubscriberOutcome::into_outcome).boxed());
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(subscriber);
    }

    /// Invoke every subscriber with one shared event and AND the results.
    pub async fn dispatch(&self, source: Application, payload: P) -> bool {
        let event = Arc::new(Event {
            category: self.category,
            timestamp: SystemTime::now(),
            source,
            payload,
        });

        // Snapshot so subscribers may register further subscribers without deadlocking.
        let subscribers = self.read_subscribers().clone();

        let result = match self.mode {
            DispatchMode::Sequential => {
                let mut all = true;
                for (index, subscriber) in subscribers.iter().enumerate() {
                    all &= self.invoke(index, subscriber, event.clone()).await;
                }
                all
            }
            DispatchMode::Concurrent => {
                let calls = subscribers
                    .iter()
                    .enumerate()
                    .map(|(index, subscriber)| self.invoke(index, subscriber, event.clone()));
                join_all(calls).await.into_iter().all(|ok| ok)
            }
        };

        metrics::record_dispatch(self.category, result);
        result
    }

    async fn invoke(&self, index: usize, subscriber: &Subscriber<P>, event: Arc<Event<P>>) -> bool {
        // The call itself sits inside the guarded future so a synchronous panic is caught too.
        let call = AssertUnwindSafe(async move { subscriber(event).await }).catch_unwind();
        match call.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(
                    category = %self.category,
                    subscriber = index,
                    error = %e,
                    "Event subscriber failed"
                );
                false
            }
            Err(panic) => {
                tracing::error!(
                    category = %self.category,
                    subscriber = index,
                    panic = panic_message(&*panic),
                    "Event subscriber panicked"
                );
                false
            }
        }
    }

    fn read_subscribers(&self) -> std::sync::RwLockReadGuard<'_, Vec<Subscriber<P>>> {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<P> std::fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("category", &self.category)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
