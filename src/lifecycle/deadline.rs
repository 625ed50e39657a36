//! Hard deadline timers.
//!
//! A deadline runs its expiry action on a separate task, so it still fires
//! while the guarded work is stuck. Expiry and disarm race on one flag:
//! exactly one of them wins.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// An armed deadline. Dropping it without [`Deadline::disarm`] leaves it armed.
#[derive(Debug)]
pub(crate) struct Deadline {
    settled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Deadline {
    /// Run `on_expire` after `timeout` unless disarmed first.
    pub(crate) fn arm<F>(timeout: Duration, on_expire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let settled = Arc::new(AtomicBool::new(false));
        let flag = settled.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if !flag.swap(true, Ordering::SeqCst) {
                on_expire.await;
            }
        });
        Self { settled, task }
    }

    /// Cancel the deadline. Returns `false` if it had already expired.
    pub(crate) fn disarm(self) -> bool {
        if self.settled.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.task.abort();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disarm_before_expiry_prevents_action() {
        let fired = Arc::new(AtomicBool::new(false));
        let f = fired.clone();
        let deadline = Deadline::arm(Duration::from_millis(50), async move {
            f.store(true, Ordering::SeqCst);
        });
        assert!(deadline.disarm());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn expiry_wins_after_timeout() {
        let fired = Arc::new(AtomicBool::new(false));
        let f = fired.clone();
        let deadline = Deadline::arm(Duration::from_millis(10), async move {
            f.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!deadline.disarm());
    }
}
