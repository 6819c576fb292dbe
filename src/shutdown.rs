//! Cooperative shutdown signal shared by the background tasks

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// One-shot shutdown flag with wakeup. Triggering is idempotent; tasks that
/// start waiting after the trigger observe the flag and return immediately.
#[derive(Default)]
pub struct Shutdown {
    notify: Notify,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Wait until the shutdown is triggered
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent trigger cannot
        // slip between the check and the wait
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_returns_after_trigger() {
        let shutdown = Arc::new(Shutdown::new());
        shutdown.trigger();
        // Would hang if the flag were not checked before waiting
        shutdown.wait().await;
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn trigger_wakes_waiters() {
        let shutdown = Arc::new(Shutdown::new());
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };
        tokio::task::yield_now().await;
        shutdown.trigger();
        waiter.await.unwrap();
    }
}
