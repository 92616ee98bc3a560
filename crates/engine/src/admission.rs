//! Ingestion admission control
//!
//! Counts events accepted but not yet fully processed. Past `limit` new
//! events are refused instead of buffered.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

pub(crate) struct Admission {
    limit: usize,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl Admission {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Take a slot, or return the current depth when full
    pub fn try_acquire(&self) -> Result<(), usize> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| {
                (depth < self.limit).then_some(depth + 1)
            })
            .map(|_| ())
    }

    pub fn release(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Resolves once nothing is in flight
    pub async fn wait_idle(&self) {
        loop {
            // Registered before the check so a release in between is not missed
            let notified = self.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_refuses_past_limit() {
        let admission = Admission::new(2);
        assert_eq!(admission.try_acquire(), Ok(()));
        assert_eq!(admission.try_acquire(), Ok(()));
        assert_eq!(admission.try_acquire(), Err(2));

        admission.release();
        assert_eq!(admission.try_acquire(), Ok(()));
        assert_eq!(admission.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_wait_idle_wakes_on_last_release() {
        let admission = Arc::new(Admission::new(4));
        admission.try_acquire().unwrap();
        admission.try_acquire().unwrap();

        let waiter = {
            let admission = Arc::clone(&admission);
            tokio::spawn(async move { admission.wait_idle().await })
        };
        tokio::task::yield_now().await;
        admission.release();
        assert!(!waiter.is_finished());
        admission.release();
        waiter.await.unwrap();
    }
}
