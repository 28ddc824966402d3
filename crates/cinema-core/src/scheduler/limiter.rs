//! Concurrency limiter shared by all jobs of one batch run.
//!
//! Jobs acquire a slot before they submit anything and hold it until their
//! artifact is written, so at most `capacity` jobs talk to the provider at
//! once. Waiters are admitted in FIFO order (tokio's semaphore is fair).

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

/// Fixed-capacity admission gate. One instance per batch run, shared by `Arc`.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    capacity: usize,
    slots: Semaphore,
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

/// Held while a job runs; dropping it releases the slot.
#[derive(Debug)]
pub struct LimiterPermit<'a> {
    limiter: &'a ConcurrencyLimiter,
    _permit: SemaphorePermit<'a>,
}

impl Drop for LimiterPermit<'_> {
    fn drop(&mut self) {
        self.limiter.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ConcurrencyLimiter {
    /// Create a limiter admitting `capacity` jobs at once (0 is treated as 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Semaphore::new(capacity),
            in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    /// Highest number of slots held at the same time so far.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Wait for a free slot. Returns `None` if `cancel` fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<LimiterPermit<'_>> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            permit = self.slots.acquire() => permit.ok()?,
        };
        let now = self.in_use.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        Some(LimiterPermit {
            limiter: self,
            _permit: permit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn acquire_and_release() {
        let limiter = ConcurrencyLimiter::new(2);
        let cancel = CancellationToken::new();
        let a = limiter.acquire(&cancel).await.unwrap();
        let b = limiter.acquire(&cancel).await.unwrap();
        assert_eq!(limiter.in_use(), 2);
        drop(a);
        assert_eq!(limiter.in_use(), 1);
        drop(b);
        assert_eq!(limiter.in_use(), 0);
        assert_eq!(limiter.peak(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(ConcurrencyLimiter::new(0).capacity(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_is_admitted_after_release() {
        let limiter = Arc::new(ConcurrencyLimiter::new(1));
        let cancel = CancellationToken::new();
        let held = limiter.acquire(&cancel).await.unwrap();

        let l2 = Arc::clone(&limiter);
        let c2 = cancel.clone();
        let waiter = tokio::spawn(async move {
            let _p = l2.acquire(&c2).await.expect("admitted");
            l2.in_use()
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!waiter.is_finished());
        drop(held);
        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(limiter.peak(), 1);
    }

    #[tokio::test]
    async fn cancelled_waiter_gets_none() {
        let limiter = ConcurrencyLimiter::new(1);
        let cancel = CancellationToken::new();
        let _held = limiter.acquire(&cancel).await.unwrap();
        cancel.cancel();
        assert!(limiter.acquire(&cancel).await.is_none());
        assert_eq!(limiter.in_use(), 1);
    }
}
