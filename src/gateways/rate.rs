//! Minimum-spacing rate gate shared by all callers of one gateway.
//!
//! The gate is an async mutex over the last-call instant. Acquiring it
//! sleeps out whatever remains of the configured interval, and the
//! returned permit holds the lock until dropped, so at most one guarded
//! call is in flight at a time no matter how wide the worker pools
//! above are. The permit stamps the instant on drop, which makes the
//! spacing measure call-end to call-start.

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{Duration, Instant, sleep};

/// One gateway's rate budget: serialized calls with a minimum interval
/// between them.
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Wait for the gate, then hold it for the duration of one call.
    ///
    /// Drop the returned permit when the guarded call has finished.
    pub async fn throttle(&self) -> RatePermit<'_> {
        let slot = self.last_call.lock().await;
        if let Some(previous) = *slot {
            let since = previous.elapsed();
            if since < self.interval {
                sleep(self.interval - since).await;
            }
        }
        RatePermit { slot }
    }
}

/// Exclusive permission to make one guarded call.
#[derive(Debug)]
pub struct RatePermit<'a> {
    slot: MutexGuard<'a, Option<Instant>>,
}

impl Drop for RatePermit<'_> {
    fn drop(&mut self) {
        *self.slot = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_not_delayed() {
        let gate = RateGate::new(Duration::from_secs(1));
        let before = Instant::now();
        drop(gate.throttle().await);
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_waits_out_the_interval() {
        let gate = RateGate::new(Duration::from_secs(1));
        drop(gate.throttle().await);

        let before = Instant::now();
        drop(gate.throttle().await);
        assert!(Instant::now() - before >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_counts_from_permit_drop() {
        let gate = RateGate::new(Duration::from_secs(1));

        let permit = gate.throttle().await;
        // Simulate a slow guarded call.
        sleep(Duration::from_secs(5)).await;
        drop(permit);

        let before = Instant::now();
        drop(gate.throttle().await);
        // The interval starts at call end, so a full second still passes.
        assert!(Instant::now() - before >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_serialized() {
        use std::sync::Arc;

        let gate = Arc::new(RateGate::new(Duration::from_secs(1)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                drop(gate.throttle().await);
                Instant::now() - start
            }));
        }

        let mut offsets: Vec<Duration> = Vec::new();
        for handle in handles {
            offsets.push(handle.await.unwrap());
        }
        offsets.sort();

        // Three callers through a 1s gate span at least two full intervals.
        assert!(offsets[2] >= Duration::from_secs(2), "offsets: {offsets:?}");
    }
}
