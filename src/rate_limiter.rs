use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum number of AI calls in flight at once
    pub max_concurrent: usize,
    /// Minimum time between the starts of two consecutive calls
    pub min_interval: Duration,
    /// How often a waiting caller re-checks the gate
    pub poll_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            min_interval: Duration::from_millis(3000),
            poll_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Default)]
struct GateState {
    in_flight: usize,
    last_start: Option<Instant>,
}

/// Concurrency gate shared by every outbound AI call.
///
/// `acquire` waits until a slot is free and the minimum interval since the
/// previous start has passed. The returned permit releases the slot when
/// dropped, so a failed or cancelled call cannot leak it.
#[derive(Debug, Clone)]
pub struct RateGate {
    state: Arc<Mutex<GateState>>,
    config: RateLimitConfig,
}

impl RateGate {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::default())),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn lock_state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `None` when a slot was reserved, otherwise how long to wait before retrying.
    fn try_reserve(&self) -> Option<Duration> {
        let mut state = self.lock_state();
        let max_concurrent = self.config.max_concurrent.max(1);

        if state.in_flight >= max_concurrent {
            return Some(self.config.poll_interval);
        }

        if let Some(last) = state.last_start {
            let elapsed = last.elapsed();
            if elapsed < self.config.min_interval {
                let remaining = self.config.min_interval - elapsed;
                return Some(remaining.min(self.config.poll_interval));
            }
        }

        state.in_flight += 1;
        state.last_start = Some(Instant::now());
        None
    }

    pub async fn acquire(&self) -> GatePermit {
        loop {
            match self.try_reserve() {
                None => {
                    debug!(in_flight = self.in_flight(), "Rate gate slot acquired");
                    return GatePermit {
                        gate: self.clone(),
                        released: false,
                    };
                }
                Some(wait) => sleep(wait).await,
            }
        }
    }

    /// Free one slot. Never drops the counter below zero.
    pub fn release(&self) {
        let mut state = self.lock_state();
        state.in_flight = state.in_flight.saturating_sub(1);
    }

    pub fn in_flight(&self) -> usize {
        self.lock_state().in_flight
    }
}

/// A reserved slot on a [`RateGate`]
#[derive(Debug)]
pub struct GatePermit {
    gate: RateGate,
    released: bool,
}

impl GatePermit {
    pub fn release(mut self) {
        self.released = true;
        self.gate.release();
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        if !self.released {
            self.gate.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config(min_interval_ms: u64) -> RateLimitConfig {
        RateLimitConfig {
            max_concurrent: 1,
            min_interval: Duration::from_millis(min_interval_ms),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_release_never_goes_below_zero() {
        let gate = RateGate::new(fast_config(0));
        gate.release();
        gate.release();
        assert_eq!(gate.in_flight(), 0);

        let permit = gate.acquire().await;
        assert_eq!(gate.in_flight(), 1);
        permit.release();
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dropped_permit_frees_slot() {
        let gate = RateGate::new(fast_config(0));
        {
            let _permit = gate.acquire().await;
            assert_eq!(gate.in_flight(), 1);
        }
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_min_interval_between_starts() {
        let gate = RateGate::new(fast_config(60));
        let started = Instant::now();

        gate.acquire().await.release();
        gate.acquire().await.release();

        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_second_caller_waits_for_first_to_finish() {
        let gate = RateGate::new(fast_config(0));
        let first = gate.acquire().await;

        let waiter_gate = gate.clone();
        let waiter = tokio::spawn(async move {
            let permit = waiter_gate.acquire().await;
            permit.release();
        });

        sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished(), "second caller must wait while a call is in flight");

        first.release();
        waiter.await.unwrap();
        assert_eq!(gate.in_flight(), 0);
    }
}
