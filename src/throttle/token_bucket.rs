use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Continuous-refill token bucket. Refills `capacity` tokens per second, never
/// holding more than `capacity`; each outbound request consumes one token.
/// Capacity is at least one, so a waiting caller is always served eventually.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    min_backoff: Duration,
    state: Mutex<BucketState>,
    // Waiters line up here so that permits are granted in arrival order.
    queue: tokio::sync::Mutex<()>,
}

impl TokenBucket {
    /// Full bucket.
    pub fn new(capacity: u32) -> Self {
        TokenBucket::with_tokens(capacity, capacity as f64)
    }

    pub fn with_tokens(capacity: u32, tokens: f64) -> Self {
        let capacity = capacity.max(1);
        TokenBucket {
            capacity,
            min_backoff: Duration::from_millis(50),
            state: Mutex::new(BucketState {
                tokens: tokens.clamp(0.0, capacity as f64),
                last_refill: Instant::now(),
            }),
            queue: tokio::sync::Mutex::new(()),
        }
    }

    /// Shortest pause between two acquisition attempts of a waiting caller.
    pub fn with_min_backoff(mut self, min_backoff: Duration) -> Self {
        self.min_backoff = min_backoff;
        self
    }

    /// Tokens currently available, after refill.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock().unwrap();
        self.refill(&mut state);
        state.tokens
    }

    /// Take one token if available. Never waits.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Wait until a token is granted.
    ///
    /// Callers are served in the order they started waiting. The head of the
    /// queue sleeps until its token is due rather than spinning.
    pub async fn acquire(&self) {
        let _turn = self.queue.lock().await;
        while !self.try_acquire() {
            let wait = self.time_to_next_token().max(self.min_backoff);
            debug!(wait_ms = wait.as_millis() as u64, "rate limited, waiting for a token");
            sleep(wait).await;
        }
    }

    fn time_to_next_token(&self) -> Duration {
        let state = self.state.lock().unwrap();
        let missing = (1.0 - state.tokens).max(0.0);
        Duration::from_secs_f64(missing / self.capacity as f64)
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(state.last_refill).as_secs_f64() * 1000.0;
        let capacity = self.capacity as f64;
        state.tokens = (state.tokens + elapsed_ms * capacity / 1000.0).min(capacity);
        state.last_refill = now;
    }
}
