//! Per-connection token bucket rate limiter (20 frames/second, burst 40).
//! Not present in the teacher's own middleware set, which has
//! no WebSocket read-pump to rate-limit; built in the teacher's
//! `parking_lot`-guarded-counter idiom (cf. `dashmap`-backed registries
//! elsewhere in this crate) rather than a channel-based limiter.

use std::time::Instant;

pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_second: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(refill_per_second: u32, burst: u32) -> Self {
        Self {
            capacity: burst as f64,
            tokens: burst as f64,
            refill_per_second: refill_per_second as f64,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
        self.last_refill = now;
    }

    /// Returns `true` and consumes one token if the bucket isn't empty.
    pub fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_allows_up_to_configured_tokens_immediately() {
        let mut bucket = TokenBucket::new(20, 40);
        for _ in 0..40 {
            assert!(bucket.try_consume());
        }
        assert!(!bucket.try_consume());
    }

    #[test]
    fn bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(20, 1);
        assert!(bucket.try_consume());
        assert!(!bucket.try_consume());

        std::thread::sleep(std::time::Duration::from_millis(60));
        assert!(bucket.try_consume());
    }
}
