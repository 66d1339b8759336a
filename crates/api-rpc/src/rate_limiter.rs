//! Rate Limiter (Token Bucket)
//!
//! Caps mutating-method throughput per process. The bucket refills
//! continuously at `refill_per_sec` up to `max_tokens`.

use std::sync::Mutex;
use std::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    state: Mutex<Bucket>,
    max_tokens: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    /// `max_burst` requests may arrive at once; sustained throughput is
    /// `refill_per_sec` requests per second.
    pub fn new(max_burst: u32, refill_per_sec: u32) -> Self {
        Self {
            state: Mutex::new(Bucket {
                tokens: max_burst as f64,
                last_refill: Instant::now(),
            }),
            max_tokens: max_burst as f64,
            refill_per_sec: refill_per_sec as f64,
        }
    }

    /// Consume one token if available
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.state.lock().expect("rate limiter lock poisoned");

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn burst_is_capped() {
        let limiter = RateLimiter::new(5, 1);
        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn bucket_refills_over_time() {
        let limiter = RateLimiter::new(2, 20); // 20 tokens/sec
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(limiter.try_acquire());
    }
}
