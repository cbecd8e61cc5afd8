use std::time::Duration;
use tokio::time::Instant;

/// Continuous-refill token bucket
///
/// Tokens accrue at `rate` per second up to `burst`; one request costs one
/// token. Refill is computed lazily from the elapsed time on each call.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    rate: f64,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket holding `burst` tokens
    pub fn full(rate: f64, burst: u32, now: Instant) -> Self {
        Self {
            rate,
            burst: f64::from(burst),
            tokens: f64::from(burst),
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        self.last_refill = now;
    }

    /// Take one token if available; nothing is consumed on refusal
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens left as of the last refill
    pub fn available(&self) -> u32 {
        self.tokens.max(0.0).floor() as u32
    }

    /// Time until the next token accrues, saturating at [`Duration::MAX`]
    pub fn retry_after(&self) -> Duration {
        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64((1.0 - self.tokens) / self.rate).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_bucket_drains_to_zero() {
        let now = Instant::now();
        let mut bucket = TokenBucket::full(1.0, 3, now);

        assert!(bucket.try_acquire(now));
        assert!(bucket.try_acquire(now));
        assert!(bucket.try_acquire(now));
        assert!(!bucket.try_acquire(now));
        assert_eq!(bucket.available(), 0);
    }

    #[test]
    fn test_refill_is_capped_at_burst() {
        let now = Instant::now();
        let mut bucket = TokenBucket::full(10.0, 2, now);

        assert!(bucket.try_acquire(now));
        assert!(bucket.try_acquire(now + Duration::from_secs(60)));
        assert_eq!(bucket.available(), 1);
    }

    #[test]
    fn test_retry_after_reflects_deficit() {
        let now = Instant::now();
        let mut bucket = TokenBucket::full(2.0, 1, now);

        assert_eq!(bucket.retry_after(), Duration::ZERO);
        assert!(bucket.try_acquire(now));
        assert_eq!(bucket.retry_after(), Duration::from_millis(500));

        // A refused request leaves the deficit untouched
        assert!(!bucket.try_acquire(now));
        assert_eq!(bucket.retry_after(), Duration::from_millis(500));
    }

    #[test]
    fn test_retry_after_saturates_for_tiny_rate() {
        let now = Instant::now();
        let mut bucket = TokenBucket::full(1e-20, 1, now);

        assert!(bucket.try_acquire(now));
        assert!(!bucket.try_acquire(now));
        assert_eq!(bucket.retry_after(), Duration::MAX);
    }
}
