// Egress pacing for the driver: the engine decides which packet goes next,
// the bucket decides when.

use std::time::Instant;

pub trait TokenBucketLimiter {
    fn can_spend(&mut self, cost: usize) -> bool;
    fn consume(&mut self, cost: usize) -> bool;
}

#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    rate: f64,     // bytes per second
    capacity: f64, // burst
    last_update: Instant,
}

impl TokenBucket {
    pub fn new(rate_bytes_per_sec: f64, burst_bytes: f64) -> Self {
        Self::starting_at(rate_bytes_per_sec, burst_bytes, Instant::now())
    }

    fn starting_at(rate_bytes_per_sec: f64, burst_bytes: f64, now: Instant) -> Self {
        Self {
            tokens: burst_bytes, // starts full
            rate: rate_bytes_per_sec,
            capacity: burst_bytes,
            last_update: now,
        }
    }

    pub fn from_kbit(rate_kbit: u64, burst_bytes: usize) -> Self {
        Self::new(rate_kbit as f64 * 1000.0 / 8.0, burst_bytes as f64)
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    fn refill_at(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        if elapsed > 0.0001 {
            self.tokens = (self.tokens + self.rate * elapsed).min(self.capacity);
            self.last_update = now;
        }
    }

    fn refill(&mut self) {
        self.refill_at(Instant::now());
    }
}

impl TokenBucketLimiter for TokenBucket {
    fn consume(&mut self, cost: usize) -> bool {
        self.refill();
        let cost = cost as f64;
        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }

    fn can_spend(&mut self, cost: usize) -> bool {
        self.refill();
        self.tokens >= cost as f64
    }
}

/// Never limits; used when no egress rate is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

impl TokenBucketLimiter for Unlimited {
    fn can_spend(&mut self, _cost: usize) -> bool {
        true
    }

    fn consume(&mut self, _cost: usize) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn burst_caps_spending() {
        let mut bucket = TokenBucket::new(0.0, 1500.0);
        assert!(bucket.can_spend(1500));
        assert!(!bucket.can_spend(1501));
        assert!(bucket.consume(1000));
        assert!(!bucket.consume(1000));
        assert!(bucket.consume(500));
    }

    #[test]
    fn refills_at_rate_up_to_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::starting_at(1000.0, 2000.0, start);
        bucket.tokens = 0.0;

        bucket.refill_at(start + Duration::from_millis(500));
        assert!((bucket.tokens() - 500.0).abs() < 1e-6);

        bucket.refill_at(start + Duration::from_secs(10));
        assert_eq!(bucket.tokens(), 2000.0);
    }

    #[test]
    fn kbit_conversion() {
        let bucket = TokenBucket::from_kbit(8, 100);
        assert_eq!(bucket.rate, 1000.0);
        assert_eq!(bucket.tokens(), 100.0);
    }

    #[test]
    fn unlimited_always_allows() {
        let mut u = Unlimited;
        assert!(u.can_spend(usize::MAX));
        assert!(u.consume(usize::MAX));
    }
}
