//! Token-bucket rate limiter (spec §4.10), ported from
//! `original_source/src/mcp/utils/rate_limiter.py::RateLimiter`. Buckets are
//! kept in a `DashMap` rather than a mutex-guarded dict, matching the
//! concurrent-map pattern the pack's `agenticlaw-*` crates use for
//! per-client state.

use std::time::Instant;

use dashmap::DashMap;

struct Bucket {
    tokens: f64,
    last_update: Instant,
}

pub struct RateLimiter {
    requests_per_minute: f64,
    burst_size: f64,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, burst_size: u32) -> Self {
        Self {
            requests_per_minute: f64::from(requests_per_minute),
            burst_size: f64::from(burst_size),
            buckets: DashMap::new(),
        }
    }

    fn refill(&self, client_id: &str) -> f64 {
        let now = Instant::now();
        let refill_rate = self.requests_per_minute / 60.0;

        let mut entry = self
            .buckets
            .entry(client_id.to_string())
            .or_insert_with(|| Bucket { tokens: self.burst_size, last_update: now });

        let elapsed = now.duration_since(entry.last_update).as_secs_f64();
        let tokens = (entry.tokens + elapsed * refill_rate).min(self.burst_size);
        entry.tokens = tokens;
        entry.last_update = now;
        tokens
    }

    /// Checks whether `client_id` may make a request, consuming a token if so.
    pub fn allow(&self, client_id: &str) -> bool {
        let tokens = self.refill(client_id);
        if tokens >= 1.0 {
            if let Some(mut bucket) = self.buckets.get_mut(client_id) {
                bucket.tokens = tokens - 1.0;
            }
            true
        } else {
            false
        }
    }

    /// Seconds until `client_id`'s next token is available; `0` if one is
    /// already available.
    pub fn retry_after_secs(&self, client_id: &str) -> f64 {
        let tokens = self.buckets.get(client_id).map_or(self.burst_size, |b| b.tokens);
        if tokens >= 1.0 {
            return 0.0;
        }
        let refill_rate = self.requests_per_minute / 60.0;
        (1.0 - tokens) / refill_rate
    }

    /// Remaining whole tokens for `client_id`, refilling first.
    pub fn remaining(&self, client_id: &str) -> u32 {
        self.refill(client_id) as u32
    }

    pub fn limit_per_minute(&self) -> u32 {
        self.requests_per_minute as u32
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(100, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_size_requests_are_all_admitted() {
        let limiter = RateLimiter::new(100, 10);
        for _ in 0..10 {
            assert!(limiter.allow("client-a"));
        }
        assert!(!limiter.allow("client-a"));
    }

    #[test]
    fn distinct_clients_have_independent_buckets() {
        let limiter = RateLimiter::new(60, 1);
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[test]
    fn retry_after_is_zero_when_tokens_available() {
        let limiter = RateLimiter::new(60, 5);
        assert_eq!(limiter.retry_after_secs("c"), 0.0);
    }

    #[test]
    fn retry_after_is_positive_once_exhausted() {
        let limiter = RateLimiter::new(60, 1);
        assert!(limiter.allow("d"));
        assert!(limiter.retry_after_secs("d") > 0.0);
    }
}
