//! The circuit breaker state machine (spec §4.10): shared by the graph
//! store gateway (`neo4j_query`, threshold 5/60s) and the query translator
//! (`cypher_generation`, threshold 3/30s).
//!
//! State transitions:
//!
//! ```text
//! CLOSED    --record_failure (count == threshold)--> OPEN
//! OPEN      --elapsed >= recovery_timeout----------> HALF_OPEN
//! HALF_OPEN --record_success------------------------> CLOSED
//! HALF_OPEN --record_failure------------------------> OPEN
//! ```

use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// A named breaker guarding one external collaborator.
#[derive(Debug)]
pub struct CircuitBreaker {
    pub name: &'static str,
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            name,
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    /// Breaker for the translator's LLM call: threshold 3, recovery 30s.
    pub fn cypher_generation() -> Self {
        Self::new("cypher_generation", 3, Duration::from_secs(30))
    }

    /// Breaker for the store gateway's query call: threshold 5, recovery 60s.
    pub fn neo4j_query() -> Self {
        Self::new("neo4j_query", 5, Duration::from_secs(60))
    }

    /// Current state, lazily transitioning OPEN -> HALF_OPEN once the
    /// recovery timeout has elapsed (no background timer; checked on read,
    /// matching the original's lazy `state` property).
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::Open
            && let Some(last) = inner.last_failure
            && last.elapsed() >= self.recovery_timeout
        {
            tracing::info!(breaker = self.name, "circuit transitioning to half_open");
            inner.state = CircuitState::HalfOpen;
        }
        inner.state
    }

    /// CLOSED and HALF_OPEN both admit the call (HALF_OPEN admits exactly
    /// one probe in spirit; callers are expected to record the outcome of
    /// every admitted call so a failed probe reopens immediately).
    pub fn allow_request(&self) -> bool {
        !matches!(self.state(), CircuitState::Open)
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!(breaker = self.name, "circuit closing after success");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());
        if inner.failure_count >= self.failure_threshold {
            if inner.state != CircuitState::Open {
                tracing::warn!(
                    breaker = self.name,
                    failures = inner.failure_count,
                    "circuit open"
                );
            }
            inner.state = CircuitState::Open;
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new("test", 3, Duration::from_millis(100));
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn half_opens_after_recovery_timeout_and_closes_on_success() {
        let breaker = CircuitBreaker::new("test", 3, Duration::from_millis(50));
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        sleep(Duration::from_millis(80));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.allow_request());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new("test", 2, Duration::from_millis(30));
        breaker.record_failure();
        breaker.record_failure();
        sleep(Duration::from_millis(50));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn no_closed_to_half_open_transition() {
        let breaker = CircuitBreaker::new("test", 5, Duration::from_millis(10));
        breaker.record_failure();
        sleep(Duration::from_millis(20));
        // Only two failures recorded; never reached OPEN, so state must
        // stay CLOSED even though "recovery_timeout" has elapsed.
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
