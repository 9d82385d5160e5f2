use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Raised by `allow_call` while the breaker is open and still inside its
/// recovery window. Classified as transient by the provider driver's retry
/// predicate.
#[derive(Debug, thiserror::Error)]
#[error("circuit is open")]
pub struct CircuitOpen;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u32,
    opened_at: Option<Instant>,
}

/// Counter-based breaker, one per provider. Mutated from any worker task;
/// the mutex serializes the transitions.
///
/// CLOSED: each `on_failure` increments; at the threshold, trips OPEN.
/// OPEN: `allow_call` before `opened_at + recovery_timeout` raises
/// [`CircuitOpen`]; after, transitions HALF_OPEN and admits one call.
/// HALF_OPEN: the next `on_failure` trips back OPEN; `on_success` resets
/// CLOSED with the counter at zero.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                opened_at: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        if inner.state == CircuitState::Open && self.can_half_open(&inner) {
            inner.state = CircuitState::HalfOpen;
        }
        inner.state
    }

    pub fn allow_call(&self) -> Result<(), CircuitOpen> {
        let mut inner = self.lock();
        if inner.state == CircuitState::Open {
            if !self.can_half_open(&inner) {
                return Err(CircuitOpen);
            }
            inner.state = CircuitState::HalfOpen;
        }
        Ok(())
    }

    pub fn on_success(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.opened_at = None;
    }

    pub fn on_failure(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            Self::trip_open(&mut inner);
            return;
        }
        inner.failures += 1;
        if inner.failures >= self.config.failure_threshold {
            Self::trip_open(&mut inner);
        }
    }

    fn trip_open(inner: &mut BreakerInner) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
    }

    fn can_half_open(&self, inner: &BreakerInner) -> bool {
        match inner.opened_at {
            Some(opened_at) => opened_at.elapsed() >= self.config.recovery_timeout,
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        // Breaker state is plain data; a poisoned lock means a panic mid
        // transition, where continuing with the last-written state is safe.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
