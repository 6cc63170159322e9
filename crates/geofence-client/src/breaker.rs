//! Circuit breaker guarding the upstream routing provider
//!
//! ```text
//! CLOSED --(failure_threshold failures)--> OPEN
//! OPEN   --(cooldown elapsed, next call)--> HALF_OPEN (one trial call)
//! HALF_OPEN --(trial succeeds)--> CLOSED, failures reset
//! HALF_OPEN --(trial fails)-----> OPEN, cooldown restarts
//! ```
//!
//! One breaker is shared by every caller of a client: it reflects the
//! health of the single upstream, not of any one request.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn gauge_value(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

/// Point-in-time view of the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_at: None,
            }),
        }
    }

    /// Ask permission to call upstream.
    ///
    /// Returns the remaining cooldown when the call must be rejected.
    pub fn acquire(&self) -> Result<CallPermit<'_>, Duration> {
        self.acquire_at(Instant::now())
    }

    fn acquire_at(&self, now: Instant) -> Result<CallPermit<'_>, Duration> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(self, false)),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or(Duration::MAX);
                if elapsed > self.cooldown {
                    inner.state = CircuitState::HalfOpen;
                    set_state_gauge(CircuitState::HalfOpen);
                    tracing::info!("Circuit half-open, admitting trial call");
                    Ok(CallPermit::new(self, true))
                } else {
                    Err(self.cooldown - elapsed)
                }
            }
            // The state is only held while its single trial is in flight
            CircuitState::HalfOpen => Err(Duration::ZERO),
        }
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.inner.lock();
        CircuitSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.inner.lock();
        if trial || inner.state != CircuitState::Closed {
            tracing::info!("Circuit closed");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        set_state_gauge(CircuitState::Closed);
    }

    fn on_failure(&self, trial: bool, now: Instant) {
        let mut inner = self.inner.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure_at = Some(now);

        let should_open = trial || inner.failure_count >= self.failure_threshold;
        if should_open && inner.state != CircuitState::Open {
            tracing::warn!(
                failures = inner.failure_count,
                cooldown_secs = self.cooldown.as_secs_f64(),
                "Circuit opened"
            );
            inner.state = CircuitState::Open;
            set_state_gauge(CircuitState::Open);
        }
    }

    fn on_abandoned(&self, trial: bool) {
        if !trial {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            set_state_gauge(CircuitState::Open);
        }
    }
}

fn set_state_gauge(state: CircuitState) {
    metrics::gauge!("geofence_circuit_state").set(state.gauge_value());
}

/// Admission to make one upstream call.
///
/// Settle it with [`CallPermit::success`] or [`CallPermit::failure`]. A trial
/// permit dropped unsettled (the caller was cancelled) reopens the circuit
/// without restarting the cooldown.
#[must_use]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    pub fn failure(self) {
        self.failure_at(Instant::now());
    }

    fn failure_at(mut self, now: Instant) {
        self.settled = true;
        self.breaker.on_failure(self.trial, now);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned(self.trial);
        }
    }
}
