//! # Circuit Breaker Implementation
//!
//! Per-transport health tracking for the failover layer. Each transport name
//! owns an independent three-state machine: Closed (normal operation), Open
//! (skipped until its backoff timeout elapses) and Half-Open (probing recovery).
//!
//! Unlike a call-wrapping breaker, this one is purely advisory: callers ask
//! [`CircuitBreaker::is_available`] before trying a transport and report the
//! outcome through [`CircuitBreaker::record_success`] and
//! [`CircuitBreaker::record_failure`]. The Open to Half-Open transition happens
//! as a side effect of those availability checks; there is no separate probe.

use crate::messaging::MessagingError;
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics, CircuitBreakerReport, Clock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - the transport is tried
    Closed,
    /// Failure mode - the transport is skipped until the backoff elapses
    Open,
    /// Testing recovery - trial calls decide between Closed and Open
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(label)
    }
}

/// Mutable state for one transport name
#[derive(Debug, Clone)]
struct TransportHealth {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_state_change: Instant,
    total_successes: u64,
    total_failures: u64,
    last_error: Option<String>,
}

impl TransportHealth {
    fn new(now: Instant) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_state_change: now,
            total_successes: 0,
            total_failures: 0,
            last_error: None,
        }
    }

    fn transition(&mut self, to: CircuitState, now: Instant) -> CircuitState {
        let from = self.state;
        self.state = to;
        self.failure_count = 0;
        self.success_count = 0;
        self.last_state_change = now;
        from
    }
}

/// Per-transport circuit breaker shared by the sender, receiver and strategies
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    transports: Mutex<HashMap<String, TransportHealth>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration and time source
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            timeout_seconds = config.timeout.as_secs(),
            max_timeout_seconds = config.max_timeout.as_secs(),
            "Circuit breaker initialized"
        );

        Self {
            config,
            clock,
            transports: Mutex::new(HashMap::new()),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Whether `name` may be tried right now
    ///
    /// Closed and Half-Open transports are always available. An Open transport
    /// becomes available once its backoff timeout has elapsed, moving it to
    /// Half-Open as part of this check.
    pub fn is_available(&self, name: &str) -> bool {
        let now = self.clock.now();
        let mut transports = self.transports.lock();
        let health = Self::entry(&mut transports, name, now);
        self.promote_if_elapsed(name, health, now) != CircuitState::Open
    }

    /// Current state of `name`, with the same Open to Half-Open promotion as
    /// [`CircuitBreaker::is_available`]
    pub fn state(&self, name: &str) -> CircuitState {
        let now = self.clock.now();
        let mut transports = self.transports.lock();
        let health = Self::entry(&mut transports, name, now);
        self.promote_if_elapsed(name, health, now)
    }

    /// Record a successful call to `name`
    pub fn record_success(&self, name: &str) {
        let now = self.clock.now();
        let mut transports = self.transports.lock();
        let health = Self::entry(&mut transports, name, now);
        health.total_successes += 1;

        match health.state {
            CircuitState::HalfOpen => {
                health.success_count += 1;
                if health.success_count >= self.config.success_threshold {
                    let from = health.transition(CircuitState::Closed, now);
                    info!(
                        transport = %name,
                        from = %from,
                        to = %CircuitState::Closed,
                        "Circuit breaker closed (recovered)"
                    );
                }
            }
            CircuitState::Closed => {
                health.failure_count = 0;
            }
            CircuitState::Open => {
                debug!(transport = %name, "Success recorded while circuit is open");
            }
        }
    }

    /// Record a failed call to `name`
    pub fn record_failure(&self, name: &str, error: &MessagingError) {
        let now = self.clock.now();
        let mut transports = self.transports.lock();
        let health = Self::entry(&mut transports, name, now);
        health.total_failures += 1;
        health.last_error = Some(error.to_string());

        match health.state {
            CircuitState::Closed => {
                health.failure_count += 1;
                if health.failure_count >= self.config.failure_threshold {
                    let failures = health.failure_count;
                    let from = health.transition(CircuitState::Open, now);
                    warn!(
                        transport = %name,
                        from = %from,
                        to = %CircuitState::Open,
                        consecutive_failures = failures,
                        timeout_seconds = self.config.backoff_for(0).as_secs(),
                        error = %error,
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                let from = health.transition(CircuitState::Open, now);
                warn!(
                    transport = %name,
                    from = %from,
                    to = %CircuitState::Open,
                    error = %error,
                    "Circuit breaker re-opened during probe"
                );
            }
            CircuitState::Open => {
                // Grows the backoff of a transport that keeps failing while open
                health.failure_count = health.failure_count.saturating_add(1);
                debug!(
                    transport = %name,
                    failure_count = health.failure_count,
                    "Failure recorded while circuit is open"
                );
            }
        }
    }

    /// Open-state timeout that currently applies to `name`
    pub fn current_timeout(&self, name: &str) -> Duration {
        let transports = self.transports.lock();
        let failure_count = transports.get(name).map_or(0, |h| h.failure_count);
        self.config.backoff_for(failure_count)
    }

    /// Snapshot of the breaker for `name`
    pub fn metrics(&self, name: &str) -> CircuitBreakerMetrics {
        let now = self.clock.now();
        let mut transports = self.transports.lock();
        let health = Self::entry(&mut transports, name, now);
        self.promote_if_elapsed(name, health, now);
        self.snapshot(name, health, now)
    }

    /// Snapshot of every transport seen so far
    pub fn report(&self) -> CircuitBreakerReport {
        let now = self.clock.now();
        let mut transports = self.transports.lock();
        let mut report = CircuitBreakerReport::default();

        for (name, health) in transports.iter_mut() {
            self.promote_if_elapsed(name, health, now);
            report
                .transports
                .insert(name.clone(), self.snapshot(name, health, now));
        }

        report
    }

    /// Force `name` open (for emergency situations)
    pub fn force_open(&self, name: &str) {
        self.force(name, CircuitState::Open);
    }

    /// Force `name` closed (for emergency recovery)
    pub fn force_closed(&self, name: &str) {
        self.force(name, CircuitState::Closed);
    }

    /// Forget everything recorded for `name`
    pub fn reset(&self, name: &str) {
        if self.transports.lock().remove(name).is_some() {
            info!(transport = %name, "Circuit breaker reset");
        }
    }

    fn force(&self, name: &str, to: CircuitState) {
        let now = self.clock.now();
        let mut transports = self.transports.lock();
        let health = Self::entry(&mut transports, name, now);
        let from = health.transition(to, now);
        warn!(transport = %name, from = %from, to = %to, "Circuit breaker state forced");
    }

    fn entry<'a>(
        transports: &'a mut HashMap<String, TransportHealth>,
        name: &str,
        now: Instant,
    ) -> &'a mut TransportHealth {
        transports
            .entry(name.to_string())
            .or_insert_with(|| TransportHealth::new(now))
    }

    fn promote_if_elapsed(
        &self,
        name: &str,
        health: &mut TransportHealth,
        now: Instant,
    ) -> CircuitState {
        if health.state == CircuitState::Open {
            let timeout = self.config.backoff_for(health.failure_count);
            let elapsed = now.saturating_duration_since(health.last_state_change);
            if elapsed >= timeout {
                let from = health.transition(CircuitState::HalfOpen, now);
                info!(
                    transport = %name,
                    from = %from,
                    to = %CircuitState::HalfOpen,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Circuit breaker half-open (probing recovery)"
                );
            }
        }
        health.state
    }

    fn snapshot(&self, name: &str, health: &TransportHealth, now: Instant) -> CircuitBreakerMetrics {
        let total = health.total_successes + health.total_failures;
        let failure_rate = if total == 0 {
            0.0
        } else {
            health.total_failures as f64 / total as f64
        };

        CircuitBreakerMetrics {
            transport: name.to_string(),
            current_state: health.state,
            failure_count: health.failure_count,
            success_count: health.success_count,
            total_successes: health.total_successes,
            total_failures: health.total_failures,
            failure_rate,
            last_error: health.last_error.clone(),
            current_timeout: self.config.backoff_for(health.failure_count),
            time_in_state: now.saturating_duration_since(health.last_state_change),
        }
    }
}
