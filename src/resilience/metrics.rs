//! # Circuit Breaker Metrics
//!
//! Point-in-time snapshots of per-transport circuit breaker state. These are
//! the diagnostics surfaced to operators; they never feed back into routing.

use crate::resilience::CircuitState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Below this many lifetime calls a closed transport is assumed healthy
const MIN_CALLS_FOR_RATE: u64 = 10;

/// Snapshot of the circuit breaker for a single transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Transport name
    pub transport: String,

    /// Current circuit state
    pub current_state: CircuitState,

    /// Failures counted in the current state
    pub failure_count: u32,

    /// Successes counted in the current state
    pub success_count: u32,

    /// Successes recorded over the breaker's lifetime
    pub total_successes: u64,

    /// Failures recorded over the breaker's lifetime
    pub total_failures: u64,

    /// Lifetime failure rate (0.0 to 1.0)
    pub failure_rate: f64,

    /// Text of the most recently recorded error
    pub last_error: Option<String>,

    /// Open-state timeout that currently applies
    pub current_timeout: Duration,

    /// Time since the last state transition
    pub time_in_state: Duration,
}

impl CircuitBreakerMetrics {
    /// Total calls recorded over the breaker's lifetime
    pub fn total_calls(&self) -> u64 {
        self.total_successes + self.total_failures
    }

    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Closed => {
                self.total_calls() < MIN_CALLS_FOR_RATE || self.failure_rate < 0.1
            }
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
        }
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.current_state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Skipped until timeout",
            CircuitState::HalfOpen => "Recovering - Probing transport",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "{}: {} | Calls: {} | Failure rate: {:.1}% | Timeout: {}s",
            self.transport,
            self.state_description(),
            self.total_calls(),
            self.failure_rate * 100.0,
            self.current_timeout.as_secs()
        )
    }
}

/// Snapshot of every transport known to a circuit breaker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerReport {
    /// Metrics per transport name
    pub transports: BTreeMap<String, CircuitBreakerMetrics>,
}

impl CircuitBreakerReport {
    /// Get count of transports by state
    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();

        for metrics in self.transports.values() {
            *counts.entry(metrics.current_state).or_insert(0) += 1;
        }

        counts
    }

    /// Transports whose breaker is not healthy
    pub fn unhealthy_transports(&self) -> Vec<&str> {
        self.transports
            .values()
            .filter(|metrics| !metrics.is_healthy())
            .map(|metrics| metrics.transport.as_str())
            .collect()
    }

    /// Fraction of healthy transports (0.0 to 1.0)
    pub fn health_score(&self) -> f64 {
        if self.transports.is_empty() {
            return 1.0;
        }

        let healthy = self
            .transports
            .values()
            .filter(|metrics| metrics.is_healthy())
            .count();

        healthy as f64 / self.transports.len() as f64
    }

    /// Format summary for logging
    pub fn format_summary(&self) -> String {
        let counts = self.count_by_state();
        let closed = counts.get(&CircuitState::Closed).copied().unwrap_or(0);
        let open = counts.get(&CircuitState::Open).copied().unwrap_or(0);
        let half_open = counts.get(&CircuitState::HalfOpen).copied().unwrap_or(0);

        format!(
            "Transports: {} total | {} closed | {} open | {} half-open | Health: {:.1}%",
            self.transports.len(),
            closed,
            open,
            half_open,
            self.health_score() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(name: &str, state: CircuitState, successes: u64, failures: u64) -> CircuitBreakerMetrics {
        let total = successes + failures;
        CircuitBreakerMetrics {
            transport: name.to_string(),
            current_state: state,
            failure_count: 0,
            success_count: 0,
            total_successes: successes,
            total_failures: failures,
            failure_rate: if total == 0 {
                0.0
            } else {
                failures as f64 / total as f64
            },
            last_error: None,
            current_timeout: Duration::from_secs(30),
            time_in_state: Duration::ZERO,
        }
    }

    #[test]
    fn test_health_by_state() {
        assert!(metrics("a", CircuitState::Closed, 3, 2).is_healthy());
        assert!(!metrics("a", CircuitState::Closed, 50, 50).is_healthy());
        assert!(!metrics("a", CircuitState::Open, 0, 0).is_healthy());
        assert!(metrics("a", CircuitState::HalfOpen, 0, 10).is_healthy());
    }

    #[test]
    fn test_report_aggregation() {
        let mut report = CircuitBreakerReport::default();
        assert_eq!(report.health_score(), 1.0);

        for m in [
            metrics("primary", CircuitState::Open, 0, 5),
            metrics("secondary", CircuitState::Closed, 10, 0),
        ] {
            report.transports.insert(m.transport.clone(), m);
        }

        assert_eq!(report.unhealthy_transports(), vec!["primary"]);
        assert_eq!(report.health_score(), 0.5);
        assert_eq!(report.count_by_state().get(&CircuitState::Open), Some(&1));

        let summary = report.format_summary();
        assert!(summary.contains("2 total"));
        assert!(summary.contains("1 open"));
    }
}
