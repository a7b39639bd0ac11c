//! # Circuit Breaker Configuration
//!
//! Thresholds and backoff parameters shared by every transport tracked by a
//! [`CircuitBreaker`](crate::resilience::CircuitBreaker).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on the backoff exponent
pub const MAX_BACKOFF_EXPONENT: f64 = 5.0;

/// Configuration for a circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,

    /// Number of successful calls in half-open state to close the circuit
    pub success_threshold: u32,

    /// Base time to wait in open state before probing
    pub timeout: Duration,

    /// Growth factor applied to `timeout` as failures accumulate
    pub timeout_multiplier: f64,

    /// Ceiling for the computed open-state timeout
    pub max_timeout: Duration,
}

impl CircuitBreakerConfig {
    /// Open-state timeout for a transport with `failure_count` recorded failures
    ///
    /// `min(timeout × multiplier^min(failure_count / failure_threshold, 5), max_timeout)`
    pub fn backoff_for(&self, failure_count: u32) -> Duration {
        let threshold = f64::from(self.failure_threshold.max(1));
        let exponent = (f64::from(failure_count) / threshold).min(MAX_BACKOFF_EXPONENT);
        let scaled = self.timeout.as_secs_f64() * self.timeout_multiplier.powf(exponent);

        if !scaled.is_finite() || scaled >= self.max_timeout.as_secs_f64() {
            return self.max_timeout;
        }
        Duration::from_secs_f64(scaled.max(0.0))
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".to_string());
        }

        if self.success_threshold == 0 {
            return Err("success_threshold must be greater than 0".to_string());
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        if !self.timeout_multiplier.is_finite() || self.timeout_multiplier < 1.0 {
            return Err("timeout_multiplier must be a finite value >= 1.0".to_string());
        }

        if self.max_timeout < self.timeout {
            return Err("max_timeout must not be smaller than timeout".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            timeout_multiplier: 2.0,
            max_timeout: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_config_validation() {
        let valid_config = CircuitBreakerConfig::default();
        assert!(valid_config.validate().is_ok());

        let mut invalid_config = CircuitBreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            timeout_multiplier: 0.5,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            max_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_backoff_growth_and_ceiling() {
        let config = CircuitBreakerConfig::default();

        assert_eq!(config.backoff_for(0), Duration::from_secs(30));
        assert_eq!(config.backoff_for(5), Duration::from_secs(60));
        assert_eq!(config.backoff_for(10), Duration::from_secs(120));
        assert_eq!(config.backoff_for(15), Duration::from_secs(240));
        assert_eq!(config.backoff_for(20), Duration::from_secs(300));
        assert_eq!(config.backoff_for(1_000), Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_exponent_is_capped() {
        let config = CircuitBreakerConfig {
            max_timeout: Duration::from_secs(100_000),
            ..Default::default()
        };

        // 30s × 2^5
        assert_eq!(config.backoff_for(25), Duration::from_secs(960));
        assert_eq!(config.backoff_for(500), Duration::from_secs(960));
    }
}
