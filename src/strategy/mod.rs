//! # Consumption Strategies
//!
//! Pluggable algorithms that decide which transport the receiver polls next.
//! A strategy sees the ordered transport names and the circuit breaker, and
//! gets latency/outcome feedback after every poll so it can adapt.
//!
//! ```text
//! ConsumptionStrategy (trait)
//!   ├── RoundRobin            <- rotate through available transports
//!   ├── WeightedRoundRobin    <- slots proportional to success rate
//!   ├── AdaptivePriority      <- latency/success score, weighted pick among the top 3
//!   └── LatencyAware          <- lowest EWMA latency wins
//! ```

pub mod adaptive_priority;
pub mod latency_aware;
pub mod random;
pub mod round_robin;
pub mod weighted_round_robin;

pub use adaptive_priority::AdaptivePriorityStrategy;
pub use latency_aware::LatencyAwareStrategy;
pub use random::{pick_weighted, shuffle, RandomSource, SeededRandom, ThreadRandom};
pub use round_robin::RoundRobinStrategy;
pub use weighted_round_robin::WeightedRoundRobinStrategy;

use crate::error::FailoverError;
use crate::resilience::{CircuitBreaker, Clock};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Transport selection algorithm for the receive path
pub trait ConsumptionStrategy: Send + Sync + Debug {
    /// Configuration name of the strategy
    fn name(&self) -> &'static str;

    /// Pick the next transport to poll among `transports`, or `None` when
    /// the circuit breaker reports every one of them unavailable
    fn select(&self, transports: &[String], circuit_breaker: &CircuitBreaker) -> Option<String>;

    /// Feed back the outcome of polling `transport`
    fn record_result(&self, transport: &str, success: bool, latency: Duration);
}

/// Names accepted for `consumption_strategy`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionStrategyKind {
    #[default]
    RoundRobin,
    WeightedRoundRobin,
    AdaptivePriority,
    LatencyAware,
}

impl ConsumptionStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::WeightedRoundRobin => "weighted_round_robin",
            Self::AdaptivePriority => "adaptive_priority",
            Self::LatencyAware => "latency_aware",
        }
    }
}

impl fmt::Display for ConsumptionStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsumptionStrategyKind {
    type Err = FailoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "round_robin" => Ok(Self::RoundRobin),
            "weighted_round_robin" => Ok(Self::WeightedRoundRobin),
            "adaptive_priority" => Ok(Self::AdaptivePriority),
            "latency_aware" => Ok(Self::LatencyAware),
            other => Err(FailoverError::configuration(
                "consumption_strategy",
                format!(
                    "unknown strategy '{other}', expected one of: round_robin, \
                     weighted_round_robin, adaptive_priority, latency_aware"
                ),
            )),
        }
    }
}

/// Strategy-specific tuning; each strategy reads only its own fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyOptions {
    /// Samples kept per transport by adaptive_priority
    pub window_size: usize,

    /// Weight of the latency score in adaptive_priority
    pub latency_weight: f64,

    /// Weight of the success score in adaptive_priority
    pub success_weight: f64,

    /// Minimum spacing between successful samples folded in by latency_aware
    pub measurement_interval_ms: u64,

    /// Latency considered slow by latency_aware; failures count as twice this
    pub latency_threshold_ms: u64,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self {
            window_size: 10,
            latency_weight: 0.7,
            success_weight: 0.3,
            measurement_interval_ms: 0,
            latency_threshold_ms: 1000,
        }
    }
}

impl StrategyOptions {
    pub fn measurement_interval(&self) -> Duration {
        Duration::from_millis(self.measurement_interval_ms)
    }

    pub fn latency_threshold(&self) -> Duration {
        Duration::from_millis(self.latency_threshold_ms)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be greater than 0".to_string());
        }

        let weights_valid = self.latency_weight.is_finite()
            && self.success_weight.is_finite()
            && self.latency_weight >= 0.0
            && self.success_weight >= 0.0;
        if !weights_valid || self.latency_weight + self.success_weight <= 0.0 {
            return Err(
                "latency_weight and success_weight must be non-negative and not both zero"
                    .to_string(),
            );
        }

        if self.latency_threshold_ms == 0 {
            return Err("latency_threshold_ms must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Construct the strategy named by `kind`
pub fn build_strategy(
    kind: ConsumptionStrategyKind,
    options: &StrategyOptions,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
) -> Arc<dyn ConsumptionStrategy> {
    match kind {
        ConsumptionStrategyKind::RoundRobin => Arc::new(RoundRobinStrategy::new()),
        ConsumptionStrategyKind::WeightedRoundRobin => {
            Arc::new(WeightedRoundRobinStrategy::new(random))
        }
        ConsumptionStrategyKind::AdaptivePriority => {
            Arc::new(AdaptivePriorityStrategy::new(options, clock, random))
        }
        ConsumptionStrategyKind::LatencyAware => {
            Arc::new(LatencyAwareStrategy::new(options, clock))
        }
    }
}

/// Breaker that opens on the first failure and never reopens on its own
#[cfg(test)]
pub(crate) fn open_on_first_failure() -> CircuitBreaker {
    use crate::resilience::{CircuitBreakerConfig, ManualClock};

    let config = CircuitBreakerConfig {
        failure_threshold: 1,
        ..CircuitBreakerConfig::default()
    };
    CircuitBreaker::new(config, Arc::new(ManualClock::new()))
}

/// Trip the breaker for `name`
#[cfg(test)]
pub(crate) fn trip(breaker: &CircuitBreaker, name: &str) {
    let error = crate::messaging::MessagingError::queue_unavailable(name);
    breaker.record_failure(name, &error);
}

#[cfg(test)]
pub(crate) fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::SystemClock;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(
            "latency_aware".parse::<ConsumptionStrategyKind>().unwrap(),
            ConsumptionStrategyKind::LatencyAware
        );
        assert_eq!(
            " weighted_round_robin ".parse::<ConsumptionStrategyKind>().unwrap(),
            ConsumptionStrategyKind::WeightedRoundRobin
        );

        let err = "fastest".parse::<ConsumptionStrategyKind>().unwrap_err();
        assert!(matches!(err, FailoverError::Configuration { .. }));
        assert!(err.to_string().contains("fastest"));
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&ConsumptionStrategyKind::AdaptivePriority).unwrap();
        assert_eq!(json, "\"adaptive_priority\"");
        assert_eq!(ConsumptionStrategyKind::default().to_string(), "round_robin");
    }

    #[test]
    fn test_options_validation() {
        assert!(StrategyOptions::default().validate().is_ok());

        let zero_window = StrategyOptions {
            window_size: 0,
            ..Default::default()
        };
        assert!(zero_window.validate().is_err());

        let no_weights = StrategyOptions {
            latency_weight: 0.0,
            success_weight: 0.0,
            ..Default::default()
        };
        assert!(no_weights.validate().is_err());
    }

    #[test]
    fn test_build_strategy_names() {
        let options = StrategyOptions::default();
        for kind in [
            ConsumptionStrategyKind::RoundRobin,
            ConsumptionStrategyKind::WeightedRoundRobin,
            ConsumptionStrategyKind::AdaptivePriority,
            ConsumptionStrategyKind::LatencyAware,
        ] {
            let strategy = build_strategy(
                kind,
                &options,
                Arc::new(SystemClock),
                Arc::new(ThreadRandom),
            );
            assert_eq!(strategy.name(), kind.as_str());
        }
    }
}
