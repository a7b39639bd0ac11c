//! Proptest strategies for failover properties.

use proptest::prelude::*;
use queue_failover::resilience::CircuitBreakerConfig;
use std::time::Duration;

/// Valid circuit breaker configurations
pub fn breaker_config_strategy() -> impl Strategy<Value = CircuitBreakerConfig> {
    (1u32..20, 1u32..5, 1u64..120, 1.0f64..4.0, 0u64..3600).prop_map(
        |(failure_threshold, success_threshold, timeout, multiplier, headroom)| {
            CircuitBreakerConfig {
                failure_threshold,
                success_threshold,
                timeout: Duration::from_secs(timeout),
                timeout_multiplier: multiplier,
                max_timeout: Duration::from_secs(timeout + headroom),
            }
        },
    )
}

/// Distinct transport names, between `min` and `max` of them
pub fn transport_names_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z][a-z0-9_]{0,11}", min..=max)
        .prop_map(|names| names.into_iter().collect())
}
