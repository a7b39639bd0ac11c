//! Round-robin consumption strategy.

use super::ConsumptionStrategy;
use crate::resilience::CircuitBreaker;
use parking_lot::Mutex;
use std::time::Duration;

/// Rotates through transports in registration order, skipping unavailable ones
#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    cursor: Mutex<usize>,
}

impl RoundRobinStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsumptionStrategy for RoundRobinStrategy {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn select(&self, transports: &[String], circuit_breaker: &CircuitBreaker) -> Option<String> {
        if transports.is_empty() {
            return None;
        }

        let mut cursor = self.cursor.lock();
        let len = transports.len();
        let start = *cursor % len;

        for offset in 0..len {
            let index = (start + offset) % len;
            let name = &transports[index];
            if circuit_breaker.is_available(name) {
                *cursor = (index + 1) % len;
                return Some(name.clone());
            }
        }
        None
    }

    fn record_result(&self, _transport: &str, _success: bool, _latency: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{names, open_on_first_failure, trip};

    #[test]
    fn test_round_robin_rotation() {
        let strategy = RoundRobinStrategy::new();
        let breaker = open_on_first_failure();
        let transports = names(&["a", "b", "c"]);

        let picks: Vec<_> = (0..6)
            .filter_map(|_| strategy.select(&transports, &breaker))
            .collect();
        assert_eq!(picks, names(&["a", "b", "c", "a", "b", "c"]));
    }

    #[test]
    fn test_round_robin_skips_unavailable() {
        let strategy = RoundRobinStrategy::new();
        let breaker = open_on_first_failure();
        let transports = names(&["a", "b", "c"]);
        trip(&breaker, "b");

        let picks: Vec<_> = (0..4)
            .filter_map(|_| strategy.select(&transports, &breaker))
            .collect();
        assert_eq!(picks, names(&["a", "c", "a", "c"]));
    }

    #[test]
    fn test_round_robin_none_when_all_unavailable() {
        let strategy = RoundRobinStrategy::new();
        let breaker = open_on_first_failure();
        let transports = names(&["a", "b"]);
        trip(&breaker, "a");
        trip(&breaker, "b");

        assert_eq!(strategy.select(&transports, &breaker), None);
        assert_eq!(strategy.select(&[], &breaker), None);
    }
}
