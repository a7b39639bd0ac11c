//! Weighted round-robin consumption strategy.
//!
//! Each transport gets a number of slots proportional to its success rate.
//! The slot list is shuffled on every rebalance so heavy transports are
//! interleaved rather than polled in long runs.

use super::random::{shuffle, RandomSource};
use super::ConsumptionStrategy;
use crate::resilience::CircuitBreaker;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Recorded outcomes between two rebalances
pub const REBALANCE_INTERVAL: u64 = 100;

/// Weight of a transport with no recorded outcomes
pub const DEFAULT_WEIGHT: u32 = 50;

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    successes: u64,
    failures: u64,
}

impl Tally {
    fn weight(&self) -> u32 {
        let total = self.successes + self.failures;
        if total == 0 {
            return DEFAULT_WEIGHT;
        }
        (self.successes as f64 / total as f64 * 100.0).round() as u32
    }
}

#[derive(Debug)]
struct WeightedState {
    tallies: HashMap<String, Tally>,
    slots: Vec<String>,
    cursor: usize,
    outcomes_since_rebalance: u64,
    rebalance_pending: bool,
    built_for: Vec<String>,
}

/// Round robin over a shuffled list of success-weighted slots
#[derive(Debug)]
pub struct WeightedRoundRobinStrategy {
    random: Arc<dyn RandomSource>,
    state: Mutex<WeightedState>,
}

impl WeightedRoundRobinStrategy {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self {
            random,
            state: Mutex::new(WeightedState {
                tallies: HashMap::new(),
                slots: Vec::new(),
                cursor: 0,
                outcomes_since_rebalance: 0,
                rebalance_pending: true,
                built_for: Vec::new(),
            }),
        }
    }

    /// Current weight of `transport` (0 to 100)
    pub fn weight(&self, transport: &str) -> u32 {
        self.state
            .lock()
            .tallies
            .get(transport)
            .map_or(DEFAULT_WEIGHT, Tally::weight)
    }

    /// Force the slot list to be rebuilt on the next selection
    pub fn request_rebalance(&self) {
        self.state.lock().rebalance_pending = true;
    }

    fn rebalance(&self, state: &mut WeightedState, transports: &[String]) {
        let mut slots = Vec::new();
        for name in transports {
            let weight = state.tallies.get(name).map_or(DEFAULT_WEIGHT, Tally::weight);
            let count = (weight / 10).max(1) as usize;
            slots.extend(std::iter::repeat(name.clone()).take(count));
        }
        shuffle(&mut slots, self.random.as_ref());

        debug!(
            transports = transports.len(),
            slots = slots.len(),
            "Rebalanced weighted round-robin slots"
        );

        state.slots = slots;
        state.cursor = 0;
        state.rebalance_pending = false;
        state.built_for = transports.to_vec();
    }
}

impl ConsumptionStrategy for WeightedRoundRobinStrategy {
    fn name(&self) -> &'static str {
        "weighted_round_robin"
    }

    fn select(&self, transports: &[String], circuit_breaker: &CircuitBreaker) -> Option<String> {
        if transports.is_empty() {
            return None;
        }

        let mut state = self.state.lock();
        if state.rebalance_pending || state.built_for != transports {
            self.rebalance(&mut state, transports);
        }

        let len = state.slots.len();
        let start = state.cursor % len;
        for offset in 0..len {
            let index = (start + offset) % len;
            if circuit_breaker.is_available(&state.slots[index]) {
                state.cursor = (index + 1) % len;
                return Some(state.slots[index].clone());
            }
        }
        None
    }

    fn record_result(&self, transport: &str, success: bool, _latency: Duration) {
        let mut state = self.state.lock();
        let tally = state.tallies.entry(transport.to_string()).or_default();
        if success {
            tally.successes += 1;
        } else {
            tally.failures += 1;
        }

        state.outcomes_since_rebalance += 1;
        if state.outcomes_since_rebalance >= REBALANCE_INTERVAL {
            state.outcomes_since_rebalance = 0;
            state.rebalance_pending = true;
        }
    }
}
