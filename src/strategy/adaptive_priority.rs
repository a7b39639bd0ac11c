//! Adaptive priority consumption strategy.
//!
//! Scores every transport from a sliding window of recent polls, combining
//! latency and success rate, and decays the score of transports that have not
//! been used for a while. Selection is a weighted random pick among the three
//! best available transports, so the leader is favoured without starving the
//! runners-up of the traffic they need to prove themselves.

use super::random::{pick_weighted, RandomSource};
use super::{ConsumptionStrategy, StrategyOptions};
use crate::resilience::{CircuitBreaker, Clock};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Score of a transport with no samples
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Number of top-scoring transports considered for the weighted pick
pub const CANDIDATES: usize = 3;

/// Idle time after which scores start to decay
pub const DECAY_AFTER: Duration = Duration::from_secs(300);

/// Idle time over which a score decays fully (down to the floor)
pub const DECAY_SPAN: Duration = Duration::from_secs(3600);

/// Lowest fraction of the score left after decay
pub const DECAY_FLOOR: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
struct Sample {
    latency: Duration,
    success: bool,
}

#[derive(Debug, Default)]
struct TransportWindow {
    samples: VecDeque<Sample>,
    last_used: Option<Instant>,
}

/// Weighted random choice among the best-scoring transports
#[derive(Debug)]
pub struct AdaptivePriorityStrategy {
    window_size: usize,
    latency_weight: f64,
    success_weight: f64,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    windows: Mutex<HashMap<String, TransportWindow>>,
}

impl AdaptivePriorityStrategy {
    pub fn new(
        options: &StrategyOptions,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            window_size: options.window_size.max(1),
            latency_weight: options.latency_weight,
            success_weight: options.success_weight,
            clock,
            random,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Current performance score of `transport` in `[0, 100]`
    pub fn score(&self, transport: &str) -> f64 {
        let now = self.clock.now();
        let windows = self.windows.lock();
        self.score_of(windows.get(transport), now)
    }

    fn score_of(&self, window: Option<&TransportWindow>, now: Instant) -> f64 {
        let Some(window) = window.filter(|w| !w.samples.is_empty()) else {
            return NEUTRAL_SCORE;
        };

        let count = window.samples.len() as f64;
        let avg_latency_ms = window
            .samples
            .iter()
            .map(|s| s.latency.as_secs_f64() * 1000.0)
            .sum::<f64>()
            / count;
        let successes = window.samples.iter().filter(|s| s.success).count() as f64;

        let latency_score = (100.0 - avg_latency_ms / 10.0).max(0.0);
        let success_score = successes / count * 100.0;
        let score = self.latency_weight * latency_score + self.success_weight * success_score;

        (score * decay_factor(window.last_used, now)).clamp(0.0, 100.0)
    }
}

/// Multiplier applied to the score of a transport idle since `last_used`
fn decay_factor(last_used: Option<Instant>, now: Instant) -> f64 {
    let Some(last_used) = last_used else {
        return 1.0;
    };

    let idle = now.saturating_duration_since(last_used);
    if idle <= DECAY_AFTER {
        return 1.0;
    }
    (1.0 - idle.as_secs_f64() / DECAY_SPAN.as_secs_f64()).max(DECAY_FLOOR)
}

impl ConsumptionStrategy for AdaptivePriorityStrategy {
    fn name(&self) -> &'static str {
        "adaptive_priority"
    }

    fn select(&self, transports: &[String], circuit_breaker: &CircuitBreaker) -> Option<String> {
        let now = self.clock.now();
        let mut candidates: Vec<(&String, f64)> = {
            let windows = self.windows.lock();
            transports
                .iter()
                .filter(|name| circuit_breaker.is_available(name))
                .map(|name| (name, self.score_of(windows.get(name.as_str()), now)))
                .collect()
        };

        if candidates.is_empty() {
            return None;
        }

        // Stable sort keeps registration order between equal scores
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates.truncate(CANDIDATES);

        let weights: Vec<f64> = candidates.iter().map(|(_, score)| score.max(1.0)).collect();
        let index = pick_weighted(&weights, self.random.as_ref()).unwrap_or(0);
        Some(candidates[index].0.clone())
    }

    fn record_result(&self, transport: &str, success: bool, latency: Duration) {
        let now = self.clock.now();
        let mut windows = self.windows.lock();
        let window = windows.entry(transport.to_string()).or_default();

        window.samples.push_back(Sample { latency, success });
        while window.samples.len() > self.window_size {
            window.samples.pop_front();
        }
        window.last_used = Some(now);
    }
}
