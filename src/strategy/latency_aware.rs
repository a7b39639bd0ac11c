//! Latency-aware consumption strategy.
//!
//! Tracks an exponentially weighted moving average of poll latency per
//! transport and always picks the fastest available one. Transports without
//! history average 0 ms, so new or recovered transports are tried first.

use super::{ConsumptionStrategy, StrategyOptions};
use crate::resilience::{CircuitBreaker, Clock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// EWMA smoothing factor
pub const SMOOTHING_FACTOR: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
struct LatencyStats {
    ewma_ms: f64,
    last_measured: Instant,
}

/// Lowest average latency wins
#[derive(Debug)]
pub struct LatencyAwareStrategy {
    latency_threshold: Duration,
    measurement_interval: Duration,
    clock: Arc<dyn Clock>,
    stats: Mutex<HashMap<String, LatencyStats>>,
}

impl LatencyAwareStrategy {
    pub fn new(options: &StrategyOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            latency_threshold: options.latency_threshold(),
            measurement_interval: options.measurement_interval(),
            clock,
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Current moving average for `transport`, `None` without history
    pub fn average_latency(&self, transport: &str) -> Option<Duration> {
        self.stats
            .lock()
            .get(transport)
            .map(|s| Duration::from_secs_f64(s.ewma_ms.max(0.0) / 1000.0))
    }

    fn penalty_ms(&self) -> f64 {
        self.latency_threshold.as_secs_f64() * 1000.0 * 2.0
    }
}

impl ConsumptionStrategy for LatencyAwareStrategy {
    fn name(&self) -> &'static str {
        "latency_aware"
    }

    fn select(&self, transports: &[String], circuit_breaker: &CircuitBreaker) -> Option<String> {
        let stats = self.stats.lock();
        let mut best: Option<(&String, f64)> = None;

        for name in transports {
            if !circuit_breaker.is_available(name) {
                continue;
            }
            let ewma = stats.get(name.as_str()).map_or(0.0, |s| s.ewma_ms);
            // Strict comparison keeps the earliest registered transport on ties
            if best.map_or(true, |(_, current)| ewma < current) {
                best = Some((name, ewma));
            }
        }

        best.map(|(name, _)| name.clone())
    }

    fn record_result(&self, transport: &str, success: bool, latency: Duration) {
        let now = self.clock.now();
        let mut stats = self.stats.lock();

        if success && !self.measurement_interval.is_zero() {
            if let Some(existing) = stats.get(transport) {
                if now.saturating_duration_since(existing.last_measured) < self.measurement_interval
                {
                    return;
                }
            }
        }

        let sample_ms = if success {
            latency.as_secs_f64() * 1000.0
        } else {
            self.penalty_ms()
        };

        stats
            .entry(transport.to_string())
            .and_modify(|s| {
                s.ewma_ms = SMOOTHING_FACTOR * sample_ms + (1.0 - SMOOTHING_FACTOR) * s.ewma_ms;
                s.last_measured = now;
            })
            .or_insert(LatencyStats {
                ewma_ms: sample_ms,
                last_measured: now,
            });
    }
}
