#![allow(dead_code)]

pub mod scripted_transport;
pub mod strategies;

pub use scripted_transport::*;

use queue_failover::failover::{FailoverTransport, FailoverTransportBuilder};
use queue_failover::messaging::{Envelope, Transport};
use queue_failover::resilience::{CircuitBreakerConfig, ManualClock};
use queue_failover::strategy::SeededRandom;
use std::sync::Arc;
use std::time::Duration;

/// Breaker tuned for tests: opens after two failures, probes after one second
pub fn test_breaker_config() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: 2,
        success_threshold: 1,
        timeout: Duration::from_secs(1),
        ..Default::default()
    }
}

/// Builder over `transports` with a manual clock and seeded randomness
pub fn builder_for(
    transports: &[Arc<ScriptedTransport>],
    clock: Arc<ManualClock>,
) -> FailoverTransportBuilder {
    transports.iter().fold(
        FailoverTransport::builder()
            .clock(clock)
            .random(Arc::new(SeededRandom::new(7)))
            .circuit_breaker(test_breaker_config()),
        |builder, transport| {
            builder.transport(transport.name(), Arc::clone(transport) as Arc<dyn Transport>)
        },
    )
}

/// Failover transport over `transports` with default options
pub fn failover_for(transports: &[Arc<ScriptedTransport>]) -> (FailoverTransport, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let queue = builder_for(transports, clock.clone())
        .build()
        .expect("failover transport builds");
    (queue, clock)
}

/// Poll until a non-empty batch arrives, at most one round over the transports
pub async fn receive_batch(queue: &FailoverTransport) -> Vec<Envelope> {
    for _ in 0..queue.registry().len() {
        let batch = queue.get().await.expect("get succeeds");
        if !batch.is_empty() {
            return batch;
        }
    }
    Vec::new()
}

pub fn payload(n: u64) -> Envelope {
    Envelope::new(serde_json::json!({ "n": n }))
}
