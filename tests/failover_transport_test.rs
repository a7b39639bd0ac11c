//! Facade construction and fan-out operations.

mod common;

use common::*;
use queue_failover::messaging::{InMemoryTransport, TransportCapabilities};
use queue_failover::resilience::CircuitState;
use queue_failover::{FailoverConfig, FailoverError, FailoverTransport, Transport};
use std::collections::HashMap;
use std::sync::Arc;

#[test]
fn test_single_transport_is_rejected() {
    let only = ScriptedTransport::new("only");

    let err = FailoverTransport::builder()
        .transport("only", only as Arc<dyn Transport>)
        .build()
        .unwrap_err();

    assert!(matches!(err, FailoverError::Configuration { .. }));
}

#[tokio::test]
async fn test_setup_attempts_every_transport_and_reports_first_error() {
    let primary = ScriptedTransport::new("primary");
    let secondary = ScriptedTransport::new("secondary");
    let tertiary = ScriptedTransport::new("tertiary");
    secondary.fail(SETUP);
    tertiary.fail(SETUP);
    let (queue, _) = failover_for(&[primary.clone(), secondary.clone(), tertiary.clone()]);

    let err = queue.setup().await.unwrap_err();

    assert!(matches!(
        err,
        FailoverError::Transport { ref transport, operation: "setup", .. } if transport == "secondary"
    ));
    assert_eq!(primary.calls(SETUP), 1);
    assert_eq!(secondary.calls(SETUP), 1);
    assert_eq!(tertiary.calls(SETUP), 1);
    assert_eq!(queue.circuit_breaker().metrics("tertiary").total_failures, 1);
}

#[tokio::test]
async fn test_setup_skips_transports_without_support() {
    let primary = ScriptedTransport::with_capabilities("primary", TransportCapabilities::default());
    let secondary = ScriptedTransport::new("secondary");
    let (queue, _) = failover_for(&[primary.clone(), secondary.clone()]);

    queue.setup().await.unwrap();

    assert_eq!(primary.calls(SETUP), 0);
    assert_eq!(secondary.calls(SETUP), 1);
}

#[tokio::test]
async fn test_message_count_sums_available_transports() {
    let primary = ScriptedTransport::new("primary");
    let secondary = ScriptedTransport::new("secondary");
    let tertiary = ScriptedTransport::new("tertiary");
    for n in 0..3 {
        primary.seed(payload(n)).await;
    }
    secondary.seed(payload(1)).await;
    tertiary.seed(payload(1)).await;
    tertiary.fail(MESSAGE_COUNT);
    let (queue, _) = failover_for(&[primary.clone(), secondary.clone(), tertiary.clone()]);

    assert_eq!(queue.message_count().await.unwrap(), 4);
    assert_eq!(queue.circuit_breaker().metrics("tertiary").total_failures, 1);

    queue.circuit_breaker().force_open("primary");
    assert_eq!(queue.message_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_failover_transport_is_a_transport() {
    let primary = ScriptedTransport::new("primary");
    let secondary = ScriptedTransport::new("secondary");
    primary.fail_all();
    let (queue, _) = failover_for(&[primary.clone(), secondary.clone()]);
    let as_transport: Arc<dyn Transport> = Arc::new(queue);

    let sent = as_transport.send(payload(1)).await.unwrap();
    assert_eq!(sent.source_transport(), Some("secondary"));
    assert!(as_transport.capabilities().listable);
    assert_eq!(as_transport.message_count().await.unwrap(), 1);

    secondary.fail(SEND);
    let err = as_transport.send(payload(2)).await.unwrap_err();
    assert!(err.to_string().contains("All transports failed"));
}

#[tokio::test]
async fn test_end_to_end_from_dsn() {
    let primary = Arc::new(InMemoryTransport::new("primary"));
    let secondary = Arc::new(InMemoryTransport::new("secondary"));
    let mut transports: HashMap<String, Arc<dyn Transport>> = HashMap::new();
    transports.insert("primary".to_string(), primary.clone());
    transports.insert("secondary".to_string(), secondary.clone());

    let config = FailoverConfig::from_dsn(
        "failover://primary||secondary?circuit_breaker[failure_threshold]=1&max_retries=0",
    )
    .unwrap();
    let queue = FailoverTransport::from_config(&config, &transports).unwrap();

    primary.set_available(false);
    let sent = queue.send(payload(1)).await.unwrap();
    assert_eq!(sent.source_transport(), Some("secondary"));
    assert_eq!(queue.circuit_breaker().state("primary"), CircuitState::Open);

    let batch = queue.get().await.unwrap();
    assert_eq!(batch.len(), 1);
    queue.ack(&batch[0]).await.unwrap();

    let stats = secondary.stats().await;
    assert_eq!(stats.total_acked, 1);
    assert_eq!(stats.message_count, 0);

    let report = queue.circuit_breaker().report();
    assert_eq!(report.unhealthy_transports(), vec!["primary"]);
}
