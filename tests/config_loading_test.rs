//! Loading failover configuration from files.

use queue_failover::strategy::ConsumptionStrategyKind;
use queue_failover::{FailoverConfig, FailoverError};
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, file_name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(file_name);
    fs::write(&path, contents).expect("write config file");
    path
}

#[test]
fn test_load_toml() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "failover.toml",
        r#"
transports = ["postgres", "redis"]
consumption_strategy = "weighted_round_robin"
try_unhealthy_on_failure = false
retry_delay_ms = 250

[circuit_breaker]
failure_threshold = 3
timeout_seconds = 10

[strategy_options]
latency_threshold_ms = 500
"#,
    );

    let config = FailoverConfig::load_from_file(&path).unwrap();

    assert_eq!(config.transports, vec!["postgres", "redis"]);
    assert_eq!(config.consumption_strategy, ConsumptionStrategyKind::WeightedRoundRobin);
    assert!(!config.try_unhealthy_on_failure);
    assert_eq!(config.retry_delay_ms, 250);
    assert_eq!(config.circuit_breaker.failure_threshold, 3);
    assert_eq!(config.circuit_breaker.timeout_seconds, 10);
    assert_eq!(config.circuit_breaker.success_threshold, 2);
    assert_eq!(config.strategy_options.latency_threshold_ms, 500);
    assert_eq!(config.max_retries, 3);
}

#[test]
fn test_load_yaml() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "failover.yaml",
        r#"
transports:
  - primary
  - secondary
  - tertiary
consumption_strategy: adaptive_priority
strategy_options:
  window_size: 25
  latency_weight: 0.5
  success_weight: 0.5
"#,
    );

    let config = FailoverConfig::load_from_file(&path).unwrap();

    assert_eq!(config.transports.len(), 3);
    assert_eq!(config.consumption_strategy, ConsumptionStrategyKind::AdaptivePriority);
    assert_eq!(config.strategy_options.window_size, 25);
    assert_eq!(config.strategy_options.latency_weight, 0.5);
}

#[test]
fn test_load_json() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "failover.json",
        r#"{"transports": ["a", "b"], "consumption_strategy": "latency_aware", "max_retries": 0}"#,
    );

    let config = FailoverConfig::load_from_file(&path).unwrap();

    assert_eq!(config.consumption_strategy, ConsumptionStrategyKind::LatencyAware);
    assert_eq!(config.max_retries, 0);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();

    let err = FailoverConfig::load_from_file(dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, FailoverError::Configuration { .. }));
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_invalid_contents_are_configuration_errors() {
    let dir = TempDir::new().unwrap();
    let cases = [
        ("one.toml", "transports = [\"only\"]\n"),
        ("strategy.toml", "transports = [\"a\", \"b\"]\nconsumption_strategy = \"fastest\"\n"),
        ("breaker.toml", "transports = [\"a\", \"b\"]\n[circuit_breaker]\nfailure_threshold = 0\n"),
    ];

    for (file_name, contents) in cases {
        let path = write(&dir, file_name, contents);
        let err = FailoverConfig::load_from_file(&path).unwrap_err();
        assert!(
            matches!(err, FailoverError::Configuration { .. }),
            "{file_name}: {err}"
        );
    }
}
