//! # Failover Configuration
//!
//! Construction parameters for a failover group: the ordered transport names,
//! circuit breaker thresholds, the consumption strategy and receiver retry knobs.
//!
//! ## Sources
//!
//! - **File**: TOML, YAML or JSON chosen by extension ([`FailoverConfig::load_from_file`])
//! - **Environment**: `FAILOVER__`-prefixed variables, `__` separating nested keys,
//!   e.g. `FAILOVER__CIRCUIT_BREAKER__FAILURE_THRESHOLD=3` ([`FailoverConfig::from_env`])
//! - **DSN**: `failover://primary||secondary?consumption_strategy=latency_aware`
//!   ([`FailoverConfig::from_dsn`])
//!
//! Every field has a default, so a source only needs to name the transports.
//!
//! ## Usage
//!
//! ```rust
//! use queue_failover::config::FailoverConfig;
//! use queue_failover::strategy::ConsumptionStrategyKind;
//!
//! let config = FailoverConfig::from_dsn(
//!     "failover://primary||secondary?consumption_strategy=latency_aware&circuit_breaker[failure_threshold]=3",
//! ).unwrap();
//!
//! assert_eq!(config.transports, vec!["primary", "secondary"]);
//! assert_eq!(config.consumption_strategy, ConsumptionStrategyKind::LatencyAware);
//! assert_eq!(config.circuit_breaker.failure_threshold, 3);
//! ```

mod dsn;

use crate::error::{FailoverError, FailoverResult};
use crate::failover::{FailoverOptions, ReceiverOptions, MIN_TRANSPORTS};
use crate::resilience::CircuitBreakerConfig;
use crate::strategy::{ConsumptionStrategyKind, StrategyOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "FAILOVER";

/// Separator between the prefix and nested key segments
pub const ENV_SEPARATOR: &str = "__";

/// Circuit breaker section, in configuration units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout_seconds: u64,
    pub timeout_multiplier: f64,
    pub max_timeout_seconds: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        CircuitBreakerConfig::default().into()
    }
}

impl From<CircuitBreakerConfig> for CircuitBreakerSettings {
    fn from(config: CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            success_threshold: config.success_threshold,
            timeout_seconds: config.timeout.as_secs(),
            timeout_multiplier: config.timeout_multiplier,
            max_timeout_seconds: config.max_timeout.as_secs(),
        }
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            success_threshold: settings.success_threshold,
            timeout: Duration::from_secs(settings.timeout_seconds),
            timeout_multiplier: settings.timeout_multiplier,
            max_timeout: Duration::from_secs(settings.max_timeout_seconds),
        }
    }
}

/// Complete configuration of a failover group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// Transport names in failover order
    pub transports: Vec<String>,
    pub circuit_breaker: CircuitBreakerSettings,
    pub consumption_strategy: ConsumptionStrategyKind,
    pub strategy_options: StrategyOptions,
    pub try_unhealthy_on_failure: bool,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        let receiver = ReceiverOptions::default();
        Self {
            transports: Vec::new(),
            circuit_breaker: CircuitBreakerSettings::default(),
            consumption_strategy: ConsumptionStrategyKind::default(),
            strategy_options: StrategyOptions::default(),
            try_unhealthy_on_failure: true,
            max_retries: receiver.max_retries,
            retry_delay_ms: receiver.retry_delay.as_millis() as u64,
        }
    }
}

impl FailoverConfig {
    /// Config for `transports` with every other field defaulted
    pub fn with_transports<I, S>(transports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            transports: transports.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::from(&self.circuit_breaker)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn failover_options(&self) -> FailoverOptions {
        FailoverOptions {
            try_unhealthy_on_failure: self.try_unhealthy_on_failure,
            receiver: ReceiverOptions {
                max_retries: self.max_retries,
                retry_delay: self.retry_delay(),
            },
        }
    }

    /// Check everything that would make construction fail
    pub fn validate(&self) -> FailoverResult<()> {
        if self.transports.len() < MIN_TRANSPORTS {
            return Err(FailoverError::configuration(
                "transports",
                format!(
                    "at least {MIN_TRANSPORTS} transports are required, got {}",
                    self.transports.len()
                ),
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.transports {
            if name.trim().is_empty() {
                return Err(FailoverError::configuration(
                    "transports",
                    "transport names must not be empty",
                ));
            }
            if !seen.insert(name.trim()) {
                return Err(FailoverError::configuration(
                    "transports",
                    format!("duplicate transport name '{name}'"),
                ));
            }
        }

        self.circuit_breaker_config()
            .validate()
            .map_err(|message| FailoverError::configuration("circuit_breaker", message))?;

        self.strategy_options
            .validate()
            .map_err(|message| FailoverError::configuration("strategy_options", message))?;

        Ok(())
    }

    /// Load from a file, with `FAILOVER__` environment variables layered on top
    pub fn load_from_file(path: impl AsRef<Path>) -> FailoverResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FailoverError::configuration(
                "config_file",
                format!("configuration file not found: {}", path.display()),
            ));
        }

        let builder = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(Self::environment());
        Self::build(builder, &path.display().to_string())
    }

    /// Load from `FAILOVER__` environment variables alone
    pub fn from_env() -> FailoverResult<Self> {
        let builder = config::Config::builder().add_source(Self::environment());
        Self::build(builder, "environment")
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .list_separator(",")
            .with_list_parse_key("transports")
            .try_parsing(true)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        source: &str,
    ) -> FailoverResult<Self> {
        let config: Self = builder
            .build()
            .and_then(|built| built.try_deserialize::<Self>())
            .map_err(|e| FailoverError::configuration(source, e.to_string()))?;

        config.validate()?;
        Ok(config)
    }
}
