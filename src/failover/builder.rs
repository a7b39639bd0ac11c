//! Construction of [`FailoverTransport`]s.

use crate::config::FailoverConfig;
use crate::error::{FailoverError, FailoverResult};
use crate::failover::{FailoverOptions, FailoverTransport, TransportRegistry};
use crate::messaging::Transport;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, Clock, SystemClock};
use crate::strategy::{
    build_strategy, ConsumptionStrategy, ConsumptionStrategyKind, RandomSource, StrategyOptions,
    ThreadRandom,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Maps a configured transport name to a live transport
pub trait TransportResolver {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Transport>>;
}

impl TransportResolver for HashMap<String, Arc<dyn Transport>> {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Transport>> {
        self.get(name).cloned()
    }
}

/// Builder for [`FailoverTransport`]
///
/// # Example
///
/// ```rust
/// use queue_failover::failover::FailoverTransport;
/// use queue_failover::messaging::InMemoryTransport;
/// use queue_failover::strategy::ConsumptionStrategyKind;
/// use std::sync::Arc;
///
/// let transport = FailoverTransport::builder()
///     .transport("primary", Arc::new(InMemoryTransport::new("primary")))
///     .transport("secondary", Arc::new(InMemoryTransport::new("secondary")))
///     .consumption_strategy(ConsumptionStrategyKind::LatencyAware)
///     .build()
///     .unwrap();
///
/// assert_eq!(transport.registry().names(), ["primary", "secondary"]);
/// ```
#[derive(Debug)]
pub struct FailoverTransportBuilder {
    transports: Vec<(String, Arc<dyn Transport>)>,
    circuit_breaker: CircuitBreakerConfig,
    strategy_kind: ConsumptionStrategyKind,
    strategy_options: StrategyOptions,
    strategy: Option<Arc<dyn ConsumptionStrategy>>,
    clock: Option<Arc<dyn Clock>>,
    random: Option<Arc<dyn RandomSource>>,
    options: FailoverOptions,
}

impl Default for FailoverTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FailoverTransportBuilder {
    pub fn new() -> Self {
        Self {
            transports: Vec::new(),
            circuit_breaker: CircuitBreakerConfig::default(),
            strategy_kind: ConsumptionStrategyKind::default(),
            strategy_options: StrategyOptions::default(),
            strategy: None,
            clock: None,
            random: None,
            options: FailoverOptions::default(),
        }
    }

    /// Register the next transport in failover order
    pub fn transport(mut self, name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        self.transports.push((name.into(), transport));
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    pub fn consumption_strategy(mut self, kind: ConsumptionStrategyKind) -> Self {
        self.strategy_kind = kind;
        self
    }

    pub fn strategy_options(mut self, options: StrategyOptions) -> Self {
        self.strategy_options = options;
        self
    }

    /// Use a custom strategy instead of one of the named kinds
    pub fn strategy(mut self, strategy: Arc<dyn ConsumptionStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    pub fn try_unhealthy_on_failure(mut self, enabled: bool) -> Self {
        self.options.try_unhealthy_on_failure = enabled;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.options.receiver.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.options.receiver.retry_delay = retry_delay;
        self
    }

    pub fn build(self) -> FailoverResult<FailoverTransport> {
        self.circuit_breaker
            .validate()
            .map_err(|message| FailoverError::configuration("circuit_breaker", message))?;
        self.strategy_options
            .validate()
            .map_err(|message| FailoverError::configuration("strategy_options", message))?;

        let registry = TransportRegistry::new(self.transports)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let random = self.random.unwrap_or_else(|| Arc::new(ThreadRandom) as Arc<dyn RandomSource>);
        let strategy = self.strategy.unwrap_or_else(|| {
            build_strategy(
                self.strategy_kind,
                &self.strategy_options,
                Arc::clone(&clock),
                random,
            )
        });
        let circuit_breaker = Arc::new(CircuitBreaker::new(self.circuit_breaker, Arc::clone(&clock)));

        Ok(FailoverTransport::new(
            registry,
            circuit_breaker,
            strategy,
            clock,
            self.options,
        ))
    }
}

impl FailoverTransport {
    pub fn builder() -> FailoverTransportBuilder {
        FailoverTransportBuilder::new()
    }

    /// Build from configuration, resolving each configured name to a transport
    pub fn from_config(
        config: &FailoverConfig,
        resolver: &dyn TransportResolver,
    ) -> FailoverResult<Self> {
        Self::builder_from_config(config, resolver)?.build()
    }

    /// Builder pre-filled from configuration, for overriding the clock or
    /// random source before building
    pub fn builder_from_config(
        config: &FailoverConfig,
        resolver: &dyn TransportResolver,
    ) -> FailoverResult<FailoverTransportBuilder> {
        config.validate()?;

        let mut builder = FailoverTransportBuilder {
            circuit_breaker: config.circuit_breaker_config(),
            strategy_kind: config.consumption_strategy,
            strategy_options: config.strategy_options.clone(),
            options: config.failover_options(),
            ..FailoverTransportBuilder::new()
        };

        for name in &config.transports {
            let transport = resolver
                .resolve(name)
                .ok_or_else(|| FailoverError::unknown_transport(name))?;
            builder = builder.transport(name.clone(), transport);
        }

        Ok(builder)
    }
}
