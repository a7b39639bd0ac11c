//! Facade presenting a failover group as a single logical transport.

use crate::error::{FailoverError, FailoverResult};
use crate::failover::{FailoverReceiver, FailoverSender, ReceiverOptions, TransportRegistry};
use crate::messaging::{
    Envelope, MessageId, MessagingResult, Transport, TransportCapabilities,
};
use crate::resilience::{CircuitBreaker, Clock};
use crate::strategy::ConsumptionStrategy;
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Behaviour knobs shared by the sender and receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverOptions {
    /// Retry transports with an open circuit when every other one failed
    pub try_unhealthy_on_failure: bool,
    pub receiver: ReceiverOptions,
}

impl Default for FailoverOptions {
    fn default() -> Self {
        Self {
            try_unhealthy_on_failure: true,
            receiver: ReceiverOptions::default(),
        }
    }
}

/// A group of transports behaving as one queue
///
/// Sends cascade in registration order, receives follow the consumption
/// strategy, and every returned envelope carries the name of the backend that
/// served it. Sender and receiver are created on first use and share the
/// registry, circuit breaker and strategy.
#[derive(Debug)]
pub struct FailoverTransport {
    registry: Arc<TransportRegistry>,
    circuit_breaker: Arc<CircuitBreaker>,
    strategy: Arc<dyn ConsumptionStrategy>,
    clock: Arc<dyn Clock>,
    options: FailoverOptions,
    sender: OnceLock<FailoverSender>,
    receiver: OnceLock<FailoverReceiver>,
}

impl FailoverTransport {
    pub fn new(
        registry: TransportRegistry,
        circuit_breaker: Arc<CircuitBreaker>,
        strategy: Arc<dyn ConsumptionStrategy>,
        clock: Arc<dyn Clock>,
        options: FailoverOptions,
    ) -> Self {
        info!(
            transports = ?registry.names(),
            strategy = strategy.name(),
            try_unhealthy_on_failure = options.try_unhealthy_on_failure,
            "Failover transport created"
        );

        Self {
            registry: Arc::new(registry),
            circuit_breaker,
            strategy,
            clock,
            options,
            sender: OnceLock::new(),
            receiver: OnceLock::new(),
        }
    }

    pub fn registry(&self) -> &TransportRegistry {
        &self.registry
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    pub fn strategy(&self) -> &Arc<dyn ConsumptionStrategy> {
        &self.strategy
    }

    pub fn options(&self) -> &FailoverOptions {
        &self.options
    }

    pub fn sender(&self) -> &FailoverSender {
        self.sender.get_or_init(|| {
            FailoverSender::new(
                Arc::clone(&self.registry),
                Arc::clone(&self.circuit_breaker),
                Arc::clone(&self.clock),
                self.options.try_unhealthy_on_failure,
            )
        })
    }

    pub fn receiver(&self) -> &FailoverReceiver {
        self.receiver.get_or_init(|| {
            FailoverReceiver::new(
                Arc::clone(&self.registry),
                Arc::clone(&self.circuit_breaker),
                Arc::clone(&self.strategy),
                Arc::clone(&self.clock),
                self.options.receiver,
            )
        })
    }

    pub async fn send(&self, envelope: Envelope) -> FailoverResult<Envelope> {
        self.sender().send(envelope).await
    }

    pub async fn get(&self) -> FailoverResult<Vec<Envelope>> {
        self.receiver().get().await
    }

    pub async fn ack(&self, envelope: &Envelope) -> FailoverResult<()> {
        self.receiver().ack(envelope).await
    }

    pub async fn reject(&self, envelope: &Envelope) -> FailoverResult<()> {
        self.receiver().reject(envelope).await
    }

    pub async fn keepalive(&self, envelope: &Envelope, extension: Duration) {
        self.receiver().keepalive(envelope, extension).await
    }

    pub async fn list(&self, limit: usize) -> FailoverResult<Vec<Envelope>> {
        self.receiver().list(limit).await
    }

    pub async fn find(&self, id: &MessageId) -> FailoverResult<Option<Envelope>> {
        self.receiver().find(id).await
    }

    /// Run setup on every transport that supports it
    ///
    /// Every transport is attempted; the first error is returned afterwards.
    pub async fn setup(&self) -> FailoverResult<()> {
        let mut first_error = None;

        for (name, transport) in self.registry.iter() {
            if !transport.capabilities().setup {
                continue;
            }

            match transport.setup().await {
                Ok(()) => debug!(transport = %name, "Transport setup complete"),
                Err(error) => {
                    self.circuit_breaker.record_failure(name, &error);
                    warn!(transport = %name, error = %error, "Transport setup failed");
                    first_error.get_or_insert(FailoverError::transport(name, "setup", error));
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Sum of waiting messages over available transports that can count them
    pub async fn message_count(&self) -> FailoverResult<u64> {
        let mut total = 0u64;

        for (name, transport) in self.registry.iter() {
            if !transport.capabilities().message_count || !self.circuit_breaker.is_available(name)
            {
                continue;
            }

            match transport.message_count().await {
                Ok(count) => total = total.saturating_add(count),
                Err(error) => {
                    self.circuit_breaker.record_failure(name, &error);
                    warn!(transport = %name, error = %error, "Message count failed");
                }
            }
        }

        Ok(total)
    }

    /// Stop receiving: an in-progress retry sleep returns at once and later
    /// `get` calls return empty batches
    pub fn shutdown(&self) {
        info!("Failover transport shutting down");
        self.receiver().shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.receiver.get().is_some_and(FailoverReceiver::is_shutdown)
    }
}

#[async_trait]
impl Transport for FailoverTransport {
    async fn send(&self, envelope: Envelope) -> MessagingResult<Envelope> {
        Ok(FailoverTransport::send(self, envelope).await?)
    }

    async fn get(&self) -> MessagingResult<Vec<Envelope>> {
        Ok(FailoverTransport::get(self).await?)
    }

    async fn ack(&self, envelope: &Envelope) -> MessagingResult<()> {
        Ok(FailoverTransport::ack(self, envelope).await?)
    }

    async fn reject(&self, envelope: &Envelope) -> MessagingResult<()> {
        Ok(FailoverTransport::reject(self, envelope).await?)
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::all()
    }

    async fn keepalive(&self, envelope: &Envelope, extension: Duration) -> MessagingResult<()> {
        FailoverTransport::keepalive(self, envelope, extension).await;
        Ok(())
    }

    async fn setup(&self) -> MessagingResult<()> {
        Ok(FailoverTransport::setup(self).await?)
    }

    async fn message_count(&self) -> MessagingResult<u64> {
        Ok(FailoverTransport::message_count(self).await?)
    }

    async fn list(&self, limit: usize) -> MessagingResult<Vec<Envelope>> {
        Ok(FailoverTransport::list(self, limit).await?)
    }

    async fn find(&self, id: &MessageId) -> MessagingResult<Option<Envelope>> {
        Ok(FailoverTransport::find(self, id).await?)
    }
}
