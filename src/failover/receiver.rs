//! Read path of the failover group.
//!
//! Each `get` asks the consumption strategy for one transport, polls it and
//! stamps the returned messages with that transport's name. The stamp is what
//! routes `ack`, `reject` and `keepalive` back to the backend that delivered
//! the message.

use crate::error::{FailoverError, FailoverResult};
use crate::failover::TransportRegistry;
use crate::messaging::{Envelope, MessageId, MessagingError, Transport};
use crate::resilience::{CircuitBreaker, Clock};
use crate::strategy::ConsumptionStrategy;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Entries kept in the fallback routing index before the oldest are evicted
pub const FALLBACK_INDEX_CAPACITY: usize = 10_000;

/// Retry knobs for `get` when no transport is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverOptions {
    /// Extra selection rounds after the first finds nothing available
    pub max_retries: u32,
    /// Pause between selection rounds
    pub retry_delay: Duration,
}

impl Default for ReceiverOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Delivery order of fallback index entries; an entry is only evicted while
/// its generation is still the one stored in the index
#[derive(Debug, Default)]
struct FallbackOrder {
    queue: VecDeque<(MessageId, u64)>,
    next_generation: u64,
}

/// Strategy-driven receiver with source-stamp routing
#[derive(Debug)]
pub struct FailoverReceiver {
    registry: Arc<TransportRegistry>,
    circuit_breaker: Arc<CircuitBreaker>,
    strategy: Arc<dyn ConsumptionStrategy>,
    clock: Arc<dyn Clock>,
    options: ReceiverOptions,
    shutdown: watch::Sender<bool>,
    /// Compatibility shim: routes messages whose stamp was stripped after
    /// delivery. The stamp is always consulted first.
    fallback_index: DashMap<MessageId, (String, u64)>,
    fallback_order: Mutex<FallbackOrder>,
}

impl FailoverReceiver {
    pub fn new(
        registry: Arc<TransportRegistry>,
        circuit_breaker: Arc<CircuitBreaker>,
        strategy: Arc<dyn ConsumptionStrategy>,
        clock: Arc<dyn Clock>,
        options: ReceiverOptions,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            registry,
            circuit_breaker,
            strategy,
            clock,
            options,
            shutdown,
            fallback_index: DashMap::new(),
            fallback_order: Mutex::new(FallbackOrder::default()),
        }
    }

    /// Poll one transport for a batch of messages
    ///
    /// Returns an empty batch when no transport became available within the
    /// retry budget or after [`shutdown`](Self::shutdown). Once
    /// `transports × failure_threshold` polls have failed, each further failure
    /// also costs one retry, so a call always terminates.
    pub async fn get(&self) -> FailoverResult<Vec<Envelope>> {
        let names = self.registry.names();
        let max_failed_polls =
            names.len() * self.circuit_breaker.config().failure_threshold.max(1) as usize;
        let mut retries = 0;
        let mut failed_polls = 0;

        loop {
            if self.is_shutdown() {
                return Ok(Vec::new());
            }

            let Some(name) = self.strategy.select(names, &self.circuit_breaker) else {
                if retries >= self.options.max_retries {
                    debug!(retries, "No transport available for receive");
                    return Ok(Vec::new());
                }
                retries += 1;
                if !self.pause(self.options.retry_delay).await {
                    return Ok(Vec::new());
                }
                continue;
            };

            let transport = self
                .registry
                .get(&name)
                .ok_or_else(|| FailoverError::unknown_transport(&name))?;

            let started = self.clock.now();
            let result = transport.get().await;
            let latency = self.clock.now().saturating_duration_since(started);

            match result {
                Ok(batch) => {
                    self.circuit_breaker.record_success(&name);
                    self.strategy.record_result(&name, true, latency);
                    debug!(
                        transport = %name,
                        latency_ms = latency.as_millis() as u64,
                        count = batch.len(),
                        "Received batch"
                    );
                    return Ok(batch
                        .into_iter()
                        .map(|envelope| {
                            self.remember(envelope.id(), &name);
                            envelope.with_source_transport(name.as_str())
                        })
                        .collect());
                }
                Err(error) => {
                    self.circuit_breaker.record_failure(&name, &error);
                    self.strategy.record_result(&name, false, latency);
                    warn!(
                        transport = %name,
                        latency_ms = latency.as_millis() as u64,
                        error = %error,
                        "Receive failed, selecting another transport"
                    );

                    // Past the cap every failed poll spends the retry budget,
                    // so a loop over transports that never open still ends
                    failed_polls += 1;
                    if failed_polls >= max_failed_polls {
                        if retries >= self.options.max_retries {
                            warn!(failed_polls, retries, "Giving up receive after repeated poll failures");
                            return Ok(Vec::new());
                        }
                        retries += 1;
                        if !self.pause(self.options.retry_delay).await {
                            return Ok(Vec::new());
                        }
                    }
                }
            }
        }
    }

    /// Acknowledge on the transport that delivered `envelope`
    pub async fn ack(&self, envelope: &Envelope) -> FailoverResult<()> {
        let (name, transport) = self.route("ack", envelope)?;
        match transport.ack(envelope).await {
            Ok(()) => {
                self.forget(envelope.id());
                debug!(transport = %name, message_id = %envelope.id(), "Message acked");
                Ok(())
            }
            Err(error) => Err(self.routed_failure(&name, "ack", error)),
        }
    }

    /// Reject on the transport that delivered `envelope`
    pub async fn reject(&self, envelope: &Envelope) -> FailoverResult<()> {
        let (name, transport) = self.route("reject", envelope)?;
        match transport.reject(envelope).await {
            Ok(()) => {
                self.forget(envelope.id());
                debug!(transport = %name, message_id = %envelope.id(), "Message rejected");
                Ok(())
            }
            Err(error) => Err(self.routed_failure(&name, "reject", error)),
        }
    }

    /// Best-effort visibility extension on the delivering transport
    ///
    /// Unroutable messages, transports without keepalive and transport errors
    /// are all ignored; none of them count against the circuit breaker.
    pub async fn keepalive(&self, envelope: &Envelope, extension: Duration) {
        let Some(name) = self.resolve_source(envelope) else {
            debug!(message_id = %envelope.id(), "Keepalive skipped, no source transport");
            return;
        };
        let Some(transport) = self.registry.get(&name) else {
            debug!(transport = %name, "Keepalive skipped, transport not registered");
            return;
        };
        if !transport.capabilities().keepalive {
            return;
        }

        if let Err(error) = transport.keepalive(envelope, extension).await {
            debug!(
                transport = %name,
                message_id = %envelope.id(),
                error = %error,
                "Keepalive failed"
            );
        }
    }

    /// Up to `limit` messages across available listable transports
    pub async fn list(&self, limit: usize) -> FailoverResult<Vec<Envelope>> {
        let mut listed = Vec::new();

        for (name, transport) in self.registry.iter() {
            if listed.len() >= limit {
                break;
            }
            if !transport.capabilities().listable || !self.circuit_breaker.is_available(name) {
                continue;
            }

            match transport.list(limit - listed.len()).await {
                Ok(envelopes) => listed.extend(
                    envelopes
                        .into_iter()
                        .map(|envelope| envelope.with_source_transport(name)),
                ),
                Err(error) => {
                    self.circuit_breaker.record_failure(name, &error);
                    warn!(transport = %name, error = %error, "List failed");
                }
            }
        }

        listed.truncate(limit);
        Ok(listed)
    }

    /// First transport holding message `id`, in registration order
    pub async fn find(&self, id: &MessageId) -> FailoverResult<Option<Envelope>> {
        for (name, transport) in self.registry.iter() {
            if !transport.capabilities().listable || !self.circuit_breaker.is_available(name) {
                continue;
            }

            match transport.find(id).await {
                Ok(Some(envelope)) => return Ok(Some(envelope.with_source_transport(name))),
                Ok(None) => {}
                Err(error) => {
                    self.circuit_breaker.record_failure(name, &error);
                    warn!(transport = %name, message_id = %id, error = %error, "Find failed");
                }
            }
        }
        Ok(None)
    }

    /// Abort any retry sleep in progress; later `get` calls return empty
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Entries currently held by the fallback routing index
    pub fn fallback_len(&self) -> usize {
        self.fallback_index.len()
    }

    fn route(
        &self,
        operation: &'static str,
        envelope: &Envelope,
    ) -> FailoverResult<(String, &Arc<dyn Transport>)> {
        let name = self
            .resolve_source(envelope)
            .ok_or_else(|| FailoverError::unresolvable_source(operation, envelope.id().as_str()))?;
        let transport = self
            .registry
            .get(&name)
            .ok_or_else(|| FailoverError::unknown_transport(&name))?;
        Ok((name, transport))
    }

    fn routed_failure(&self, name: &str, operation: &'static str, error: MessagingError) -> FailoverError {
        self.circuit_breaker.record_failure(name, &error);
        warn!(transport = %name, operation, error = %error, "Routed operation failed");
        FailoverError::transport(name, operation, error)
    }

    fn resolve_source(&self, envelope: &Envelope) -> Option<String> {
        envelope.source_transport().map(str::to_string).or_else(|| {
            self.fallback_index
                .get(envelope.id())
                .map(|entry| entry.value().0.clone())
        })
    }

    fn remember(&self, id: &MessageId, name: &str) {
        let mut order = self.fallback_order.lock();
        let generation = order.next_generation;
        order.next_generation += 1;

        self.fallback_index
            .insert(id.clone(), (name.to_string(), generation));
        order.queue.push_back((id.clone(), generation));

        while order.queue.len() > FALLBACK_INDEX_CAPACITY {
            if let Some((evicted, queued)) = order.queue.pop_front() {
                self.fallback_index
                    .remove_if(&evicted, |_, (_, current)| *current == queued);
            }
        }
    }

    fn forget(&self, id: &MessageId) {
        self.fallback_index.remove(id);
    }

    /// Sleep for `delay` unless shut down first; false means stop
    async fn pause(&self, delay: Duration) -> bool {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return false;
        }

        tokio::select! {
            _ = self.clock.sleep(delay) => {}
            _ = shutdown.changed() => {}
        }
        !self.is_shutdown()
    }
}
