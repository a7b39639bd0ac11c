//! Write path of the failover group.
//!
//! A send cascades over the transports in registration order. Transports whose
//! circuit is open are skipped on the first pass; when every attempted
//! transport fails, the skipped ones get a last-resort pass so a backend that
//! recovered before its backoff elapsed is still discovered.

use crate::error::{FailoverError, FailoverResult};
use crate::failover::TransportRegistry;
use crate::messaging::{Envelope, MessagingError, Transport};
use crate::resilience::{CircuitBreaker, Clock};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cascading sender over a transport registry
#[derive(Debug)]
pub struct FailoverSender {
    registry: Arc<TransportRegistry>,
    circuit_breaker: Arc<CircuitBreaker>,
    clock: Arc<dyn Clock>,
    try_unhealthy_on_failure: bool,
}

impl FailoverSender {
    pub fn new(
        registry: Arc<TransportRegistry>,
        circuit_breaker: Arc<CircuitBreaker>,
        clock: Arc<dyn Clock>,
        try_unhealthy_on_failure: bool,
    ) -> Self {
        Self {
            registry,
            circuit_breaker,
            clock,
            try_unhealthy_on_failure,
        }
    }

    /// Send through the first transport that accepts the message
    ///
    /// The returned envelope is stamped with the accepting transport's name.
    /// Fails with [`FailoverError::AllTransportsFailed`] when every attempt
    /// failed, or [`FailoverError::NoTransportAvailable`] when nothing was
    /// attempted at all.
    pub async fn send(&self, envelope: Envelope) -> FailoverResult<Envelope> {
        let mut attempted = Vec::new();
        let mut skipped = Vec::new();
        let mut last_error = None;

        for (name, transport) in self.registry.iter() {
            if !self.circuit_breaker.is_available(name) {
                debug!(transport = %name, message_id = %envelope.id(), "Skipping unavailable transport");
                skipped.push(name.to_string());
                continue;
            }

            attempted.push(name.to_string());
            match self.attempt(name, transport, &envelope).await {
                Ok(sent) => return Ok(sent),
                Err(error) => last_error = Some(error),
            }
        }

        if self.try_unhealthy_on_failure && !skipped.is_empty() {
            debug!(
                skipped = ?skipped,
                message_id = %envelope.id(),
                "All available transports failed, trying unavailable transports as last resort"
            );

            for name in &skipped {
                let Some(transport) = self.registry.get(name) else {
                    continue;
                };
                attempted.push(name.clone());
                match self.attempt(name, transport, &envelope).await {
                    Ok(sent) => return Ok(sent),
                    Err(error) => last_error = Some(error),
                }
            }
        }

        match last_error {
            Some(error) => {
                warn!(
                    attempted = ?attempted,
                    message_id = %envelope.id(),
                    error = %error,
                    "Send failed on every transport"
                );
                Err(FailoverError::all_transports_failed(attempted, error))
            }
            None => {
                warn!(skipped = ?skipped, message_id = %envelope.id(), "No transport available for send");
                Err(FailoverError::NoTransportAvailable { skipped })
            }
        }
    }

    async fn attempt(
        &self,
        name: &str,
        transport: &Arc<dyn Transport>,
        envelope: &Envelope,
    ) -> Result<Envelope, MessagingError> {
        let started = self.clock.now();
        let result = transport.send(envelope.clone()).await;
        let latency_ms = self.clock.now().saturating_duration_since(started).as_millis() as u64;

        match result {
            Ok(sent) => {
                self.circuit_breaker.record_success(name);
                debug!(transport = %name, latency_ms, message_id = %sent.id(), "Message sent");
                Ok(sent.with_source_transport(name))
            }
            Err(error) => {
                self.circuit_breaker.record_failure(name, &error);
                warn!(transport = %name, latency_ms, error = %error, "Send attempt failed");
                Err(error)
            }
        }
    }
}
