//! Transport double with call counting and per-operation failure injection.

use async_trait::async_trait;
use parking_lot::Mutex;
use queue_failover::messaging::{
    Envelope, InMemoryTransport, MessageId, MessagingError, MessagingResult, Transport,
    TransportCapabilities,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

pub const SEND: &str = "send";
pub const GET: &str = "get";
pub const ACK: &str = "ack";
pub const REJECT: &str = "reject";
pub const KEEPALIVE: &str = "keepalive";
pub const SETUP: &str = "setup";
pub const MESSAGE_COUNT: &str = "message_count";
pub const LIST: &str = "list";
pub const FIND: &str = "find";

/// In-memory transport whose operations can be made to fail on demand
#[derive(Debug)]
pub struct ScriptedTransport {
    name: String,
    inner: InMemoryTransport,
    capabilities: TransportCapabilities,
    failing: Mutex<HashSet<&'static str>>,
    failures_left: Mutex<HashMap<&'static str, usize>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl ScriptedTransport {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_capabilities(name, TransportCapabilities::all())
    }

    pub fn with_capabilities(name: &str, capabilities: TransportCapabilities) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            inner: InMemoryTransport::new(name),
            capabilities,
            failing: Mutex::new(HashSet::new()),
            failures_left: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make `operation` fail until recovered
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().insert(operation);
    }

    /// Make the next `times` calls of `operation` fail
    pub fn fail_times(&self, operation: &'static str, times: usize) {
        self.failures_left.lock().insert(operation, times);
    }

    /// Make every operation fail
    pub fn fail_all(&self) {
        for op in [SEND, GET, ACK, REJECT, KEEPALIVE, SETUP, MESSAGE_COUNT, LIST, FIND] {
            self.fail(op);
        }
    }

    pub fn recover_all(&self) {
        self.failing.lock().clear();
        self.failures_left.lock().clear();
    }

    /// Number of times `operation` was called
    pub fn calls(&self, operation: &'static str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    /// Enqueue directly, bypassing counters and failure injection
    pub async fn seed(&self, envelope: Envelope) -> Envelope {
        self.inner.send(envelope).await.expect("seed message")
    }

    pub async fn queue_length(&self) -> usize {
        self.inner.queue_length().await
    }

    fn enter(&self, operation: &'static str) -> MessagingResult<()> {
        *self.calls.lock().entry(operation).or_insert(0) += 1;
        let scheduled = match self.failures_left.lock().get_mut(operation) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        if scheduled || self.failing.lock().contains(operation) {
            return Err(MessagingError::backend(
                &self.name,
                operation,
                "scripted failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, envelope: Envelope) -> MessagingResult<Envelope> {
        self.enter(SEND)?;
        self.inner.send(envelope).await
    }

    async fn get(&self) -> MessagingResult<Vec<Envelope>> {
        self.enter(GET)?;
        self.inner.get().await
    }

    async fn ack(&self, envelope: &Envelope) -> MessagingResult<()> {
        self.enter(ACK)?;
        self.inner.ack(envelope).await
    }

    async fn reject(&self, envelope: &Envelope) -> MessagingResult<()> {
        self.enter(REJECT)?;
        self.inner.reject(envelope).await
    }

    fn capabilities(&self) -> TransportCapabilities {
        self.capabilities
    }

    async fn keepalive(&self, envelope: &Envelope, extension: Duration) -> MessagingResult<()> {
        self.enter(KEEPALIVE)?;
        self.inner.keepalive(envelope, extension).await
    }

    async fn setup(&self) -> MessagingResult<()> {
        self.enter(SETUP)?;
        self.inner.setup().await
    }

    async fn message_count(&self) -> MessagingResult<u64> {
        self.enter(MESSAGE_COUNT)?;
        self.inner.message_count().await
    }

    async fn list(&self, limit: usize) -> MessagingResult<Vec<Envelope>> {
        self.enter(LIST)?;
        self.inner.list(limit).await
    }

    async fn find(&self, id: &MessageId) -> MessagingResult<Option<Envelope>> {
        self.enter(FIND)?;
        self.inner.find(id).await
    }
}
