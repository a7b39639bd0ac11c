//! # In-Memory Transport
//!
//! Thread-safe single-queue transport for testing, demos and local development.
//!
//! ## Features
//!
//! - **Visibility Timeout**: Messages become invisible after `get`, re-visible after timeout
//! - **Thread-Safe**: Uses `tokio::sync::RwLock` for concurrent access
//! - **Full Transport Implementation**: Supports every optional operation
//! - **Outage Simulation**: [`InMemoryTransport::set_available`] makes every call fail

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::envelope::Envelope;
use super::transport::{Transport, TransportCapabilities};
use super::types::MessageId;
use super::{MessagingError, MessagingResult};

/// Default number of messages returned by a single `get`
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default visibility timeout for delivered messages
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Stored message with visibility tracking
#[derive(Debug, Clone)]
struct StoredMessage {
    /// Sequence number, used as the receipt handle
    seq: u64,
    envelope: Envelope,
    enqueued_at: DateTime<Utc>,
    /// When the message becomes visible again (None = visible now)
    visible_at: Option<DateTime<Utc>>,
    receive_count: u32,
}

impl StoredMessage {
    fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.visible_at.map(|vt| vt <= now).unwrap_or(true)
    }

    fn delivered(&self) -> Envelope {
        self.envelope
            .clone()
            .with_receipt_handle(self.seq)
            .with_delivery(self.receive_count, self.enqueued_at)
    }
}

#[derive(Debug, Default)]
struct InMemoryQueue {
    /// Messages in FIFO order
    messages: VecDeque<StoredMessage>,
    next_seq: u64,
}

/// Counters for an in-memory transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryTransportStats {
    pub name: String,
    /// Messages stored (visible and in flight)
    pub message_count: u64,
    /// Messages delivered but not yet acked or rejected
    pub in_flight_count: u64,
    pub total_sent: u64,
    pub total_received: u64,
    pub total_acked: u64,
    pub total_rejected: u64,
}

/// In-memory queue transport
///
/// # Example
///
/// ```rust
/// use queue_failover::messaging::{Envelope, InMemoryTransport, Transport};
///
/// # tokio_test::block_on(async {
/// let transport = InMemoryTransport::new("local");
///
/// transport.send(Envelope::new(serde_json::json!({"key": "value"}))).await.unwrap();
///
/// let batch = transport.get().await.unwrap();
/// assert_eq!(batch.len(), 1);
/// transport.ack(&batch[0]).await.unwrap();
/// # });
/// ```
#[derive(Debug)]
pub struct InMemoryTransport {
    name: String,
    batch_size: usize,
    visibility_timeout: Duration,
    queue: RwLock<InMemoryQueue>,
    available: AtomicBool,
    total_sent: AtomicU64,
    total_received: AtomicU64,
    total_acked: AtomicU64,
    total_rejected: AtomicU64,
}

impl InMemoryTransport {
    /// Create a new in-memory transport with default batch size and visibility timeout
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, DEFAULT_BATCH_SIZE, DEFAULT_VISIBILITY_TIMEOUT)
    }

    /// Create a new in-memory transport with explicit options
    pub fn with_options(
        name: impl Into<String>,
        batch_size: usize,
        visibility_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            batch_size: batch_size.max(1),
            visibility_timeout,
            queue: RwLock::new(InMemoryQueue::default()),
            available: AtomicBool::new(true),
            total_sent: AtomicU64::new(0),
            total_received: AtomicU64::new(0),
            total_acked: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulate an outage (`false`) or a recovery (`true`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
        debug!(transport = %self.name, available, "In-memory transport availability changed");
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Number of stored messages, visible or in flight (for testing)
    pub async fn queue_length(&self) -> usize {
        self.queue.read().await.messages.len()
    }

    /// Clear all messages (for testing)
    pub async fn clear(&self) {
        self.queue.write().await.messages.clear();
    }

    /// Make a delivered message visible again immediately
    pub async fn reject_and_requeue(&self, envelope: &Envelope) -> MessagingResult<()> {
        self.ensure_available()?;
        let seq = Self::receipt_seq(envelope)?;

        let mut queue = self.queue.write().await;
        let msg = queue
            .messages
            .iter_mut()
            .find(|m| m.seq == seq)
            .ok_or_else(|| MessagingError::message_not_found(envelope.id().as_str()))?;
        msg.visible_at = None;
        Ok(())
    }

    /// Snapshot of the transport counters
    pub async fn stats(&self) -> InMemoryTransportStats {
        let queue = self.queue.read().await;
        let now = Utc::now();
        let in_flight_count = queue
            .messages
            .iter()
            .filter(|m| !m.is_visible(now))
            .count() as u64;

        InMemoryTransportStats {
            name: self.name.clone(),
            message_count: queue.messages.len() as u64,
            in_flight_count,
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_received: self.total_received.load(Ordering::Relaxed),
            total_acked: self.total_acked.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
        }
    }

    fn ensure_available(&self) -> MessagingResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(MessagingError::queue_unavailable(&self.name))
        }
    }

    fn receipt_seq(envelope: &Envelope) -> MessagingResult<u64> {
        let handle = envelope
            .receipt_handle()
            .ok_or_else(|| MessagingError::invalid_receipt_handle("<missing>"))?;
        handle
            .as_u64()
            .ok_or_else(|| MessagingError::invalid_receipt_handle(handle.as_str()))
    }

    fn to_chrono(duration: Duration) -> MessagingResult<chrono::Duration> {
        chrono::Duration::from_std(duration)
            .map_err(|e| MessagingError::internal(format!("invalid duration: {e}")))
    }

    async fn remove(&self, envelope: &Envelope) -> MessagingResult<()> {
        let seq = Self::receipt_seq(envelope)?;

        let mut queue = self.queue.write().await;
        let pos = queue
            .messages
            .iter()
            .position(|m| m.seq == seq)
            .ok_or_else(|| MessagingError::message_not_found(envelope.id().as_str()))?;
        queue.messages.remove(pos);
        Ok(())
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, envelope: Envelope) -> MessagingResult<Envelope> {
        self.ensure_available()?;

        let mut queue = self.queue.write().await;
        queue.next_seq += 1;
        let seq = queue.next_seq;
        let enqueued_at = Utc::now();

        queue.messages.push_back(StoredMessage {
            seq,
            envelope: envelope.clone(),
            enqueued_at,
            visible_at: None,
            receive_count: 0,
        });
        self.total_sent.fetch_add(1, Ordering::Relaxed);

        Ok(envelope.with_delivery(0, enqueued_at))
    }

    async fn get(&self) -> MessagingResult<Vec<Envelope>> {
        self.ensure_available()?;

        let now = Utc::now();
        let visible_until = now + Self::to_chrono(self.visibility_timeout)?;
        let mut queue = self.queue.write().await;
        let mut received = Vec::new();

        for msg in queue.messages.iter_mut() {
            if received.len() >= self.batch_size {
                break;
            }
            if msg.is_visible(now) {
                msg.visible_at = Some(visible_until);
                msg.receive_count += 1;
                received.push(msg.delivered());
            }
        }

        self.total_received
            .fetch_add(received.len() as u64, Ordering::Relaxed);
        Ok(received)
    }

    async fn ack(&self, envelope: &Envelope) -> MessagingResult<()> {
        self.ensure_available()?;
        self.remove(envelope).await?;
        self.total_acked.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn reject(&self, envelope: &Envelope) -> MessagingResult<()> {
        self.ensure_available()?;
        self.remove(envelope).await?;
        self.total_rejected.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::all()
    }

    async fn keepalive(&self, envelope: &Envelope, extension: Duration) -> MessagingResult<()> {
        self.ensure_available()?;
        let seq = Self::receipt_seq(envelope)?;
        let visible_until = Utc::now() + Self::to_chrono(extension)?;

        let mut queue = self.queue.write().await;
        let msg = queue
            .messages
            .iter_mut()
            .find(|m| m.seq == seq)
            .ok_or_else(|| MessagingError::message_not_found(envelope.id().as_str()))?;
        msg.visible_at = Some(visible_until);
        Ok(())
    }

    async fn setup(&self) -> MessagingResult<()> {
        self.ensure_available()
    }

    async fn message_count(&self) -> MessagingResult<u64> {
        self.ensure_available()?;
        let now = Utc::now();
        let queue = self.queue.read().await;
        Ok(queue.messages.iter().filter(|m| m.is_visible(now)).count() as u64)
    }

    async fn list(&self, limit: usize) -> MessagingResult<Vec<Envelope>> {
        self.ensure_available()?;
        let queue = self.queue.read().await;
        Ok(queue
            .messages
            .iter()
            .take(limit)
            .map(StoredMessage::delivered)
            .collect())
    }

    async fn find(&self, id: &MessageId) -> MessagingResult<Option<Envelope>> {
        self.ensure_available()?;
        let queue = self.queue.read().await;
        Ok(queue
            .messages
            .iter()
            .find(|m| m.envelope.id() == id)
            .map(StoredMessage::delivered))
    }
}
