//! # Transport Trait
//!
//! Provider-agnostic contract for a single queue backend (a polling database
//! queue, a Redis list, the in-memory queue). The failover layer only ever
//! talks to backends through this trait.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use super::envelope::Envelope;
use super::types::MessageId;
use super::{MessagingError, MessagingResult};

/// Optional operations a transport supports
///
/// The failover layer checks these before calling the matching optional
/// operation, so a backend without e.g. listing support is simply skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportCapabilities {
    /// Supports extending the visibility of an in-flight message
    pub keepalive: bool,
    /// Supports creating its storage (tables, keys)
    pub setup: bool,
    /// Supports counting ready messages
    pub message_count: bool,
    /// Supports `list` and `find`
    pub listable: bool,
}

impl TransportCapabilities {
    /// Every optional operation supported
    pub fn all() -> Self {
        Self {
            keepalive: true,
            setup: true,
            message_count: true,
            listable: true,
        }
    }
}

/// A queue backend
///
/// Required operations are `send`, `get`, `ack` and `reject`. The optional
/// operations default to returning [`MessagingError::Unsupported`]; a backend
/// that implements one should also advertise it through
/// [`Transport::capabilities`].
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Enqueue a message, returning the envelope as accepted by the backend
    async fn send(&self, envelope: Envelope) -> MessagingResult<Envelope>;

    /// Poll for up to one batch of ready messages
    async fn get(&self) -> MessagingResult<Vec<Envelope>>;

    /// Acknowledge successful processing of a delivered message
    async fn ack(&self, envelope: &Envelope) -> MessagingResult<()>;

    /// Reject a delivered message
    async fn reject(&self, envelope: &Envelope) -> MessagingResult<()>;

    /// Optional operations this transport supports
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::default()
    }

    /// Keep an in-flight message invisible to other consumers for `extension`
    async fn keepalive(&self, _envelope: &Envelope, _extension: Duration) -> MessagingResult<()> {
        Err(MessagingError::unsupported("keepalive"))
    }

    /// Create the backend storage if it doesn't exist (idempotent)
    async fn setup(&self) -> MessagingResult<()> {
        Err(MessagingError::unsupported("setup"))
    }

    /// Number of messages waiting in the backend
    async fn message_count(&self) -> MessagingResult<u64> {
        Err(MessagingError::unsupported("message_count"))
    }

    /// List up to `limit` messages without consuming them
    async fn list(&self, _limit: usize) -> MessagingResult<Vec<Envelope>> {
        Err(MessagingError::unsupported("list"))
    }

    /// Look up a single message by ID without consuming it
    async fn find(&self, _id: &MessageId) -> MessagingResult<Option<Envelope>> {
        Err(MessagingError::unsupported("find"))
    }
}
