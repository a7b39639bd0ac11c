//! # Message Envelope
//!
//! The immutable value passed between the caller, the failover layer and the
//! underlying transports. An envelope carries at most one
//! [`SourceTransportStamp`], which is how `ack`/`reject`/`keepalive` find the
//! transport that delivered it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{MessageId, ReceiptHandle};

/// Name of the transport that produced or last accepted a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTransportStamp(String);

impl SourceTransportStamp {
    /// Create a stamp for the named transport
    pub fn new(transport_name: impl Into<String>) -> Self {
        Self(transport_name.into())
    }

    /// Name of the stamped transport
    pub fn transport_name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceTransportStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable queue message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    id: MessageId,
    payload: serde_json::Value,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    receipt_handle: Option<ReceiptHandle>,
    #[serde(default)]
    receive_count: u32,
    enqueued_at: DateTime<Utc>,
    #[serde(default)]
    source_transport: Option<SourceTransportStamp>,
}

impl Envelope {
    /// Create a new envelope with a generated message ID
    pub fn new(payload: serde_json::Value) -> Self {
        Self::with_id(MessageId::generate(), payload)
    }

    /// Create a new envelope with an explicit message ID
    pub fn with_id(id: impl Into<MessageId>, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            payload,
            headers: BTreeMap::new(),
            receipt_handle: None,
            receive_count: 0,
            enqueued_at: Utc::now(),
            source_transport: None,
        }
    }

    /// Build an envelope from any serializable payload
    pub fn from_serializable<T: Serialize>(
        payload: &T,
    ) -> Result<Self, super::MessagingError> {
        Ok(Self::new(serde_json::to_value(payload)?))
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Deserialize the payload into a concrete type
    pub fn payload_as<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, super::MessagingError> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn receipt_handle(&self) -> Option<&ReceiptHandle> {
        self.receipt_handle.as_ref()
    }

    /// Number of times this message has been delivered
    pub fn receive_count(&self) -> u32 {
        self.receive_count
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// Name of the transport that served this message, if stamped
    pub fn source_transport(&self) -> Option<&str> {
        self.source_transport
            .as_ref()
            .map(SourceTransportStamp::transport_name)
    }

    pub fn source_stamp(&self) -> Option<&SourceTransportStamp> {
        self.source_transport.as_ref()
    }

    /// Return a copy with an additional header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Return a copy carrying a backend receipt handle
    pub fn with_receipt_handle(mut self, handle: impl Into<ReceiptHandle>) -> Self {
        self.receipt_handle = Some(handle.into());
        self
    }

    /// Return a copy with delivery metadata set by a backend
    pub fn with_delivery(mut self, receive_count: u32, enqueued_at: DateTime<Utc>) -> Self {
        self.receive_count = receive_count;
        self.enqueued_at = enqueued_at;
        self
    }

    /// Return a copy stamped with the given source transport
    ///
    /// Any previous stamp is replaced.
    pub fn with_source_transport(mut self, transport_name: impl Into<String>) -> Self {
        self.source_transport = Some(SourceTransportStamp::new(transport_name));
        self
    }

    /// Return a copy with the source stamp removed
    pub fn without_source_transport(mut self) -> Self {
        self.source_transport = None;
        self
    }
}
