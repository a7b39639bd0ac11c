//! # Messaging Error Types
//!
//! Error handling for transport operations using thiserror for structured
//! error types instead of `Box<dyn Error>` patterns.

use crate::error::FailoverError;
use thiserror::Error;

/// Errors raised by a single transport
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Transport {transport}: {operation} failed: {message}")]
    Backend {
        transport: String,
        operation: String,
        message: String,
    },

    #[error("Queue unavailable: {transport}")]
    QueueUnavailable { transport: String },

    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("Invalid receipt handle: {handle}")]
    InvalidReceiptHandle { handle: String },

    #[error("Operation not supported by transport: {operation}")]
    Unsupported { operation: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },

    #[error("Network timeout: operation {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Internal messaging error: {message}")]
    Internal { message: String },

    #[error(transparent)]
    Failover(Box<FailoverError>),
}

impl MessagingError {
    /// Create a backend operation error
    pub fn backend(
        transport: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            transport: transport.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a queue unavailable error
    pub fn queue_unavailable(transport: impl Into<String>) -> Self {
        Self::QueueUnavailable {
            transport: transport.into(),
        }
    }

    /// Create a message not found error
    pub fn message_not_found(message_id: impl Into<String>) -> Self {
        Self::MessageNotFound {
            message_id: message_id.into(),
        }
    }

    /// Create an invalid receipt handle error
    pub fn invalid_receipt_handle(handle: impl Into<String>) -> Self {
        Self::InvalidReceiptHandle {
            handle: handle.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a message serialization error
    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    /// Create a message deserialization error
    pub fn message_deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the transport reported the operation as unsupported
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

impl From<FailoverError> for MessagingError {
    fn from(err: FailoverError) -> Self {
        MessagingError::Failover(Box::new(err))
    }
}

/// Conversion from serde_json::Error to MessagingError
impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_eof() {
            MessagingError::message_deserialization(err.to_string())
        } else {
            MessagingError::message_serialization(err.to_string())
        }
    }
}

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messaging_error_creation() {
        let backend_err = MessagingError::backend("redis", "send", "connection reset");
        assert!(matches!(backend_err, MessagingError::Backend { .. }));

        let unsupported = MessagingError::unsupported("keepalive");
        assert!(unsupported.is_unsupported());

        let timeout_err = MessagingError::timeout("get", 500);
        assert!(matches!(timeout_err, MessagingError::Timeout { .. }));
    }

    #[test]
    fn test_error_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json").unwrap_err();
        let messaging_err: MessagingError = json_err.into();
        assert!(matches!(
            messaging_err,
            MessagingError::MessageDeserialization { .. }
        ));

        let failover_err = FailoverError::unknown_transport("sqs");
        let messaging_err: MessagingError = failover_err.into();
        assert!(matches!(messaging_err, MessagingError::Failover(_)));
        assert!(messaging_err.to_string().contains("sqs"));
    }

    #[test]
    fn test_error_display() {
        let err = MessagingError::backend("doctrine", "ack", "row lock timeout");
        let display_str = format!("{err}");
        assert!(display_str.contains("doctrine"));
        assert!(display_str.contains("ack"));
        assert!(display_str.contains("row lock timeout"));
    }
}
