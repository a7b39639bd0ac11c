//! # Failover Error Types
//!
//! Errors raised by the failover layer itself. Errors coming out of an
//! individual transport are [`MessagingError`]s; they are recorded against the
//! transport's circuit breaker and only surface here as the wrapped cause of an
//! aggregate failure.

use crate::messaging::MessagingError;
use thiserror::Error;

/// Errors produced while constructing or operating a failover transport
#[derive(Error, Debug)]
pub enum FailoverError {
    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("No transport available, skipped: [{}]", skipped.join(", "))]
    NoTransportAvailable { skipped: Vec<String> },

    #[error("All transports failed, attempted: [{}]: {last_error}", attempted.join(", "))]
    AllTransportsFailed {
        attempted: Vec<String>,
        #[source]
        last_error: Box<MessagingError>,
    },

    #[error("Cannot route {operation} for message {message_id}: no source transport recorded")]
    UnresolvableSource {
        operation: &'static str,
        message_id: String,
    },

    #[error("Unknown transport: {name}")]
    UnknownTransport { name: String },

    #[error("Transport {transport} failed during {operation}: {source}")]
    Transport {
        transport: String,
        operation: &'static str,
        #[source]
        source: Box<MessagingError>,
    },
}

impl FailoverError {
    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an aggregate failure from the attempted transports and the last cause
    pub fn all_transports_failed(attempted: Vec<String>, last_error: MessagingError) -> Self {
        Self::AllTransportsFailed {
            attempted,
            last_error: Box::new(last_error),
        }
    }

    /// Create a routing error for a message without a resolvable source
    pub fn unresolvable_source(operation: &'static str, message_id: impl Into<String>) -> Self {
        Self::UnresolvableSource {
            operation,
            message_id: message_id.into(),
        }
    }

    /// Create an unknown transport error
    pub fn unknown_transport(name: impl Into<String>) -> Self {
        Self::UnknownTransport { name: name.into() }
    }

    /// Wrap an error returned by a specific transport
    pub fn transport(
        transport: impl Into<String>,
        operation: &'static str,
        source: MessagingError,
    ) -> Self {
        Self::Transport {
            transport: transport.into(),
            operation,
            source: Box::new(source),
        }
    }

    /// Names of the transports that were tried, for aggregate failures
    pub fn attempted_transports(&self) -> &[String] {
        match self {
            Self::AllTransportsFailed { attempted, .. } => attempted,
            _ => &[],
        }
    }

    /// Whether the error means the whole failover group is down
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            Self::AllTransportsFailed { .. } | Self::NoTransportAvailable { .. }
        )
    }
}

/// Result type alias for failover operations
pub type FailoverResult<T> = Result<T, FailoverError>;
