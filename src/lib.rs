#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Queue Failover
//!
//! Failover orchestration over two or more message-queue transports.
//!
//! ## Overview
//!
//! A [`FailoverTransport`] presents several independent queue backends as one
//! logical queue. Sends cascade across backends in registration order, receives
//! are spread by a pluggable consumption strategy, and a per-backend circuit
//! breaker keeps known-bad backends out of rotation until they have had time to
//! recover.
//!
//! ## Module Organization
//!
//! - [`messaging`] - Envelope, transport contract and an in-memory transport
//! - [`resilience`] - Per-transport circuit breaker, metrics and clock
//! - [`strategy`] - Round robin, weighted round robin, adaptive priority and latency-aware selection
//! - [`failover`] - Registry, sender, receiver and the failover facade
//! - [`config`] - File, environment and DSN configuration
//! - [`error`] - Failover error types
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use queue_failover::failover::FailoverTransport;
//! use queue_failover::messaging::{Envelope, InMemoryTransport};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let primary = Arc::new(InMemoryTransport::new("primary"));
//! let secondary = Arc::new(InMemoryTransport::new("secondary"));
//!
//! let queue = FailoverTransport::builder()
//!     .transport("primary", primary.clone())
//!     .transport("secondary", secondary.clone())
//!     .build()
//!     .unwrap();
//!
//! // Primary is down: the send lands on secondary
//! primary.set_available(false);
//! let sent = queue.send(Envelope::new(serde_json::json!({"order": 42}))).await.unwrap();
//! assert_eq!(sent.source_transport(), Some("secondary"));
//!
//! // Acknowledgements follow the source stamp back to secondary
//! let batch = queue.get().await.unwrap();
//! for envelope in &batch {
//!     queue.ack(envelope).await.unwrap();
//! }
//! # });
//! ```

pub mod config;
pub mod error;
pub mod failover;
pub mod logging;
pub mod messaging;
pub mod resilience;
pub mod strategy;

pub use config::FailoverConfig;
pub use error::{FailoverError, FailoverResult};
pub use failover::{FailoverTransport, FailoverTransportBuilder, TransportResolver};
pub use messaging::{Envelope, MessagingError, MessagingResult, Transport};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use strategy::{ConsumptionStrategy, ConsumptionStrategyKind};
