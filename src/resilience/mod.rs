//! # Resilience Module
//!
//! Per-transport health tracking for the failover layer.
//!
//! ## Architecture
//!
//! - **Circuit Breaker**: one Closed/Open/Half-Open state machine per transport name
//! - **Backoff**: the open timeout grows with repeated failures up to a ceiling
//! - **Metrics**: per-transport snapshots and an aggregate report
//! - **Clock**: injectable time source so tests never sleep for real
//!
//! ## Usage
//!
//! ```rust
//! use queue_failover::messaging::MessagingError;
//! use queue_failover::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState, SystemClock};
//! use std::sync::Arc;
//!
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 2,
//!     ..Default::default()
//! };
//! let breaker = CircuitBreaker::new(config, Arc::new(SystemClock));
//!
//! let error = MessagingError::queue_unavailable("primary");
//! breaker.record_failure("primary", &error);
//! breaker.record_failure("primary", &error);
//!
//! assert_eq!(breaker.state("primary"), CircuitState::Open);
//! assert!(breaker.is_available("secondary"));
//! ```

pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod metrics;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CircuitBreakerConfig;
pub use metrics::{CircuitBreakerMetrics, CircuitBreakerReport};
