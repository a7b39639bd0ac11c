//! # Failover Module
//!
//! Presents two or more transports as one logical queue.
//!
//! ```text
//! caller ──► FailoverTransport ──► FailoverSender   ──► cascade in registration order
//!                              └─► FailoverReceiver ──► ConsumptionStrategy::select
//!                                        │
//!            CircuitBreaker ◄────────────┴── success / failure feedback
//! ```
//!
//! Every envelope returned by `send` or `get` is stamped with the name of the
//! transport that served it; `ack`, `reject` and `keepalive` route on that
//! stamp and never guess.

pub mod builder;
pub mod receiver;
pub mod registry;
pub mod sender;
pub mod transport;

pub use builder::{FailoverTransportBuilder, TransportResolver};
pub use receiver::{FailoverReceiver, ReceiverOptions, FALLBACK_INDEX_CAPACITY};
pub use registry::{TransportRegistry, MIN_TRANSPORTS};
pub use sender::FailoverSender;
pub use transport::{FailoverOptions, FailoverTransport};
