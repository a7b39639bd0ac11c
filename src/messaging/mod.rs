//! # Messaging Module
//!
//! Provider-agnostic message plumbing: the immutable [`Envelope`], the
//! [`Transport`] contract every queue backend implements, transport errors and
//! an in-memory backend.
//!
//! ## Architecture
//!
//! ```text
//! Transport (trait)               <- send / get / ack / reject + optional ops
//!   ├── InMemoryTransport         <- tests, demos, local development
//!   ├── (database polling queue)  <- external collaborator
//!   ├── (Redis list queue)        <- external collaborator
//!   └── FailoverTransport         <- failover::FailoverTransport, itself a Transport
//! ```

pub mod envelope;
pub mod errors;
pub mod in_memory;
pub mod transport;
pub mod types;

pub use envelope::{Envelope, SourceTransportStamp};
pub use errors::{MessagingError, MessagingResult};
pub use in_memory::{InMemoryTransport, InMemoryTransportStats};
pub use transport::{Transport, TransportCapabilities};
pub use types::{MessageId, ReceiptHandle};
