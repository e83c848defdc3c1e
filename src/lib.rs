//! # Cloudwrap
//!
//! **Provider-agnostic cloud service wrappers** for Rust, built around one
//! problem: message queues cap the size of a message, and real payloads do not.
//!
//! ## Key Features
//!
//! - **Extended queue messages** - JSON payloads of any size; oversized ones are
//!   offloaded to object storage behind a pointer message, transparently
//! - **Compression** - every payload is gzip-framed before it travels
//! - **Per-message failure isolation** - a batch decode never fails as a whole
//! - **Exhaustive paging** - follow continuation keys across query and scan pages
//! - **Expression helpers** - placeholder maps and update expressions for key-value tables
//! - **Topic publishing** - JSON or text messages addressed by short topic name
//! - **Fakes for testing** - in-memory, call-recording implementations of every service
//!
//! ## Quick Start
//!
//! ```
//! use cloudwrap::io::cloud::*;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = FakeObjectIO::new();
//! let queue = ExtendedQueue::new(
//!     Arc::new(FakeQueueIO::new()),
//!     Arc::new(store.clone()),
//!     QueueConfig::new("us-east-1", "123456789012").with_prefix("etl_"),
//!     ExtendedConfig::with_bucket("overflow"),
//! );
//!
//! // Large enough to be offloaded.
//! let report = json!({"rows": "r".repeat(300_000)});
//! let outcome = queue.send("reports", &report, SendOptions::default())?;
//! assert!(outcome.offloaded);
//! assert_eq!(store.put_count(), 1);
//!
//! for envelope in queue.retrieve::<Value>("reports", RetrieveOptions::default())? {
//!     let (message, payload) = envelope.into_parts();
//!     assert_eq!(payload?, report);
//!     queue.remove("reports", &[DeleteEntry::from(&message)])?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel-io` (default) - decode received batches in parallel with Rayon
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (inline sends and page fetches at `debug`,
//! offloads at `info`, per-message decode failures at `warn`) and never installs
//! a subscriber.

pub mod io;

// General re-exports
pub use io::cloud::config::{ExtendedConfig, QueueConfig, TopicConfig};
pub use io::cloud::expressions::{
    UpdateParams, prepare_attribute_names, prepare_attribute_values, prepare_update,
    prepare_update_expression,
};
pub use io::cloud::extended::{
    EncodedMessage, ExtendedError, ExtendedMessageCodec, ReceivedEnvelope,
};
pub use io::cloud::paging::{PagingClient, PagingError};
pub use io::cloud::queue::{ExtendedQueue, RetrieveOptions, SendOptions, SendOutcome};
pub use io::cloud::sizing::estimate_message_size;
pub use io::cloud::topic::{PublishError, TopicPublisher};
pub use io::compression::{CompressionCodec, CompressionLevel, GzipCodec};
