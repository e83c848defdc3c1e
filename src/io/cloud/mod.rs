//! Cloud I/O wrappers for queues, object storage, key-value tables and topics.
//!
//! The wrappers are written against small **synchronous traits**, one per
//! service category, so the same code runs against a real SDK adapter or the
//! in-memory fakes:
//!
//! - [`ObjectIO`] - Object storage (S3, GCS, Azure Blob)
//! - [`QueueIO`] - Message queues (SQS)
//! - [`KeyValueIO`] - Document/NoSQL stores (`DynamoDB`)
//! - [`TopicIO`] - Pub/sub topics (SNS)
//!
//! ## Extended queue messages
//!
//! [`ExtendedQueue`] sends JSON payloads of any size. Payloads are compressed;
//! those whose estimated wire size reaches [`MAX_MESSAGE_SIZE`] are uploaded to
//! object storage and replaced by a pointer message. Receiving reverses this
//! per message, so one bad message never fails its batch.
//!
//! ```
//! use cloudwrap::io::cloud::*;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), ExtendedError> {
//! let queue = ExtendedQueue::new(
//!     Arc::new(FakeQueueIO::new()),
//!     Arc::new(FakeObjectIO::new()),
//!     QueueConfig::new("us-east-1", "123456789012"),
//!     ExtendedConfig::with_bucket("overflow"),
//! );
//!
//! queue.send("jobs", &json!({"job": 1}), SendOptions::default())?;
//! let batch = queue.retrieve::<Value>("jobs", RetrieveOptions::default())?;
//! assert_eq!(batch[0].payload(), Some(&json!({"job": 1})));
//! # Ok(())
//! # }
//! ```
//!
//! ## Paging
//!
//! [`PagingClient`] wraps a [`KeyValueIO`] and follows continuation keys until
//! a query or scan is exhausted.
//!
//! ## Error Handling
//!
//! Collaborators return [`CloudResult<T>`] where the error is [`CloudIOError`],
//! categorized by [`ErrorKind`]. The wrappers lift those into their own enums:
//! [`ExtendedError`], [`PagingError`] and [`PublishError`].
//!
//! ## Module Structure
//!
//! - [`traits`] - Collaborator traits and wire types
//! - [`sizing`] - Wire-size estimation
//! - [`extended`] - The payload codec
//! - [`queue`] - Queue client
//! - [`paging`] - Paging decorator
//! - [`expressions`] - Update/query expression helpers
//! - [`topic`] - Topic publisher
//! - [`config`] - Configuration values
//! - [`fake`] - In-memory fake implementations for testing
//! - [`helpers`] - Environment, error and validation utilities

pub mod config;
pub mod expressions;
pub mod extended;
pub mod fake;
pub mod helpers;
pub mod paging;
pub mod queue;
pub mod sizing;
pub mod topic;
pub mod traits;

pub use config::*;
pub use extended::*;
pub use fake::*;
pub use paging::{Pages, PagingClient, PagingError};
pub use queue::*;
pub use topic::*;
pub use traits::*;
