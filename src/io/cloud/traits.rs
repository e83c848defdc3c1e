//! Core traits for cloud IO operations.
//!
//! These traits are the narrow collaborator interfaces the queue codec and the
//! paging runner are written against. They are synchronous; implementations
//! backed by async SDKs block on their runtime internally.

use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

// ============================================================================
// Core Error Type
// ============================================================================

/// Generic error type for cloud IO operations
#[derive(Debug, Clone)]
pub struct CloudIOError {
    pub message: String,
    pub kind: ErrorKind,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Authorization,
    NotFound,
    AlreadyExists,
    InvalidInput,
    Network,
    Timeout,
    ServiceUnavailable,
    RateLimited,
    InternalError,
    Other,
}

impl fmt::Display for CloudIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for CloudIOError {}

impl CloudIOError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

pub type CloudResult<T> = Result<T, CloudIOError>;

// ============================================================================
// Message Attributes
// ============================================================================

/// A typed message attribute, shaped like the queue service's wire model.
///
/// Exactly one of the value slots is expected to be populated. An attribute
/// with every slot empty is accepted but carries no size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageAttributeValue {
    pub data_type: String,
    pub string_value: Option<String>,
    pub binary_value: Option<Vec<u8>>,
    pub string_list_values: Vec<String>,
    pub binary_list_values: Vec<Vec<u8>>,
}

impl MessageAttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            string_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn number(value: impl fmt::Display) -> Self {
        Self {
            data_type: "Number".to_string(),
            string_value: Some(value.to_string()),
            ..Self::default()
        }
    }

    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        Self {
            data_type: "Binary".to_string(),
            binary_value: Some(value.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn string_list(values: Vec<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            string_list_values: values,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn binary_list(values: Vec<Vec<u8>>) -> Self {
        Self {
            data_type: "Binary".to_string(),
            binary_list_values: values,
            ..Self::default()
        }
    }

    /// The string slot, if this is a string-valued attribute.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.string_value.as_deref()
    }
}

pub type MessageAttributes = HashMap<String, MessageAttributeValue>;

// ============================================================================
// ObjectIO - Object Storage
// ============================================================================

/// Options applied to an object upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_encoding: Option<String>,
    pub expires_at: Option<i64>, // Unix timestamp
}

/// Trait for object storage operations
pub trait ObjectIO: Send + Sync {
    /// Upload data to object storage
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket doesn't exist, permissions are not enough, or the upload fails
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        options: &PutOptions,
    ) -> CloudResult<()>;

    /// Download data from object storage
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist, permissions are not enough, or the download fails
    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>>;
}

// ============================================================================
// QueueIO - Message Queues
// ============================================================================

/// A message as handed to the queue transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    pub queue_url: String,
    pub body: String,
    pub attributes: MessageAttributes,
    pub group_id: Option<String>,
    pub deduplication_id: Option<String>,
}

/// Acknowledgement returned by a send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: String,
    pub sequence_number: Option<String>,
}

/// Parameters of a single receive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub queue_url: String,
    pub max_messages: u32,
    pub wait_time_secs: u32,
    pub visibility_timeout_secs: u32,
    pub attribute_names: Vec<String>,
}

/// A message as returned by the queue transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    pub receipt_handle: String, // For acknowledgment
    pub body: String,
    pub attributes: MessageAttributes,
    pub receive_count: u32,
}

/// One entry of a batch delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub id: String,
    pub receipt_handle: String,
}

impl DeleteEntry {
    pub fn new(id: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            receipt_handle: receipt_handle.into(),
        }
    }
}

impl From<&QueueMessage> for DeleteEntry {
    fn from(message: &QueueMessage) -> Self {
        Self::new(message.id.clone(), message.receipt_handle.clone())
    }
}

/// Trait for message queue operations
pub trait QueueIO: Send + Sync {
    /// Send a message to a queue
    ///
    /// # Errors
    ///
    /// Returns an error if the queue doesn't exist, permissions are not enough, or sending fails
    fn send(&self, message: &WireMessage) -> CloudResult<SendReceipt>;

    /// Receive messages from a queue
    ///
    /// Only the attributes named in `request.attribute_names` are returned
    /// (`"All"` returns every attribute).
    ///
    /// # Errors
    ///
    /// Returns an error if the queue doesn't exist, permissions are insufficient, or receiving fails
    fn receive(&self, request: &ReceiveRequest) -> CloudResult<Vec<QueueMessage>>;

    /// Delete multiple messages from the queue
    ///
    /// # Errors
    ///
    /// Returns an error if the queue doesn't exist, receipt handles are invalid, or deletion fails
    fn delete_batch(&self, queue_url: &str, entries: &[DeleteEntry]) -> CloudResult<()>;

    /// Purge all messages from a queue
    ///
    /// # Errors
    ///
    /// Returns an error if the queue doesn't exist, permissions are not enough, or purging fails
    fn purge(&self, queue_url: &str) -> CloudResult<()>;

    /// Change how long a received message stays hidden from other consumers
    ///
    /// # Errors
    ///
    /// Returns an error if the queue doesn't exist, the receipt handle is invalid, or the call fails
    fn change_visibility(
        &self,
        queue_url: &str,
        receipt_handle: &str,
        timeout_secs: u32,
    ) -> CloudResult<()>;
}

// ============================================================================
// KeyValueIO - Document/NoSQL Databases
// ============================================================================

/// A query or scan request against a key-value table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub table_name: String,
    pub index_name: Option<String>,
    pub key_condition_expression: Option<String>,
    pub filter_expression: Option<String>,
    pub expression_attribute_names: HashMap<String, String>,
    pub expression_attribute_values: HashMap<String, Value>,
    pub limit: Option<u32>,
    pub consistent_read: Option<bool>,
    pub exclusive_start_key: Option<Value>, // continuation token
}

impl QueryRequest {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }
}

/// One page of query or scan results
///
/// `items` is `None` when the service omits the field for an empty page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub items: Option<Vec<Value>>,
    pub last_evaluated_key: Option<Value>,
}

/// Trait for key-value/document store operations
pub trait KeyValueIO: Send + Sync {
    /// Fetch one page of a key-condition query
    ///
    /// # Errors
    ///
    /// Returns an error if the table doesn't exist, the expression is invalid, or the query fails
    fn query(&self, request: &QueryRequest) -> CloudResult<QueryPage>;

    /// Fetch one page of a full-table scan
    ///
    /// # Errors
    ///
    /// Returns an error if the table doesn't exist, permissions are not enough, or the scan fails
    fn scan(&self, request: &QueryRequest) -> CloudResult<QueryPage>;
}

// ============================================================================
// TopicIO - Pub/Sub Topics
// ============================================================================

/// A message published to a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    pub topic_arn: String,
    pub message: String,
    pub subject: String,
}

/// Trait for topic publishing
pub trait TopicIO: Send + Sync {
    /// Publish a message to a topic, returning its message id
    ///
    /// # Errors
    ///
    /// Returns an error if the topic doesn't exist, permissions are not enough, or publishing fails
    fn publish(&self, message: &TopicMessage) -> CloudResult<String>;
}
