//! Queue client with transparent extended payloads.
//!
//! [`ExtendedQueue`] addresses queues by short name through a [`QueueConfig`],
//! runs every outgoing payload through the [`ExtendedMessageCodec`] and decodes
//! every received batch back into [`ReceivedEnvelope`]s.

use crate::io::cloud::config::{ExtendedConfig, QueueConfig};
use crate::io::cloud::extended::{
    BUCKET_ATTRIBUTE, EncodedMessage, ExtendedError, ExtendedMessageCodec, KEY_ATTRIBUTE,
    ReceivedEnvelope,
};
use crate::io::cloud::traits::{
    DeleteEntry, MessageAttributes, ObjectIO, QueueIO, QueueMessage, ReceiveRequest, SendReceipt,
    WireMessage,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Per-send options
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub attributes: MessageAttributes,
    /// FIFO message group
    pub group_id: Option<String>,
    pub deduplication_id: Option<String>,
}

impl SendOptions {
    #[must_use]
    pub fn with_attributes(attributes: MessageAttributes) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }
}

/// What a successful send produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub receipt: SendReceipt,
    pub offloaded: bool,
}

/// Per-receive options; unset fields fall back to the [`QueueConfig`] defaults
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    pub max_messages: Option<u32>,
    pub attribute_names: Vec<String>,
    pub visibility_timeout: Option<u32>,
}

impl RetrieveOptions {
    #[must_use]
    pub const fn max_messages(mut self, max: u32) -> Self {
        self.max_messages = Some(max);
        self
    }

    #[must_use]
    pub fn attribute_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_names = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn visibility_timeout(mut self, secs: u32) -> Self {
        self.visibility_timeout = Some(secs);
        self
    }
}

/// Attribute names to request: the caller's, then the pointer attributes, without repeats.
fn requested_attribute_names(requested: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .map(String::as_str)
        .chain([BUCKET_ATTRIBUTE, KEY_ATTRIBUTE])
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Entries with repeated ids dropped, first occurrence kept.
fn unique_entries(entries: &[DeleteEntry]) -> Vec<DeleteEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|e| seen.insert(e.id.as_str()))
        .cloned()
        .collect()
}

/// Queue client for JSON payloads of any size
#[derive(Clone)]
pub struct ExtendedQueue {
    queue: Arc<dyn QueueIO>,
    codec: ExtendedMessageCodec,
    config: QueueConfig,
}

impl ExtendedQueue {
    pub fn new(
        queue: Arc<dyn QueueIO>,
        store: Arc<dyn ObjectIO>,
        config: QueueConfig,
        extended: ExtendedConfig,
    ) -> Self {
        Self::from_parts(queue, ExtendedMessageCodec::new(store, extended), config)
    }

    /// Build from an already-configured codec.
    pub const fn from_parts(
        queue: Arc<dyn QueueIO>,
        codec: ExtendedMessageCodec,
        config: QueueConfig,
    ) -> Self {
        Self {
            queue,
            codec,
            config,
        }
    }

    #[must_use]
    pub const fn codec(&self) -> &ExtendedMessageCodec {
        &self.codec
    }

    #[must_use]
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    #[must_use]
    pub fn queue_url(&self, queue_name: &str) -> String {
        self.config.queue_url(queue_name)
    }

    /// Serialize `payload` to JSON and send it, offloading if it is too large.
    ///
    /// # Errors
    ///
    /// Any encoding error from [`ExtendedMessageCodec::encode_value`], or
    /// [`ExtendedError::Transport`] if the queue rejects the message
    pub fn send<T>(
        &self,
        queue_name: &str,
        payload: &T,
        options: SendOptions,
    ) -> Result<SendOutcome, ExtendedError>
    where
        T: Serialize + ?Sized,
    {
        let encoded = self.codec.encode_value(payload, options.attributes)?;
        self.transmit(queue_name, encoded, options.group_id, options.deduplication_id)
    }

    /// Send a text body as-is (it is still compressed and possibly offloaded).
    ///
    /// Receiving always parses bodies as JSON, so text that is not valid JSON
    /// comes back from [`retrieve`](Self::retrieve) as an [`ExtendedError::Codec`].
    ///
    /// # Errors
    ///
    /// Any encoding error from [`ExtendedMessageCodec::encode`], or
    /// [`ExtendedError::Transport`] if the queue rejects the message
    pub fn send_text(
        &self,
        queue_name: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<SendOutcome, ExtendedError> {
        let encoded = self.codec.encode(text, options.attributes)?;
        self.transmit(queue_name, encoded, options.group_id, options.deduplication_id)
    }

    fn transmit(
        &self,
        queue_name: &str,
        encoded: EncodedMessage,
        group_id: Option<String>,
        deduplication_id: Option<String>,
    ) -> Result<SendOutcome, ExtendedError> {
        let wire = WireMessage {
            queue_url: self.queue_url(queue_name),
            body: encoded.body,
            attributes: encoded.attributes,
            group_id,
            deduplication_id,
        };
        let receipt = self.queue.send(&wire).map_err(ExtendedError::Transport)?;
        debug!(
            queue = %wire.queue_url,
            message_id = %receipt.message_id,
            offloaded = encoded.offloaded,
            "sent message"
        );
        Ok(SendOutcome {
            receipt,
            offloaded: encoded.offloaded,
        })
    }

    /// Receive a batch and decode every message independently.
    ///
    /// Messages that fail to decode are still returned, carrying their error,
    /// so the caller can acknowledge or dead-letter them.
    ///
    /// # Errors
    ///
    /// Returns [`ExtendedError::Transport`] if the receive call itself fails
    pub fn retrieve<T>(
        &self,
        queue_name: &str,
        options: RetrieveOptions,
    ) -> Result<Vec<ReceivedEnvelope<T>>, ExtendedError>
    where
        T: DeserializeOwned + Send,
    {
        let request = ReceiveRequest {
            queue_url: self.queue_url(queue_name),
            max_messages: options.max_messages.unwrap_or(self.config.max_messages),
            wait_time_secs: self.config.wait_time_secs,
            visibility_timeout_secs: options
                .visibility_timeout
                .unwrap_or(self.config.default_visibility_timeout),
            attribute_names: requested_attribute_names(&options.attribute_names),
        };

        let messages = self.queue.receive(&request).map_err(ExtendedError::Transport)?;
        debug!(queue = %request.queue_url, received = messages.len(), "received batch");
        Ok(self.codec.decode_batch(messages))
    }

    /// Decode a message delivered by some other means, such as an event trigger.
    pub fn decode_message<T>(&self, message: QueueMessage) -> ReceivedEnvelope<T>
    where
        T: DeserializeOwned,
    {
        self.codec.decode_envelope(message)
    }

    /// Acknowledge messages with one batch delete.
    ///
    /// Entries sharing an id are sent once; the first occurrence wins. An
    /// empty batch makes no call.
    ///
    /// # Errors
    ///
    /// Returns [`ExtendedError::Transport`] if the delete fails
    pub fn remove(&self, queue_name: &str, entries: &[DeleteEntry]) -> Result<(), ExtendedError> {
        let entries = unique_entries(entries);
        if entries.is_empty() {
            return Ok(());
        }
        self.queue
            .delete_batch(&self.queue_url(queue_name), &entries)
            .map_err(ExtendedError::Transport)
    }

    /// Drop every message in the queue.
    ///
    /// # Errors
    ///
    /// Returns [`ExtendedError::Transport`] if the purge fails
    pub fn purge(&self, queue_name: &str) -> Result<(), ExtendedError> {
        self.queue
            .purge(&self.queue_url(queue_name))
            .map_err(ExtendedError::Transport)
    }

    /// Extend or shorten the invisibility window of a received message.
    ///
    /// # Errors
    ///
    /// Returns [`ExtendedError::Transport`] if the call fails
    pub fn set_visibility_timeout(
        &self,
        queue_name: &str,
        receipt_handle: &str,
        timeout_secs: u32,
    ) -> Result<(), ExtendedError> {
        self.queue
            .change_visibility(&self.queue_url(queue_name), receipt_handle, timeout_secs)
            .map_err(ExtendedError::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_attribute_names_union() {
        let names = requested_attribute_names(&["trace".to_string(), KEY_ATTRIBUTE.to_string()]);
        assert_eq!(names, vec!["trace", KEY_ATTRIBUTE, BUCKET_ATTRIBUTE]);

        let names = requested_attribute_names(&[]);
        assert_eq!(names, vec![BUCKET_ATTRIBUTE, KEY_ATTRIBUTE]);
    }

    #[test]
    fn test_unique_entries_keeps_first() {
        let entries = vec![
            DeleteEntry::new("a", "r1"),
            DeleteEntry::new("b", "r2"),
            DeleteEntry::new("a", "r3"),
        ];
        let unique = unique_entries(&entries);
        assert_eq!(
            unique,
            vec![DeleteEntry::new("a", "r1"), DeleteEntry::new("b", "r2")]
        );
    }

    #[test]
    fn test_retrieve_options_builder() {
        let options = RetrieveOptions::default()
            .max_messages(3)
            .visibility_timeout(30)
            .attribute_names(["x"]);
        assert_eq!(options.max_messages, Some(3));
        assert_eq!(options.visibility_timeout, Some(30));
        assert_eq!(options.attribute_names, vec!["x".to_string()]);
    }
}
