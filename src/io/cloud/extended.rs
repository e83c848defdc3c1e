//! Extended message payloads: transparent offloading of oversized queue bodies.
//!
//! A queue caps each message at [`MAX_MESSAGE_SIZE`] bytes. The
//! [`ExtendedMessageCodec`] turns a serialized payload into a transport-ready
//! body, and back:
//!
//! - every payload is compressed with the configured [`CompressionCodec`]
//!   (stored-only framing below [`COMPRESSION_THRESHOLD`])
//! - a payload whose estimated wire size reaches the ceiling is uploaded to the
//!   blob store and replaced by a *pointer message*: body [`POINTER_BODY`] plus
//!   the [`BUCKET_ATTRIBUTE`] and [`KEY_ATTRIBUTE`] attributes
//! - anything else travels inline as base64 of the compressed bytes
//!
//! Decoding is the mirror image. A message carrying both reserved attributes is
//! fetched from the blob store; otherwise its own body is used.
//!
//! ## Failure isolation
//!
//! Encoding failures abort the send. Decoding failures are per message:
//! [`ExtendedMessageCodec::decode_batch`] returns one [`ReceivedEnvelope`] per
//! input, in input order, each holding either a payload or the error that
//! message produced.

use crate::io::cloud::config::ExtendedConfig;
use crate::io::cloud::helpers::validate_resource_name;
use crate::io::cloud::sizing::estimate_message_size;
use crate::io::cloud::traits::{
    CloudIOError, MessageAttributeValue, MessageAttributes, ObjectIO, PutOptions, QueueMessage,
};
use crate::io::compression::{CompressionCodec, CompressionLevel, GzipCodec, has_magic};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
#[cfg(feature = "parallel-io")]
use rayon::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Attribute naming the bucket of an offloaded payload.
pub const BUCKET_ATTRIBUTE: &str = "EXTENDED_S3_BUCKET";
/// Attribute naming the key of an offloaded payload.
pub const KEY_ATTRIBUTE: &str = "EXTENDED_S3_KEY";
/// Body of every pointer message.
pub const POINTER_BODY: &str = "true";
/// Hard per-message ceiling of the queue, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 262_144;
/// Estimated sizes below this are framed without compression effort.
pub const COMPRESSION_THRESHOLD: usize = 65_536;

/// Errors raised while encoding, sending, receiving or decoding messages.
#[derive(Debug, Error)]
pub enum ExtendedError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("payload serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("blob store unavailable: {0}")]
    StoreUnavailable(#[source] CloudIOError),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("queue transport failed: {0}")]
    Transport(#[source] CloudIOError),
}

/// Transport-ready body and attributes produced by [`ExtendedMessageCodec::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage {
    pub body: String,
    pub attributes: MessageAttributes,
    pub offloaded: bool,
    pub estimated_size: usize,
}

/// Result of decoding one received message.
///
/// The original message is always kept so the caller can delete it, change
/// its visibility, or route it to a dead-letter queue when decoding failed.
#[derive(Debug)]
pub struct ReceivedEnvelope<T> {
    pub message: QueueMessage,
    pub outcome: Result<T, ExtendedError>,
}

impl<T> ReceivedEnvelope<T> {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    #[must_use]
    pub fn payload(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    #[must_use]
    pub fn error(&self) -> Option<&ExtendedError> {
        self.outcome.as_ref().err()
    }

    /// Split into the original message and the decode outcome.
    pub fn into_parts(self) -> (QueueMessage, Result<T, ExtendedError>) {
        (self.message, self.outcome)
    }
}

/// Bucket and key of an offloaded payload, if `attributes` describe a pointer.
///
/// Both reserved attributes must be present as string values.
#[must_use]
pub fn pointer_location(attributes: &MessageAttributes) -> Option<(&str, &str)> {
    let bucket = attributes.get(BUCKET_ATTRIBUTE)?.as_str()?;
    let key = attributes.get(KEY_ATTRIBUTE)?.as_str()?;
    Some((bucket, key))
}

/// Encode/decode policy for extended queue payloads.
#[derive(Clone)]
pub struct ExtendedMessageCodec {
    store: Arc<dyn ObjectIO>,
    codec: Arc<dyn CompressionCodec>,
    config: ExtendedConfig,
}

impl ExtendedMessageCodec {
    /// Codec backed by `store`, using gzip framing.
    pub fn new(store: Arc<dyn ObjectIO>, config: ExtendedConfig) -> Self {
        Self {
            store,
            codec: Arc::new(GzipCodec),
            config,
        }
    }

    #[must_use]
    pub fn with_compression(mut self, codec: Arc<dyn CompressionCodec>) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ExtendedConfig {
        &self.config
    }

    fn bucket(&self) -> Result<&str, ExtendedError> {
        let bucket = self.config.bucket.as_deref().ok_or_else(|| {
            ExtendedError::Configuration("no blob store bucket configured".to_string())
        })?;
        validate_resource_name(bucket).map_err(|e| ExtendedError::Configuration(e.message))?;
        Ok(bucket)
    }

    fn pointer_key(&self) -> Result<String, ExtendedError> {
        if self.config.shard_count == 0 {
            return Err(ExtendedError::Configuration(
                "shard count must be at least 1".to_string(),
            ));
        }
        let shard = rand::rng().random_range(0..self.config.shard_count);
        Ok(format!(
            "/{shard}/{}{}",
            Uuid::new_v4(),
            self.codec.extension()
        ))
    }

    fn put_options(&self) -> PutOptions {
        let expires_at = self.config.retention_secs.map(|secs| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs());
            i64::try_from(now.saturating_add(secs)).unwrap_or(i64::MAX)
        });
        PutOptions {
            content_encoding: Some(self.codec.content_encoding().to_string()),
            expires_at,
        }
    }

    /// Serialize `payload` to JSON, then [`encode`](Self::encode) it.
    ///
    /// # Errors
    ///
    /// Returns [`ExtendedError::Serialization`] before any store call if the
    /// payload cannot be serialized, otherwise whatever `encode` returns
    pub fn encode_value<T>(
        &self,
        payload: &T,
        attributes: MessageAttributes,
    ) -> Result<EncodedMessage, ExtendedError>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_string(payload).map_err(ExtendedError::Serialization)?;
        self.encode(&body, attributes)
    }

    /// Turn an already-serialized body into a transport-ready message.
    ///
    /// # Errors
    ///
    /// - [`ExtendedError::Configuration`] if no valid bucket or shard count is
    ///   configured, or the caller used a reserved attribute name
    /// - [`ExtendedError::Codec`] if compression fails
    /// - [`ExtendedError::StoreUnavailable`] if the offload upload fails
    pub fn encode(
        &self,
        body: &str,
        mut attributes: MessageAttributes,
    ) -> Result<EncodedMessage, ExtendedError> {
        let bucket = self.bucket()?;
        if attributes.contains_key(BUCKET_ATTRIBUTE) || attributes.contains_key(KEY_ATTRIBUTE) {
            return Err(ExtendedError::Configuration(format!(
                "attributes {BUCKET_ATTRIBUTE} and {KEY_ATTRIBUTE} are reserved"
            )));
        }

        let estimated_size = estimate_message_size(body.as_bytes(), &attributes);
        let level = if estimated_size < COMPRESSION_THRESHOLD {
            CompressionLevel::None
        } else {
            CompressionLevel::Default
        };

        let compressed = self
            .codec
            .compress(body.as_bytes(), level)
            .map_err(|e| ExtendedError::Codec(format!("compression failed: {e}")))?;

        if estimated_size < MAX_MESSAGE_SIZE {
            debug!(estimated_size, compressed = compressed.len(), "encoding payload inline");
            return Ok(EncodedMessage {
                body: STANDARD.encode(&compressed),
                attributes,
                offloaded: false,
                estimated_size,
            });
        }

        let key = self.pointer_key()?;
        self.store
            .put_object(bucket, &key, &compressed, &self.put_options())
            .map_err(ExtendedError::StoreUnavailable)?;
        info!(
            bucket,
            key = %key,
            codec = self.codec.name(),
            estimated_size,
            compressed = compressed.len(),
            "offloaded oversized payload to blob store"
        );

        attributes.insert(
            BUCKET_ATTRIBUTE.to_string(),
            MessageAttributeValue::string(bucket),
        );
        attributes.insert(KEY_ATTRIBUTE.to_string(), MessageAttributeValue::string(key));

        Ok(EncodedMessage {
            body: POINTER_BODY.to_string(),
            attributes,
            offloaded: true,
            estimated_size,
        })
    }

    /// Recover the payload of one received message.
    ///
    /// # Errors
    ///
    /// - [`ExtendedError::StoreUnavailable`] if a pointer's blob cannot be fetched
    /// - [`ExtendedError::Codec`] if the body is not valid base64, does not
    ///   decompress, or is not valid JSON for `T`
    pub fn decode<T: DeserializeOwned>(&self, message: &QueueMessage) -> Result<T, ExtendedError> {
        let compressed = match pointer_location(&message.attributes) {
            Some((bucket, key)) => self
                .store
                .get_object(bucket, key)
                .map_err(ExtendedError::StoreUnavailable)?,
            None => STANDARD
                .decode(message.body.as_bytes())
                .map_err(|e| ExtendedError::Codec(format!("body is not base64: {e}")))?,
        };

        if !has_magic(&*self.codec, &compressed) {
            return Err(ExtendedError::Codec(format!(
                "payload is not a {} frame",
                self.codec.name()
            )));
        }
        let raw = self
            .codec
            .decompress(&compressed)
            .map_err(|e| ExtendedError::Codec(format!("decompression failed: {e}")))?;

        serde_json::from_slice(&raw)
            .map_err(|e| ExtendedError::Codec(format!("payload is not valid JSON: {e}")))
    }

    /// Decode one message into an envelope, logging failures.
    pub fn decode_envelope<T>(&self, message: QueueMessage) -> ReceivedEnvelope<T>
    where
        T: DeserializeOwned,
    {
        let outcome = self.decode(&message);
        if let Err(err) = &outcome {
            warn!(message_id = %message.id, error = %err, "failed to decode queue message");
        }
        ReceivedEnvelope { message, outcome }
    }

    /// Decode every message independently, preserving input order.
    #[cfg(feature = "parallel-io")]
    pub fn decode_batch<T>(&self, messages: Vec<QueueMessage>) -> Vec<ReceivedEnvelope<T>>
    where
        T: DeserializeOwned + Send,
    {
        messages
            .into_par_iter()
            .map(|message| self.decode_envelope(message))
            .collect()
    }

    /// Decode every message independently, preserving input order.
    #[cfg(not(feature = "parallel-io"))]
    pub fn decode_batch<T>(&self, messages: Vec<QueueMessage>) -> Vec<ReceivedEnvelope<T>>
    where
        T: DeserializeOwned + Send,
    {
        messages
            .into_iter()
            .map(|message| self.decode_envelope(message))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::cloud::fake::FakeObjectIO;
    use crate::io::cloud::traits::ErrorKind;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    fn codec(store: &FakeObjectIO) -> ExtendedMessageCodec {
        ExtendedMessageCodec::new(Arc::new(store.clone()), ExtendedConfig::with_bucket("test"))
    }

    fn received(encoded: &EncodedMessage) -> QueueMessage {
        QueueMessage {
            id: "m-1".to_string(),
            receipt_handle: "r-1".to_string(),
            body: encoded.body.clone(),
            attributes: encoded.attributes.clone(),
            receive_count: 1,
        }
    }

    #[test]
    fn test_small_payload_is_inline_and_stored_only() {
        let store = FakeObjectIO::new();
        let codec = codec(&store);
        let mut attrs = MessageAttributes::new();
        attrs.insert("foo".to_string(), MessageAttributeValue::string("bar"));

        let encoded = codec.encode("abc", attrs.clone()).unwrap();

        let expected = GzipCodec.compress(b"abc", CompressionLevel::None).unwrap();
        assert_eq!(encoded.body, STANDARD.encode(expected));
        assert_eq!(encoded.attributes, attrs);
        assert!(!encoded.offloaded);
        assert_eq!(encoded.estimated_size, 4 + 6);
        assert_eq!(store.put_count(), 0);
    }

    #[test]
    fn test_large_payload_is_offloaded() {
        let store = FakeObjectIO::new();
        let codec = codec(&store);
        let payload = "x".repeat(300_000);

        let encoded = codec.encode(&payload, MessageAttributes::new()).unwrap();

        assert!(encoded.offloaded);
        assert_eq!(encoded.body, POINTER_BODY);
        assert_eq!(store.put_count(), 1);
        let (bucket, key) = pointer_location(&encoded.attributes).unwrap();
        assert_eq!(bucket, "test");

        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].is_empty());
        let shard: u32 = parts[1].parse().unwrap();
        assert!(shard < 50);
        let file = parts[2].strip_suffix(".json.gz").unwrap();
        assert!(Uuid::parse_str(file).is_ok());

        let stored = store.get_object("test", key).unwrap();
        assert_eq!(GzipCodec.decompress(&stored).unwrap(), payload.as_bytes());
        assert_eq!(
            store.put_options("test", key).unwrap().content_encoding.as_deref(),
            Some("gzip")
        );
    }

    #[test]
    fn test_threshold_boundaries() {
        let store = FakeObjectIO::new();
        let codec = codec(&store);

        // 196_605 raw bytes encode to 262_140 base64 bytes; 196_608 to 262_144.
        let below = codec.encode(&"y".repeat(196_605), MessageAttributes::new()).unwrap();
        assert!(!below.offloaded);

        let at = codec.encode(&"y".repeat(196_608), MessageAttributes::new()).unwrap();
        assert!(at.offloaded);
        assert_eq!(at.estimated_size, MAX_MESSAGE_SIZE);
        assert_eq!(store.put_count(), 1);
    }

    #[test]
    fn test_attributes_count_toward_ceiling() {
        let store = FakeObjectIO::new();
        let codec = codec(&store);
        let mut attrs = MessageAttributes::new();
        attrs.insert("pad".to_string(), MessageAttributeValue::string("p".repeat(200_000)));

        let encoded = codec.encode("{}", attrs).unwrap();
        assert!(encoded.offloaded);
        assert_eq!(encoded.attributes.len(), 3);
    }

    #[test]
    fn test_missing_bucket_is_configuration_error() {
        let store = FakeObjectIO::new();
        let codec = ExtendedMessageCodec::new(Arc::new(store.clone()), ExtendedConfig::default());

        let err = codec.encode("abc", MessageAttributes::new()).unwrap_err();
        assert!(matches!(err, ExtendedError::Configuration(_)));
        assert_eq!(store.put_count(), 0);
    }

    #[test]
    fn test_zero_shards_is_configuration_error() {
        let store = FakeObjectIO::new();
        let codec = ExtendedMessageCodec::new(
            Arc::new(store.clone()),
            ExtendedConfig::with_bucket("test").shard_count(0),
        );

        let err = codec.encode(&"z".repeat(300_000), MessageAttributes::new()).unwrap_err();
        assert!(matches!(err, ExtendedError::Configuration(_)));
        assert_eq!(store.put_count(), 0);
    }

    #[test]
    fn test_reserved_attribute_rejected() {
        let store = FakeObjectIO::new();
        let mut attrs = MessageAttributes::new();
        attrs.insert(KEY_ATTRIBUTE.to_string(), MessageAttributeValue::string("k"));

        let err = codec(&store).encode("abc", attrs).unwrap_err();
        assert!(matches!(err, ExtendedError::Configuration(_)));
    }

    #[test]
    fn test_serialization_failure_touches_nothing() {
        let store = FakeObjectIO::new();
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);

        let err = codec(&store)
            .encode_value(&bad, MessageAttributes::new())
            .unwrap_err();
        assert!(matches!(err, ExtendedError::Serialization(_)));
        assert_eq!(store.put_count(), 0);
    }

    #[test]
    fn test_store_failure_on_offload() {
        let store = FakeObjectIO::new();
        store.fail_puts(true);

        let err = codec(&store)
            .encode(&"q".repeat(300_000), MessageAttributes::new())
            .unwrap_err();
        match err {
            ExtendedError::StoreUnavailable(e) => assert_eq!(e.kind, ErrorKind::ServiceUnavailable),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_retention_sets_expiry() {
        let store = FakeObjectIO::new();
        let codec = ExtendedMessageCodec::new(
            Arc::new(store.clone()),
            ExtendedConfig::with_bucket("test").retention_secs(3600),
        );

        let encoded = codec.encode(&"r".repeat(300_000), MessageAttributes::new()).unwrap();
        let (_, key) = pointer_location(&encoded.attributes).unwrap();
        let expires_at = store.put_options("test", key).unwrap().expires_at.unwrap();
        assert!(expires_at > 1_600_000_000);
    }

    #[test]
    fn test_roundtrip_inline_and_offloaded() {
        let store = FakeObjectIO::new();
        let codec = codec(&store);

        for payload in [
            json!({"pay": "load", "n": [1, 2, 3]}),
            json!({"blob": "b".repeat(400_000)}),
        ] {
            let encoded = codec.encode_value(&payload, MessageAttributes::new()).unwrap();
            let decoded: Value = codec.decode(&received(&encoded)).unwrap();
            assert_eq!(decoded, payload);
        }
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.get_count(), 1);
    }

    #[test]
    fn test_single_pointer_attribute_is_not_a_pointer() {
        let mut attrs = MessageAttributes::new();
        attrs.insert(BUCKET_ATTRIBUTE.to_string(), MessageAttributeValue::string("b"));
        assert!(pointer_location(&attrs).is_none());

        attrs.insert(KEY_ATTRIBUTE.to_string(), MessageAttributeValue::binary(b"k".to_vec()));
        assert!(pointer_location(&attrs).is_none());
    }

    #[test]
    fn test_decode_errors() {
        let store = FakeObjectIO::new();
        let codec = codec(&store);
        let mut message = QueueMessage {
            id: "m".to_string(),
            receipt_handle: "r".to_string(),
            body: "not base64!".to_string(),
            attributes: MessageAttributes::new(),
            receive_count: 1,
        };

        let err = codec.decode::<Value>(&message).unwrap_err();
        assert!(matches!(err, ExtendedError::Codec(_)));

        message.body = STANDARD.encode(b"plain text, no frame");
        let err = codec.decode::<Value>(&message).unwrap_err();
        assert!(matches!(err, ExtendedError::Codec(_)));

        let frame = GzipCodec.compress(b"{not json", CompressionLevel::None).unwrap();
        message.body = STANDARD.encode(frame);
        let err = codec.decode::<Value>(&message).unwrap_err();
        assert!(matches!(err, ExtendedError::Codec(_)));

        message.body = POINTER_BODY.to_string();
        message
            .attributes
            .insert(BUCKET_ATTRIBUTE.to_string(), MessageAttributeValue::string("test"));
        message.attributes.insert(
            KEY_ATTRIBUTE.to_string(),
            MessageAttributeValue::string("/1/gone.json.gz"),
        );
        let err = codec.decode::<Value>(&message).unwrap_err();
        assert!(matches!(err, ExtendedError::StoreUnavailable(_)));
    }

    /// Uncompressed framing: a four-byte tag in front of the raw bytes.
    struct TaggedCodec;

    impl CompressionCodec for TaggedCodec {
        fn name(&self) -> &str {
            "tagged"
        }

        fn extension(&self) -> &str {
            ".json.raw"
        }

        fn content_encoding(&self) -> &str {
            "identity"
        }

        fn magic_bytes(&self) -> Option<&[u8]> {
            Some(b"RAW1")
        }

        fn compress(&self, data: &[u8], _level: CompressionLevel) -> std::io::Result<Vec<u8>> {
            Ok([b"RAW1".as_slice(), data].concat())
        }

        fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
            Ok(data[4..].to_vec())
        }
    }

    #[test]
    fn test_custom_compression_codec() {
        let store = FakeObjectIO::new();
        let codec = codec(&store).with_compression(Arc::new(TaggedCodec));
        let payload = json!({"blob": "c".repeat(300_000)});

        let encoded = codec.encode_value(&payload, MessageAttributes::new()).unwrap();
        let (_, key) = pointer_location(&encoded.attributes).unwrap();
        assert!(key.ends_with(".json.raw"));
        assert_eq!(
            store.put_options("test", key).unwrap().content_encoding.as_deref(),
            Some("identity")
        );
        let decoded: Value = codec.decode(&received(&encoded)).unwrap();
        assert_eq!(decoded, payload);

        // A gzip body is not a tagged frame.
        let gzip = GzipCodec.compress(b"{}", CompressionLevel::None).unwrap();
        let mut message = received(&encoded);
        message.attributes.clear();
        message.body = STANDARD.encode(gzip);
        match codec.decode::<Value>(&message).unwrap_err() {
            ExtendedError::Codec(msg) => assert!(msg.contains("tagged")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
