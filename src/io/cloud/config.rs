//! Explicit configuration values for the service wrappers.
//!
//! Every wrapper takes its configuration by value at construction time; there
//! is no process-wide settings object. Each config can be deserialized with
//! `serde` (missing optional fields take their defaults) or read from
//! prefixed environment variables with `from_env`.

use crate::io::cloud::helpers::{config_from_env, parse_setting, required_setting};
use crate::io::cloud::traits::CloudResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: u32 = 300;
pub const DEFAULT_WAIT_TIME_SECS: u32 = 20;
pub const DEFAULT_MAX_MESSAGES: u32 = 10;
pub const DEFAULT_SHARD_COUNT: u32 = 50;

const fn default_visibility_timeout() -> u32 {
    DEFAULT_VISIBILITY_TIMEOUT_SECS
}

const fn default_wait_time() -> u32 {
    DEFAULT_WAIT_TIME_SECS
}

const fn default_max_messages() -> u32 {
    DEFAULT_MAX_MESSAGES
}

const fn default_shard_count() -> u32 {
    DEFAULT_SHARD_COUNT
}

// ============================================================================
// QueueConfig
// ============================================================================

/// Addressing and receive defaults for a family of queues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub region: String,
    pub account: String,
    #[serde(default)]
    pub queue_prefix: String,
    #[serde(default)]
    pub queue_suffix: String,
    #[serde(default = "default_visibility_timeout")]
    pub default_visibility_timeout: u32,
    #[serde(default = "default_wait_time")]
    pub wait_time_secs: u32,
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
}

impl QueueConfig {
    pub fn new(region: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account: account.into(),
            queue_prefix: String::new(),
            queue_suffix: String::new(),
            default_visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT_SECS,
            wait_time_secs: DEFAULT_WAIT_TIME_SECS,
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.queue_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.queue_suffix = suffix.into();
        self
    }

    #[must_use]
    pub const fn with_default_visibility_timeout(mut self, secs: u32) -> Self {
        self.default_visibility_timeout = secs;
        self
    }

    /// Full URL of the queue called `name`.
    #[must_use]
    pub fn queue_url(&self, name: &str) -> String {
        format!(
            "https://sqs.{}.amazonaws.com/{}/{}{}{}",
            self.region, self.account, self.queue_prefix, name, self.queue_suffix
        )
    }

    /// Read `<prefix>REGION`, `<prefix>ACCOUNT`, `<prefix>QUEUE_PREFIX`,
    /// `<prefix>QUEUE_SUFFIX`, `<prefix>DEFAULT_VISIBILITY_TIMEOUT`,
    /// `<prefix>WAIT_TIME_SECS` and `<prefix>MAX_MESSAGES`.
    ///
    /// # Errors
    ///
    /// See [`QueueConfig::from_settings`]
    pub fn from_env(prefix: &str) -> CloudResult<Self> {
        Self::from_settings(&config_from_env(prefix))
    }

    /// Build from lowercase setting names, as produced by [`config_from_env`].
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error if region or account is missing, or a
    /// numeric setting does not parse
    pub fn from_settings(settings: &HashMap<String, String>) -> CloudResult<Self> {
        Ok(Self {
            region: required_setting(settings, "region")?,
            account: required_setting(settings, "account")?,
            queue_prefix: settings.get("queue_prefix").cloned().unwrap_or_default(),
            queue_suffix: settings.get("queue_suffix").cloned().unwrap_or_default(),
            default_visibility_timeout: parse_setting(
                settings,
                "default_visibility_timeout",
                DEFAULT_VISIBILITY_TIMEOUT_SECS,
            )?,
            wait_time_secs: parse_setting(settings, "wait_time_secs", DEFAULT_WAIT_TIME_SECS)?,
            max_messages: parse_setting(settings, "max_messages", DEFAULT_MAX_MESSAGES)?,
        })
    }
}

// ============================================================================
// ExtendedConfig
// ============================================================================

/// Overflow-store settings for oversized queue payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedConfig {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default = "default_shard_count")]
    pub shard_count: u32,
    /// Blobs are written with an expiry this many seconds after upload.
    #[serde(default)]
    pub retention_secs: Option<u64>,
}

impl Default for ExtendedConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            shard_count: DEFAULT_SHARD_COUNT,
            retention_secs: None,
        }
    }
}

impl ExtendedConfig {
    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn shard_count(mut self, shard_count: u32) -> Self {
        self.shard_count = shard_count;
        self
    }

    #[must_use]
    pub const fn retention_secs(mut self, secs: u64) -> Self {
        self.retention_secs = Some(secs);
        self
    }

    /// Read `<prefix>BUCKET`, `<prefix>SHARD_COUNT` and `<prefix>RETENTION_SECS`.
    ///
    /// # Errors
    ///
    /// See [`ExtendedConfig::from_settings`]
    pub fn from_env(prefix: &str) -> CloudResult<Self> {
        Self::from_settings(&config_from_env(prefix))
    }

    /// Build from lowercase setting names, as produced by [`config_from_env`].
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error if a numeric setting does not parse
    pub fn from_settings(settings: &HashMap<String, String>) -> CloudResult<Self> {
        let retention_secs = match settings.get("retention_secs") {
            Some(_) => Some(parse_setting(settings, "retention_secs", 0u64)?),
            None => None,
        };
        Ok(Self {
            bucket: settings.get("bucket").filter(|b| !b.is_empty()).cloned(),
            shard_count: parse_setting(settings, "shard_count", DEFAULT_SHARD_COUNT)?,
            retention_secs,
        })
    }
}

// ============================================================================
// TopicConfig
// ============================================================================

/// Addressing and defaults for pub/sub topics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub region: String,
    pub account: String,
    #[serde(default)]
    pub arn_suffix: String,
    #[serde(default)]
    pub default_subject: String,
}

impl TopicConfig {
    pub fn new(region: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account: account.into(),
            arn_suffix: String::new(),
            default_subject: String::new(),
        }
    }

    #[must_use]
    pub fn with_arn_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.arn_suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn with_default_subject(mut self, subject: impl Into<String>) -> Self {
        self.default_subject = subject.into();
        self
    }

    /// ARN of the topic called `name`.
    #[must_use]
    pub fn topic_arn(&self, name: &str) -> String {
        format!(
            "arn:aws:sns:{}:{}:sns-{}{}",
            self.region, self.account, name, self.arn_suffix
        )
    }

    /// Read `<prefix>REGION`, `<prefix>ACCOUNT`, `<prefix>ARN_SUFFIX` and
    /// `<prefix>DEFAULT_SUBJECT`.
    ///
    /// # Errors
    ///
    /// See [`TopicConfig::from_settings`]
    pub fn from_env(prefix: &str) -> CloudResult<Self> {
        Self::from_settings(&config_from_env(prefix))
    }

    /// Build from lowercase setting names, as produced by [`config_from_env`].
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error if region or account is missing
    pub fn from_settings(settings: &HashMap<String, String>) -> CloudResult<Self> {
        Ok(Self {
            region: required_setting(settings, "region")?,
            account: required_setting(settings, "account")?,
            arn_suffix: settings.get("arn_suffix").cloned().unwrap_or_default(),
            default_subject: settings.get("default_subject").cloned().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::cloud::traits::ErrorKind;

    #[test]
    fn test_queue_url() {
        let config = QueueConfig::new("Winterfel", "Stark")
            .with_prefix("etl_")
            .with_suffix("_ending");
        assert_eq!(
            config.queue_url("webhooks"),
            "https://sqs.Winterfel.amazonaws.com/Stark/etl_webhooks_ending"
        );
    }

    #[test]
    fn test_queue_url_without_affixes() {
        let config = QueueConfig::new("Winterfel", "Stark");
        assert_eq!(
            config.queue_url("webhooks"),
            "https://sqs.Winterfel.amazonaws.com/Stark/webhooks"
        );
    }

    #[test]
    fn test_queue_config_deserialize_defaults() {
        let config: QueueConfig =
            serde_json::from_str(r#"{"region":"us-east-1","account":"123"}"#).unwrap();
        assert_eq!(config.default_visibility_timeout, 300);
        assert_eq!(config.wait_time_secs, 20);
        assert_eq!(config.max_messages, 10);
        assert!(config.queue_prefix.is_empty());
    }

    #[test]
    fn test_extended_config_defaults() {
        let config: ExtendedConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ExtendedConfig::default());
        assert_eq!(config.shard_count, 50);
        assert!(config.bucket.is_none());
    }

    #[test]
    fn test_topic_arn() {
        let config = TopicConfig::new("Winterfel", "Stark").with_arn_suffix("-prd");
        assert_eq!(
            config.topic_arn("events"),
            "arn:aws:sns:Winterfel:Stark:sns-events-prd"
        );
    }

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_queue_config_from_settings() {
        let config = QueueConfig::from_settings(&settings(&[
            ("region", "eu-west-1"),
            ("account", "42"),
            ("queue_suffix", "_dev"),
            ("default_visibility_timeout", "60"),
        ]))
        .unwrap();
        assert_eq!(config.queue_url("jobs"), "https://sqs.eu-west-1.amazonaws.com/42/jobs_dev");
        assert_eq!(config.default_visibility_timeout, 60);
        assert_eq!(config.wait_time_secs, 20);
        assert_eq!(config.max_messages, 10);
    }

    #[test]
    fn test_queue_config_requires_account() {
        let err = QueueConfig::from_settings(&settings(&[("region", "eu-west-1")])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn test_queue_config_rejects_bad_number() {
        let err = QueueConfig::from_settings(&settings(&[
            ("region", "eu-west-1"),
            ("account", "42"),
            ("max_messages", "ten"),
        ]))
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn test_extended_config_from_settings() {
        let config = ExtendedConfig::from_settings(&settings(&[
            ("bucket", "overflow"),
            ("retention_secs", "86400"),
        ]))
        .unwrap();
        assert_eq!(config.bucket.as_deref(), Some("overflow"));
        assert_eq!(config.shard_count, 50);
        assert_eq!(config.retention_secs, Some(86400));

        let empty = ExtendedConfig::from_settings(&settings(&[("bucket", "")])).unwrap();
        assert_eq!(empty, ExtendedConfig::default());
    }

    #[test]
    fn test_topic_config_from_settings() {
        let config = TopicConfig::from_settings(&settings(&[
            ("region", "Winterfel"),
            ("account", "Stark"),
            ("default_subject", "notice"),
        ]))
        .unwrap();
        assert_eq!(config.topic_arn("events"), "arn:aws:sns:Winterfel:Stark:sns-events");
        assert_eq!(config.default_subject, "notice");
    }

    // The only test in this crate that touches the process environment.
    #[test]
    fn test_from_env_reads_prefixed_variables() {
        // SAFETY: no other test in this binary reads or writes the environment.
        unsafe {
            std::env::set_var("CLOUDWRAP_CFG_TEST_REGION", "eu-west-1");
            std::env::set_var("CLOUDWRAP_CFG_TEST_ACCOUNT", "42");
            std::env::set_var("CLOUDWRAP_CFG_TEST_BUCKET", "overflow");
        }
        let queue = QueueConfig::from_env("CLOUDWRAP_CFG_TEST_").unwrap();
        let extended = ExtendedConfig::from_env("CLOUDWRAP_CFG_TEST_").unwrap();
        let topic = TopicConfig::from_env("CLOUDWRAP_CFG_TEST_").unwrap();

        assert_eq!(queue.queue_url("jobs"), "https://sqs.eu-west-1.amazonaws.com/42/jobs");
        assert_eq!(extended.bucket.as_deref(), Some("overflow"));
        assert_eq!(topic.topic_arn("events"), "arn:aws:sns:eu-west-1:42:sns-events");
    }
}
