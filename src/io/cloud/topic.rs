//! Publishing to pub/sub topics addressed by short name.

use crate::io::cloud::config::TopicConfig;
use crate::io::cloud::traits::{CloudIOError, TopicIO, TopicMessage};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised while publishing
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("message serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("topic transport failed: {0}")]
    Transport(#[source] CloudIOError),
}

#[derive(Clone)]
pub struct TopicPublisher {
    topic: Arc<dyn TopicIO>,
    config: TopicConfig,
}

impl TopicPublisher {
    pub fn new(topic: Arc<dyn TopicIO>, config: TopicConfig) -> Self {
        Self { topic, config }
    }

    #[must_use]
    pub fn topic_arn(&self, topic_name: &str) -> String {
        self.config.topic_arn(topic_name)
    }

    /// Publish `message` as JSON, returning the message id.
    ///
    /// An empty or missing `subject` falls back to the configured default.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Serialization`] without publishing if the
    /// message cannot be serialized, or [`PublishError::Transport`] if the
    /// publish fails
    pub fn publish<T>(
        &self,
        topic_name: &str,
        message: &T,
        subject: Option<&str>,
    ) -> Result<String, PublishError>
    where
        T: Serialize + ?Sized,
    {
        let text = serde_json::to_string(message).map_err(PublishError::Serialization)?;
        self.publish_text(topic_name, text, subject)
    }

    /// Publish a text message verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Transport`] if the publish fails
    pub fn publish_text(
        &self,
        topic_name: &str,
        message: impl Into<String>,
        subject: Option<&str>,
    ) -> Result<String, PublishError> {
        let subject = subject
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.config.default_subject);
        let message = TopicMessage {
            topic_arn: self.topic_arn(topic_name),
            message: message.into(),
            subject: subject.to_string(),
        };

        let id = self.topic.publish(&message).map_err(PublishError::Transport)?;
        debug!(topic = %message.topic_arn, message_id = %id, "published message");
        Ok(id)
    }
}
