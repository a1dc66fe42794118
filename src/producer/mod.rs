pub mod format;
pub mod key_strategy;
pub mod message;
pub mod payload;

#[cfg(test)]
mod tests;

pub use format::MessageFormat;
pub use key_strategy::KeyStrategy;
pub use message::Message;
pub use payload::{BinaryBuilder, JsonBuilder, Payload, PayloadBuilder, Record};

use crate::{Client, Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, instrument};

/// Per-topic template: what to publish to, in which format, keyed how.
///
/// Definitions are plain values built once at startup and turned into
/// [`Producer`]s through [`Client::producer`].
pub struct ProducerDefinition<T> {
    topic: String,
    format: Option<MessageFormat>,
    key: KeyStrategy<T>,
}

impl<T> ProducerDefinition<T> {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            format: None,
            key: KeyStrategy::None,
        }
    }

    /// Overrides the client's default message format.
    pub fn format(mut self, format: MessageFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn key(mut self, key: KeyStrategy<T>) -> Self {
        self.key = key;
        self
    }

    pub fn key_fn<F>(self, f: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.key(KeyStrategy::function(f))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl<T> Clone for ProducerDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            format: self.format,
            key: self.key.clone(),
        }
    }
}

impl<T> fmt::Debug for ProducerDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerDefinition")
            .field("topic", &self.topic)
            .field("format", &self.format)
            .field("key", &self.key)
            .finish()
    }
}

/// A producer bound to a client: builds messages from `T` and hands them to
/// the client's shared sender.
pub struct Producer<T> {
    topic: String,
    format: MessageFormat,
    key: KeyStrategy<T>,
    client: Client,
}

impl<T> Producer<T> {
    pub(crate) fn new(definition: ProducerDefinition<T>, default_format: MessageFormat, client: Client) -> Self {
        Self {
            topic: definition.topic,
            format: definition.format.unwrap_or(default_format),
            key: definition.key,
            client,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn format(&self) -> MessageFormat {
        self.format
    }

    pub fn key(&self) -> &KeyStrategy<T> {
        &self.key
    }
}

impl<T: Serialize> Producer<T> {
    /// Builds the message for `object` on the calling thread.
    ///
    /// # Errors
    ///
    /// - [`Error::Serialization`] if `object` cannot be converted to JSON
    /// - [`Error::KeyExtraction`] if the key rule fails for `object`
    pub fn build_message(&self, object: &T) -> Result<Message> {
        let value = serde_json::to_value(object)?;
        let key = self
            .key
            .extract_key(object, &value)
            .map_err(|reason| Error::KeyExtraction {
                topic: self.topic.clone(),
                reason,
            })?;

        Ok(Message::new(self.topic.as_str(), self.format, &Payload::new(key, value)))
    }

    /// Builds the message for `object` and enqueues it on the shared sender.
    ///
    /// Returns as soon as the message is accepted; delivery happens on a
    /// worker thread and its outcome is only visible through delivery
    /// reports.
    ///
    /// # Errors
    ///
    /// Everything [`build_message`](Self::build_message) returns, plus
    /// configuration errors from building the sender and
    /// [`Error::Submission`] when the worker pool refuses the message.
    #[instrument(skip_all, fields(topic = %self.topic, format = %self.format))]
    pub fn send(&self, object: &T) -> Result<()> {
        let message = self.build_message(object)?;
        let sender = self.client.sender()?;

        sender.send(message)?;
        debug!("Message handed to sender");
        Ok(())
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            format: self.format,
            key: self.key.clone(),
            client: self.client.clone(),
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("topic", &self.topic)
            .field("format", &self.format)
            .field("key", &self.key)
            .finish()
    }
}
