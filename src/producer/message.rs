use super::format::MessageFormat;
use super::payload::{Payload, Record};

/// A single unit handed to a sender: target topic, format and built record.
///
/// Messages are immutable; a sender consumes each one exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    topic: String,
    format: MessageFormat,
    record: Record,
}

impl Message {
    /// Builds the record for `payload` with the builder `format` maps to.
    pub fn new(topic: impl Into<String>, format: MessageFormat, payload: &Payload) -> Self {
        Self {
            topic: topic.into(),
            format,
            record: format.builder().build(payload),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn format(&self) -> MessageFormat {
        self.format
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}
