use super::payload::{BinaryBuilder, JsonBuilder, PayloadBuilder};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const JSON_CONTENT_TYPE: &str = "application/vnd.kafka.json.v2+json";
pub const BINARY_CONTENT_TYPE: &str = "application/vnd.kafka.binary.v2+json";

/// Wire format of a record's value as understood by the REST proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Json,
    Binary,
}

impl MessageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Json => "json",
            MessageFormat::Binary => "binary",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MessageFormat::Json => JSON_CONTENT_TYPE,
            MessageFormat::Binary => BINARY_CONTENT_TYPE,
        }
    }

    /// The payload builder responsible for this format.
    pub fn builder(&self) -> &'static dyn PayloadBuilder {
        match self {
            MessageFormat::Json => &JsonBuilder,
            MessageFormat::Binary => &BinaryBuilder,
        }
    }
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(MessageFormat::Json),
            "binary" => Ok(MessageFormat::Binary),
            _ => Err(Error::InvalidConfigValue {
                field: "message_format".to_string(),
                value: s.to_string(),
                expected: "one of: json, binary".to_string(),
            }),
        }
    }
}
