//! Conversion of a raw key/value pair into the record the proxy expects.
//!
//! A [`Payload`] is what a producer extracted from a domain object. A
//! [`PayloadBuilder`] turns it into a [`Record`] whose value encoding matches
//! the message format: [`JsonBuilder`] passes the value through untouched,
//! [`BinaryBuilder`] base64-encodes it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key and value of a message before format-specific encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub key: Value,
    pub value: Value,
}

impl Payload {
    pub fn new(key: Value, value: Value) -> Self {
        Self { key, value }
    }
}

/// The `{key, value}` record placed in the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: Value,
    pub value: Value,
}

/// Format-specific encoding of a payload.
///
/// Implementations must be pure: building the same payload twice yields
/// identical records.
pub trait PayloadBuilder: Send + Sync {
    fn build(&self, payload: &Payload) -> Record;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBuilder;

impl PayloadBuilder for JsonBuilder {
    fn build(&self, payload: &Payload) -> Record {
        Record {
            key: payload.key.clone(),
            value: payload.value.clone(),
        }
    }
}

/// Base64-encodes the value; the key is passed through as is.
///
/// String values are encoded from their UTF-8 bytes. Any other non-null
/// value is encoded from its compact JSON text. `null` stays `null` so
/// tombstones survive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryBuilder;

impl PayloadBuilder for BinaryBuilder {
    fn build(&self, payload: &Payload) -> Record {
        let value = match &payload.value {
            Value::Null => Value::Null,
            Value::String(s) => Value::String(STANDARD.encode(s.as_bytes())),
            other => Value::String(STANDARD.encode(other.to_string().as_bytes())),
        };

        Record {
            key: payload.key.clone(),
            value,
        }
    }
}
