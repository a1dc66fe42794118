//! Error types and result handling for kafka-rest-producer.
//!
//! This module defines the main error type [`Error`], returned synchronously
//! to producers, and [`TransmissionError`], which describes failures that
//! happen on a worker thread after a message has been handed off. The
//! latter never reaches the caller of [`Producer::send`]; it is delivered
//! through [`DeliveryReport`]s instead.
//!
//! [`Producer::send`]: crate::producer::Producer::send
//! [`DeliveryReport`]: crate::sender::DeliveryReport
//!
//! # Example
//!
//! ```rust
//! use kafka_rest_producer::{Error, Result};
//!
//! fn pick_sender(name: &str) -> Result<()> {
//!     Err(Error::InvalidConfigValue {
//!         field: "sender".to_string(),
//!         value: name.to_string(),
//!         expected: "a registered sender".to_string(),
//!     })
//! }
//!
//! match pick_sender("carrier-pigeon") {
//!     Ok(()) => println!("Sender selected"),
//!     Err(Error::InvalidConfigValue { field, .. }) => eprintln!("Bad value for {}", field),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for kafka-rest-producer operations.
///
/// Every variant is raised on the calling thread: configuration problems,
/// key extraction failures and rejected submissions.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file or environment could not be loaded.
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// A configuration field was assigned a value it does not accept.
    #[error("Invalid value '{value}' for '{field}': {expected}")]
    InvalidConfigValue {
        /// Name of the rejected field
        field: String,
        /// The offending value, rendered as text
        value: String,
        /// What the field expects
        expected: String,
    },

    /// The producer's key rule failed for the given object.
    #[error("Key extraction failed for topic '{topic}': {reason}")]
    KeyExtraction {
        /// Topic of the producer whose key rule failed
        topic: String,
        /// Description of the failure
        reason: String,
    },

    /// The worker pool refused the message.
    #[error("Dispatch submission rejected for topic '{topic}': {reason}")]
    Submission {
        /// Topic of the rejected message
        topic: String,
        /// Why the pool refused it
        reason: String,
    },

    /// JSON serialization error when converting a domain object.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, typically from reading messages or starting worker threads.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failure observed by a worker while transmitting a message.
///
/// These are reported asynchronously and are never returned from
/// [`Producer::send`](crate::producer::Producer::send).
#[derive(Error, Debug, Clone)]
pub enum TransmissionError {
    /// The request could not be performed (connection, timeout, TLS...).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The proxy answered with a non-success status.
    #[error("Proxy responded with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// The record could not be turned into a request body.
    #[error("Failed to encode request body: {0}")]
    Encoding(String),

    /// The dispatch job panicked.
    #[error("Dispatch task panicked: {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for TransmissionError {
    fn from(err: reqwest::Error) -> Self {
        TransmissionError::Http(err.to_string())
    }
}

/// A convenient Result type alias for kafka-rest-producer operations.
///
/// This is equivalent to `std::result::Result<T, kafka_rest_producer::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_value_display() {
        let err = Error::InvalidConfigValue {
            field: "sender".to_string(),
            value: "nope".to_string(),
            expected: "one of: http".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Invalid value 'nope' for 'sender': one of: http"
        );
    }

    #[test]
    fn test_status_error_display() {
        let err = TransmissionError::Status {
            status: 422,
            body: "unprocessable".to_string(),
        };

        assert_eq!(err.to_string(), "Proxy responded with status 422: unprocessable");
    }
}
