pub mod client;
pub mod config;
pub mod error;

pub mod producer;
pub mod sender;

pub use client::Client;
pub use config::Config;
pub use error::{Error, Result, TransmissionError};
pub use producer::{KeyStrategy, Message, MessageFormat, Producer, ProducerDefinition};
pub use sender::{DeliveryOutcome, DeliveryReport, HttpSender, OverflowPolicy, Sender, SenderRegistry};
