//! Asynchronous dispatch of built messages.
//!
//! A [`Sender`] accepts a [`Message`] and returns as soon as it has been
//! queued. The default implementation, [`HttpSender`], owns a bounded
//! [`WorkerPool`](pool::WorkerPool) whose workers POST each message to the
//! REST proxy and publish a [`DeliveryReport`] for it.
//!
//! Sender implementations are selected by name through a [`SenderRegistry`];
//! the configured name is checked against the registry before a
//! configuration is accepted.

pub mod http;
pub mod pool;
pub mod report;
pub mod transport;

pub use http::HttpSender;
pub use pool::{OverflowPolicy, PoolOptions, PoolStats, WorkerPool};
pub use report::{DeliveryOutcome, DeliveryReport, ReportHook};
pub use transport::{HttpTransport, SerializationAdapter, Transport, TransportRequest};

use crate::producer::Message;
use crate::{Config, Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Name of the built-in HTTP sender.
pub const DEFAULT_SENDER: &str = "http";

/// Fire-and-forget dispatch of messages.
pub trait Sender: Send + Sync {
    /// Queues `message` for transmission without waiting for it.
    ///
    /// An `Err` means the message was not accepted. `Ok` says nothing about
    /// whether it will reach the proxy.
    fn send(&self, message: Message) -> Result<()>;

    /// Stops accepting messages and waits up to `timeout` for queued ones.
    fn shutdown(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

pub type SenderFactory = Arc<dyn Fn(&Config) -> Result<Arc<dyn Sender>> + Send + Sync>;

/// Named sender implementations a configuration may choose from.
#[derive(Clone)]
pub struct SenderRegistry {
    factories: BTreeMap<String, SenderFactory>,
}

impl SenderRegistry {
    /// A registry without any sender, not even the HTTP one.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Config) -> Result<Arc<dyn Sender>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Builds the sender named by `config.sender`.
    pub fn build(&self, config: &Config) -> Result<Arc<dyn Sender>> {
        let factory = self
            .factories
            .get(&config.sender)
            .ok_or_else(|| Error::InvalidConfigValue {
                field: "sender".to_string(),
                value: config.sender.clone(),
                expected: format!(
                    "a registered sender implementation (one of: {})",
                    self.names().join(", ")
                ),
            })?;

        factory(config)
    }
}

impl Default for SenderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DEFAULT_SENDER, |config: &Config| {
            Ok(Arc::new(HttpSender::from_config(config)?) as Arc<dyn Sender>)
        });
        registry
    }
}

impl fmt::Debug for SenderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderRegistry")
            .field("names", &self.names())
            .finish()
    }
}
