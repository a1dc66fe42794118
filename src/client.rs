//! Composition root tying configuration, producers and the shared sender.
//!
//! A [`Client`] owns one configuration and at most one sender. Every
//! producer created from a client (or any of its clones) hands its messages
//! to that same sender, which is built lazily on first use.
//!
//! # Example
//!
//! ```rust,no_run
//! use kafka_rest_producer::{Client, Config, KeyStrategy, ProducerDefinition};
//! use serde::Serialize;
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct Signup {
//!     user_id: u64,
//!     email: String,
//! }
//!
//! # fn main() -> kafka_rest_producer::Result<()> {
//! let client = Client::new(Config::default())?;
//! client.configure(|config| {
//!     config.url = "http://rest-proxy:8082".to_string();
//!     Ok(())
//! })?;
//!
//! let signups = client.producer(
//!     ProducerDefinition::<Signup>::new("signups").key(KeyStrategy::field("user_id")),
//! );
//! signups.send(&Signup { user_id: 7, email: "a@example.com".to_string() })?;
//!
//! client.shutdown(Duration::from_secs(5))?;
//! # Ok(())
//! # }
//! ```

use crate::producer::{Producer, ProducerDefinition};
use crate::sender::{Sender, SenderRegistry};
use crate::{Config, Result};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    config: RwLock<Config>,
    registry: SenderRegistry,
    sender: OnceLock<Arc<dyn Sender>>,
    sender_init: Mutex<()>,
}

impl Client {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_registry(config, SenderRegistry::default())
    }

    /// Creates a client whose configuration may name any sender in `registry`.
    pub fn with_registry(config: Config, registry: SenderRegistry) -> Result<Self> {
        config.validate(&registry)?;

        Ok(Self {
            inner: Arc::new(Inner {
                config: RwLock::new(config),
                registry,
                sender: OnceLock::new(),
                sender_init: Mutex::new(()),
            }),
        })
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mutates the configuration through `f`.
    ///
    /// `f` works on a copy which replaces the live configuration only if
    /// `f` succeeds and the result validates; otherwise nothing changes.
    /// A sender that is already running keeps the settings it was built
    /// with.
    pub fn configure<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Config) -> Result<()>,
    {
        let mut config = self
            .inner
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let mut candidate = config.clone();
        f(&mut candidate)?;
        candidate.validate(&self.inner.registry)?;

        *config = candidate;
        info!(
            url = %config.url,
            format = %config.message_format,
            sender = %config.sender,
            "Configuration updated"
        );
        Ok(())
    }

    /// Binds `definition` to this client. The message format defaults to
    /// the configured one when the definition does not set it.
    pub fn producer<T>(&self, definition: ProducerDefinition<T>) -> Producer<T> {
        let format = self
            .inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .message_format;

        Producer::new(definition, format, self.clone())
    }

    /// The shared sender, built from the current configuration on first call.
    pub fn sender(&self) -> Result<Arc<dyn Sender>> {
        if let Some(sender) = self.inner.sender.get() {
            return Ok(Arc::clone(sender));
        }

        let _guard = self
            .inner
            .sender_init
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(sender) = self.inner.sender.get() {
            return Ok(Arc::clone(sender));
        }

        let config = self.config();
        let sender = self.inner.registry.build(&config)?;
        let _ = self.inner.sender.set(Arc::clone(&sender));

        info!(sender = %config.sender, "Sender initialized");
        Ok(sender)
    }

    pub fn is_sender_initialized(&self) -> bool {
        self.inner.sender.get().is_some()
    }

    /// Drains the shared sender, if it was ever built.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        match self.inner.sender.get() {
            Some(sender) => sender.shutdown(timeout),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config())
            .field("registry", &self.inner.registry)
            .field("sender_initialized", &self.is_sender_initialized())
            .finish()
    }
}
