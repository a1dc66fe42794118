use crate::producer::MessageFormat;
use crate::sender::pool::{OverflowPolicy, PoolOptions};
use crate::sender::{ReportHook, SenderRegistry, SerializationAdapter, DEFAULT_SENDER};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Settings shared by every producer and the sender built from them.
///
/// Values are read when a sender or producer is constructed, never per send.
/// Only the plain fields are loaded from files; the adapter and report hook
/// are set programmatically.
#[derive(Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub message_format: MessageFormat,
    #[serde(default = "default_worker_threads")]
    pub worker_min_threads: usize,
    #[serde(default = "default_worker_threads")]
    pub worker_max_threads: usize,
    #[serde(default)]
    pub worker_max_queue: Option<usize>,
    #[serde(default)]
    pub worker_overflow: OverflowPolicy,
    #[serde(default = "default_sender")]
    pub sender: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(skip)]
    pub serialization_adapter: Option<SerializationAdapter>,
    #[serde(skip)]
    pub report_hook: Option<ReportHook>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("KAFKA_REST")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("KAFKA_REST")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Endpoint messages for `topic` are posted to.
    pub fn topic_url(&self, topic: &str) -> String {
        format!("{}/topics/{}", self.url.trim_end_matches('/'), topic)
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            min_threads: self.worker_min_threads,
            max_threads: self.worker_max_threads,
            max_queue: self.worker_max_queue,
            overflow: self.worker_overflow,
        }
    }

    /// Checks the fields that would otherwise fail later, on first send.
    pub fn validate(&self, registry: &SenderRegistry) -> Result<()> {
        if !registry.contains(&self.sender) {
            return Err(Error::InvalidConfigValue {
                field: "sender".to_string(),
                value: self.sender.clone(),
                expected: format!(
                    "a registered sender implementation (one of: {})",
                    registry.names().join(", ")
                ),
            });
        }

        self.pool_options().validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            message_format: MessageFormat::default(),
            worker_min_threads: default_worker_threads(),
            worker_max_threads: default_worker_threads(),
            worker_max_queue: None,
            worker_overflow: OverflowPolicy::default(),
            sender: default_sender(),
            request_timeout_secs: default_request_timeout_secs(),
            serialization_adapter: None,
            report_hook: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("message_format", &self.message_format)
            .field("worker_min_threads", &self.worker_min_threads)
            .field("worker_max_threads", &self.worker_max_threads)
            .field("worker_max_queue", &self.worker_max_queue)
            .field("worker_overflow", &self.worker_overflow)
            .field("sender", &self.sender)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("serialization_adapter", &self.serialization_adapter.is_some())
            .field("report_hook", &self.report_hook.is_some())
            .finish()
    }
}

fn default_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_worker_threads() -> usize {
    4
}

fn default_sender() -> String {
    DEFAULT_SENDER.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}
