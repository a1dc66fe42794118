use super::pool::{panic_message, WorkerPool};
use super::report::{DeliveryOutcome, DeliveryReport};
use super::transport::{HttpTransport, Transport, TransportRequest};
use super::Sender;
use crate::producer::{Message, Record};
use crate::{Config, Result, TransmissionError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default sender: posts each message to the REST proxy from a worker pool.
///
/// `send` only enqueues. Every enqueued message ends in exactly one
/// [`DeliveryReport`], which is logged and handed to the configured report
/// hook. Failed deliveries are not retried.
pub struct HttpSender {
    pool: WorkerPool,
    dispatcher: Arc<Dispatcher>,
    sequence: AtomicU64,
}

struct Dispatcher {
    config: Config,
    transport: Arc<dyn Transport>,
}

#[derive(Serialize)]
struct ProduceRequest<'a> {
    records: [&'a Record; 1],
}

impl HttpSender {
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Builds a sender that performs its requests through `transport`.
    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let pool = WorkerPool::new(config.pool_options())?;

        info!(url = %config.url, "HTTP sender ready");

        Ok(Self {
            pool,
            dispatcher: Arc::new(Dispatcher {
                config: config.clone(),
                transport,
            }),
            sequence: AtomicU64::new(0),
        })
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

impl Sender for HttpSender {
    fn send(&self, message: Message) -> Result<()> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let topic = message.topic().to_string();
        let enqueued_at = Utc::now();

        let job = Arc::clone(&self.dispatcher)
            .deliver(id, message, enqueued_at)
            .boxed();
        self.pool.submit(&topic, job)?;

        debug!(id, topic = %topic, "Message enqueued");
        Ok(())
    }

    fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.pool.shutdown(timeout)
    }
}

impl Dispatcher {
    async fn deliver(self: Arc<Self>, id: u64, message: Message, enqueued_at: DateTime<Utc>) {
        debug!(id, topic = message.topic(), "Dispatching message");

        let outcome = match self.request_for(&message) {
            Ok(request) => match AssertUnwindSafe(self.transport.post(request))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => DeliveryOutcome::Delivered,
                Ok(Err(e)) => DeliveryOutcome::Failed(e),
                Err(panic) => DeliveryOutcome::Failed(TransmissionError::Panicked(panic_message(&*panic))),
            },
            Err(e) => DeliveryOutcome::Failed(e),
        };

        let report = DeliveryReport {
            id,
            topic: message.topic().to_string(),
            format: message.format(),
            enqueued_at,
            completed_at: Utc::now(),
            outcome,
        };

        report.log();
        if let Some(hook) = &self.config.report_hook {
            hook(&report);
        }
    }

    fn request_for(&self, message: &Message) -> std::result::Result<TransportRequest, TransmissionError> {
        let body = serde_json::to_value(ProduceRequest {
            records: [message.record()],
        })
        .map_err(|e| TransmissionError::Encoding(e.to_string()))?;

        let bytes = match &self.config.serialization_adapter {
            Some(adapter) => adapter(&body).map_err(TransmissionError::Encoding)?,
            None => serde_json::to_vec(&body).map_err(|e| TransmissionError::Encoding(e.to_string()))?,
        };

        Ok(TransportRequest {
            topic: message.topic().to_string(),
            url: self.config.topic_url(message.topic()),
            content_type: message.content_type(),
            body: Bytes::from(bytes),
        })
    }
}
