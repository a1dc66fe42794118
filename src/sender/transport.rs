use crate::{Error, Result, TransmissionError};
use bytes::Bytes;
use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

pub const ACCEPT_V2: &str = "application/vnd.kafka.v2+json";

/// Turns the request body (`{"records": [...]}`) into bytes, replacing the
/// default `serde_json` encoding.
pub type SerializationAdapter =
    Arc<dyn Fn(&Value) -> std::result::Result<Vec<u8>, String> + Send + Sync>;

/// One produce request, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub topic: String,
    pub url: String,
    pub content_type: &'static str,
    pub body: Bytes,
}

/// Performs the network call for a single request.
///
/// Implementations run on the sender's worker threads.
pub trait Transport: Send + Sync {
    fn post(&self, request: TransportRequest) -> BoxFuture<'_, std::result::Result<(), TransmissionError>>;
}

/// reqwest-backed transport talking to the REST proxy v2 API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn post(&self, request: TransportRequest) -> BoxFuture<'_, std::result::Result<(), TransmissionError>> {
        Box::pin(async move {
            trace!(url = %request.url, bytes = request.body.len(), "Posting records");

            let response = self
                .client
                .post(&request.url)
                .header(CONTENT_TYPE, request.content_type)
                .header(ACCEPT, ACCEPT_V2)
                .body(request.body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                let body = response.text().await.unwrap_or_default();
                Err(TransmissionError::Status {
                    status: status.as_u16(),
                    body: body.trim().to_string(),
                })
            }
        })
    }
}
