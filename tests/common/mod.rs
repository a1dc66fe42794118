#![allow(dead_code)]

use futures::future::BoxFuture;
use kafka_rest_producer::sender::{ReportHook, Sender, SenderRegistry, Transport, TransportRequest};
use kafka_rest_producer::{Client, Config, DeliveryReport, HttpSender, TransmissionError};
use serde_json::Value;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;
use tokio::sync::watch;

/// A request as seen by [`RecordingTransport`], with the thread it ran on.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub content_type: &'static str,
    pub body: Value,
    pub thread: ThreadId,
    pub thread_name: Option<String>,
}

/// In-memory transport. Requests can be held back behind a gate or delayed,
/// so tests can observe what the caller does while delivery is pending.
pub struct RecordingTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Duration,
    gate: watch::Receiver<bool>,
    release: watch::Sender<bool>,
    started_tx: Mutex<mpsc::Sender<String>>,
    started_rx: Mutex<mpsc::Receiver<String>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Self::build(true, Duration::ZERO)
    }

    /// Requests block until [`release`](Self::release) is called.
    pub fn gated() -> Arc<Self> {
        Self::build(false, Duration::ZERO)
    }

    pub fn delayed(delay: Duration) -> Arc<Self> {
        Self::build(true, delay)
    }

    fn build(open: bool, delay: Duration) -> Arc<Self> {
        let (release, gate) = watch::channel(open);
        let (started_tx, started_rx) = mpsc::channel();

        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            delay,
            gate,
            release,
            started_tx: Mutex::new(started_tx),
            started_rx: Mutex::new(started_rx),
        })
    }

    pub fn release(&self) {
        let _ = self.release.send(true);
    }

    /// Waits until `count` requests have reached the transport.
    pub fn wait_started(&self, count: usize, timeout: Duration) -> Vec<String> {
        let rx = self.started_rx.lock().unwrap();
        (0..count)
            .map(|_| rx.recv_timeout(timeout).expect("request did not start in time"))
            .collect()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn post(&self, request: TransportRequest) -> BoxFuture<'_, Result<(), TransmissionError>> {
        Box::pin(async move {
            let _ = self.started_tx.lock().unwrap().send(request.topic.clone());

            let mut gate = self.gate.clone();
            let _ = gate.wait_for(|open| *open).await;

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let current = std::thread::current();
            let body = serde_json::from_slice(&request.body)
                .map_err(|e| TransmissionError::Encoding(e.to_string()))?;

            self.requests.lock().unwrap().push(RecordedRequest {
                url: request.url,
                content_type: request.content_type,
                body,
                thread: current.id(),
                thread_name: current.name().map(str::to_string),
            });
            Ok(())
        })
    }
}

/// Hook forwarding every delivery report to the returned receiver.
pub fn report_channel() -> (ReportHook, mpsc::Receiver<DeliveryReport>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let hook: ReportHook = Arc::new(move |report: &DeliveryReport| {
        let _ = tx.lock().unwrap().send(report.clone());
    });
    (hook, rx)
}

pub fn collect_reports(rx: &mpsc::Receiver<DeliveryReport>, count: usize) -> Vec<DeliveryReport> {
    (0..count)
        .map(|_| {
            rx.recv_timeout(Duration::from_secs(10))
                .expect("delivery report did not arrive in time")
        })
        .collect()
}

/// Client whose sender is an [`HttpSender`] performing requests through
/// `transport`.
pub fn client_with_transport(config: Config, transport: Arc<RecordingTransport>) -> Client {
    let mut registry = SenderRegistry::default();
    registry.register("recording", move |config: &Config| {
        let sender = HttpSender::with_transport(config, Arc::clone(&transport) as Arc<dyn Transport>)?;
        Ok(Arc::new(sender) as Arc<dyn Sender>)
    });

    let config = Config {
        sender: "recording".to_string(),
        ..config
    };
    Client::with_registry(config, registry).expect("valid test configuration")
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("kafka_rest_producer=debug")
        .with_test_writer()
        .try_init()
        .ok();
}
