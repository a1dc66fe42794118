use crate::producer::MessageFormat;
use crate::TransmissionError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback invoked on a worker thread for every finished delivery.
pub type ReportHook = Arc<dyn Fn(&DeliveryReport) + Send + Sync>;

#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(TransmissionError),
}

/// Terminal state of one dispatched message.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    /// Sequence number assigned when the message was enqueued
    pub id: u64,
    pub topic: String,
    pub format: MessageFormat,
    pub enqueued_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub outcome: DeliveryOutcome,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Delivered)
    }

    pub fn error(&self) -> Option<&TransmissionError> {
        match &self.outcome {
            DeliveryOutcome::Delivered => None,
            DeliveryOutcome::Failed(err) => Some(err),
        }
    }

    /// Time between enqueueing and completion.
    pub fn latency(&self) -> chrono::Duration {
        self.completed_at - self.enqueued_at
    }

    pub(crate) fn log(&self) {
        let latency_ms = self.latency().num_milliseconds();

        match &self.outcome {
            DeliveryOutcome::Delivered => debug!(
                id = self.id,
                topic = %self.topic,
                format = %self.format,
                latency_ms,
                "Message delivered"
            ),
            DeliveryOutcome::Failed(err) => warn!(
                id = self.id,
                topic = %self.topic,
                format = %self.format,
                latency_ms,
                error = %err,
                "Message delivery failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_report_exposes_error() {
        let now = Utc::now();
        let report = DeliveryReport {
            id: 1,
            topic: "events".to_string(),
            format: MessageFormat::Json,
            enqueued_at: now,
            completed_at: now + chrono::Duration::milliseconds(15),
            outcome: DeliveryOutcome::Failed(TransmissionError::Http("connection refused".to_string())),
        };

        assert!(!report.is_delivered());
        assert_eq!(report.latency().num_milliseconds(), 15);
        assert!(matches!(report.error(), Some(TransmissionError::Http(_))));
    }
}
