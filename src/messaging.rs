//! Telemetry ingress: topic routing, decoding and dispatch.

use anyhow::Result;
use parking::{Dispatcher, Error, TelemetryMessage, TelemetrySample};
use tracing::{debug, error, warn};

const SERVICE: &str = "parking-monitor";

/// What `Ingress::handle` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for detection.
    Dispatched,
    /// The topic is not a telemetry topic.
    Unhandled,
    /// The payload failed to decode or validate.
    Rejected,
    /// The worker pool is no longer accepting samples.
    Dropped,
}

/// Routes telemetry from the message transport to the detector's workers.
pub struct Ingress {
    topics: Vec<String>,
    dispatcher: Dispatcher,
}

impl Ingress {
    #[must_use]
    pub const fn new(topics: Vec<String>, dispatcher: Dispatcher) -> Self {
        Self { topics, dispatcher }
    }

    /// Handle one inbound message. Failures are logged, never returned.
    pub async fn handle(&self, topic: &str, payload: &[u8]) -> Delivery {
        if !self.topics.iter().any(|prefix| topic.starts_with(prefix.as_str())) {
            debug!(monotonic_counter.unhandled_topics = 1, topic = %topic, service = %SERVICE);
            return Delivery::Unhandled;
        }

        let sample = match decode(payload) {
            Ok(sample) => sample,
            Err(err) => {
                warn!(
                    monotonic_counter.processing_errors = 1,
                    code = err.code(),
                    error = %err,
                    topic = %topic,
                    service = %SERVICE,
                    "dropping telemetry"
                );
                return Delivery::Rejected;
            }
        };

        if let Err(err) = self.dispatcher.dispatch(sample).await {
            error!(
                monotonic_counter.processing_errors = 1,
                error = %err,
                topic = %topic,
                service = %SERVICE
            );
            return Delivery::Dropped;
        }
        Delivery::Dispatched
    }

    /// Stop accepting telemetry and wait for queued samples to be processed.
    pub async fn shutdown(self) {
        self.dispatcher.shutdown().await;
    }
}

fn decode(payload: &[u8]) -> Result<TelemetrySample, Error> {
    let message = TelemetryMessage::try_from(payload)?;
    TelemetrySample::try_from(message)
}
