// ── Transport seam ──
//
// The engine publishes through `Publisher` so it can run against a
// recording fake in tests. `MqttPublisher` enqueues onto a rumqttc
// client; the event loop that drains the queue lives in `service`.

use rumqttc::{AsyncClient, QoS};
use tracing::trace;

use crate::error::CoreError;

/// Fire-and-forget publish, QoS 0, not retained.
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), CoreError>;
}

impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), CoreError> {
        (**self).publish(topic, payload)
    }
}

/// Publishes through a rumqttc request queue without awaiting.
///
/// Safe to call from blocking threads. Fails only when the queue is
/// full or the event loop is gone.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl Publisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), CoreError> {
        trace!(%topic, %payload, "publish");
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .map_err(|e| CoreError::Publish {
                topic: topic.to_owned(),
                reason: e.to_string(),
            })
    }
}
