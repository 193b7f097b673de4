//! Transport client seams.
//!
//! Both traits return `Send` futures so that components can drive them from
//! spawned tasks.  Handles are constructed by the process entry point and
//! passed into components; nothing here is a global.

use std::future::Future;
use std::sync::Arc;

use crate::TransportResult;

/// One record handed to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic:     String,
    pub partition: u32,
    pub offset:    u64,
    pub key:       Option<String>,
    pub payload:   Vec<u8>,
}

/// Publishing side of a topic.
pub trait Publisher: Send + Sync + 'static {
    /// Append `payload` to `topic`, keyed by `key`.
    ///
    /// Resolves once the transport has accepted the record; it never waits
    /// for a consumer.
    fn publish(
        &self,
        topic:   &str,
        key:     &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = TransportResult<()>> + Send;
}

impl<P: Publisher> Publisher for Arc<P> {
    fn publish(
        &self,
        topic:   &str,
        key:     &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = TransportResult<()>> + Send {
        (**self).publish(topic, key, payload)
    }
}

/// Consuming side of a topic, bound to one consumer group.
pub trait Subscriber: Send + 'static {
    /// Wait for the next record.
    ///
    /// Cancel-safe: dropping the future before it resolves loses nothing.
    fn next(&mut self) -> impl Future<Output = TransportResult<Delivery>> + Send;

    /// Mark `delivery` as fully processed for this consumer group.
    fn ack(&mut self, delivery: &Delivery) -> TransportResult<()>;
}
