//! Retry with exponential backoff for transient transport failures.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::{Publisher, TransportResult};

/// Backoff schedule: `initial_backoff × multiplier^n` before retry `n + 1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_retries:     u32,
    pub multiplier:      u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(300),
            max_retries:     5,
            multiplier:      2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry + 1`.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff.saturating_mul(self.multiplier.saturating_pow(retry))
    }

    /// Run `op`, retrying transient failures until the budget is spent.
    ///
    /// Non-transient errors are returned immediately.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> TransportResult<T>
    where
        F:   FnMut() -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    let delay = self.backoff(retry);
                    warn!("{what} failed: {e}; retry {}/{} in {delay:?}", retry + 1, self.max_retries);
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                result => return result,
            }
        }
    }
}

/// A [`Publisher`] that retries its inner publisher under a [`RetryPolicy`].
pub struct RetryingPublisher<P> {
    inner:  P,
    policy: RetryPolicy,
}

impl<P: Publisher> RetryingPublisher<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: Publisher> Publisher for RetryingPublisher<P> {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> TransportResult<()> {
        let inner = &self.inner;
        self.policy
            .run("publish", move || inner.publish(topic, key, payload.clone()))
            .await
    }
}
