//! In-process realtime transport.
//!
//! `LocalTransport` is a hub: channels opened on it receive every payload
//! passed to [`LocalTransport::publish`] that matches one of their bindings.
//! Embedders that receive change rows from their own source can feed them
//! through it, and tests use its failure and delay knobs.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, trace};

use choices_core::{Error, Result};

use crate::transport::{
    ChangePayload, ChangeSink, ChannelSpec, ChannelStatus, RealtimeChannel, RealtimeTransport,
};

struct LocalChannelState {
    spec: ChannelSpec,
    sink: ChangeSink,
}

#[derive(Default)]
struct LocalInner {
    channels: DashMap<u64, LocalChannelState>,
    next_id: AtomicU64,
    open_attempts: AtomicUsize,
    open_failure: Mutex<Option<ChannelStatus>>,
    open_delay: Mutex<Option<Duration>>,
}

/// In-process publish/subscribe hub implementing [`RealtimeTransport`].
#[derive(Clone, Default)]
pub struct LocalTransport {
    inner: Arc<LocalInner>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent opens report `status` instead of subscribing.
    /// `None` restores normal behavior.
    pub fn set_open_failure(&self, status: Option<ChannelStatus>) {
        *self
            .inner
            .open_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Delay every open by `delay` before it reports its status.
    pub fn set_open_delay(&self, delay: Option<Duration>) {
        *self
            .inner
            .open_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Deliver `payload` to every open channel bound to its table and kind.
    ///
    /// Returns the number of channels it was delivered to. Waits for buffer
    /// space, so per-channel delivery order follows publish order.
    pub async fn publish(&self, payload: ChangePayload) -> usize {
        let sinks: Vec<(String, ChangeSink)> = self
            .inner
            .channels
            .iter()
            .filter(|entry| entry.spec.matches(&payload.table, payload.kind))
            .map(|entry| (entry.spec.name.clone(), entry.sink.clone()))
            .collect();

        let mut delivered = 0;
        for (channel, sink) in sinks {
            if sink.send(payload.clone()).await.is_ok() {
                delivered += 1;
            } else {
                trace!(channel = %channel, "Local channel receiver gone, skipping delivery");
            }
        }
        delivered
    }

    /// Number of subscribe attempts, successful or not.
    pub fn open_attempts(&self) -> usize {
        self.inner.open_attempts.load(Ordering::SeqCst)
    }

    /// Number of channels currently open.
    pub fn live_channels(&self) -> usize {
        self.inner.channels.len()
    }
}

#[async_trait]
impl RealtimeTransport for LocalTransport {
    async fn subscribe(
        &self,
        spec: ChannelSpec,
        sink: ChangeSink,
    ) -> Result<Box<dyn RealtimeChannel>> {
        self.inner.open_attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self
            .inner
            .open_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = *self
            .inner
            .open_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(status) = failure {
            return Err(Error::ChannelStatus {
                channel: spec.name,
                status: status.to_string(),
            });
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let name = spec.name.clone();
        debug!(channel = %name, bindings = spec.bindings.len(), "Local channel subscribed");
        self.inner
            .channels
            .insert(id, LocalChannelState { spec, sink });

        Ok(Box::new(LocalChannel {
            id,
            name,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct LocalChannel {
    id: u64,
    name: String,
    inner: Arc<LocalInner>,
}

#[async_trait]
impl RealtimeChannel for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn close(&self) -> Result<()> {
        if self.inner.channels.remove(&self.id).is_some() {
            debug!(channel = %self.name, "Local channel closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ChangeKind, EventFilter};
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_publish_routes_by_binding() {
        let transport = LocalTransport::new();
        let (tx, mut rx) = mpsc::channel(8);
        let spec =
            ChannelSpec::new("feedback").on("feedback", EventFilter::Only(ChangeKind::Insert));
        let channel = transport.subscribe(spec, tx).await.unwrap();
        assert_eq!(channel.name(), "feedback");

        let delivered = transport
            .publish(ChangePayload::insert("feedback", json!({"id": "f1"})))
            .await;
        assert_eq!(delivered, 1);
        assert_eq!(
            transport
                .publish(ChangePayload::update("feedback", json!({}), json!({})))
                .await,
            0
        );
        assert_eq!(
            transport
                .publish(ChangePayload::insert("polls", json!({})))
                .await,
            0
        );

        let got = rx.recv().await.unwrap();
        assert_eq!(got.new_row["id"], "f1");
    }

    #[tokio::test]
    async fn test_close_stops_delivery() {
        let transport = LocalTransport::new();
        let (tx, _rx) = mpsc::channel(8);
        let spec = ChannelSpec::new("c").on("feedback", EventFilter::Any);
        let channel = transport.subscribe(spec, tx).await.unwrap();
        assert_eq!(transport.live_channels(), 1);

        channel.close().await.unwrap();
        channel.close().await.unwrap();
        assert_eq!(transport.live_channels(), 0);
        assert_eq!(
            transport
                .publish(ChangePayload::delete("feedback", json!({})))
                .await,
            0
        );
    }

    #[tokio::test]
    async fn test_open_failure_reports_status() {
        let transport = LocalTransport::new();
        transport.set_open_failure(Some(ChannelStatus::TimedOut));
        let (tx, _rx) = mpsc::channel(8);
        let err = transport
            .subscribe(ChannelSpec::new("admin"), tx)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("TIMED_OUT"));
        assert_eq!(transport.open_attempts(), 1);
        assert_eq!(transport.live_channels(), 0);
    }
}
