//! Last-request-wins metrics refresh.
//!
//! Every trigger (channel readiness, a `system_health` or `trending_topics`
//! change, the poll timer) starts a new fetch and cancels the one in flight.
//! Only the most recent fetch may reach the handler.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use choices_core::{Error, SystemMetrics};

use crate::metrics::MetricsSource;

/// Receives each metrics snapshot that survives cancellation.
pub type MetricsCallback = Arc<dyn Fn(SystemMetrics) + Send + Sync>;

#[derive(Default)]
struct RefreshState {
    generation: u64,
    in_flight: Option<CancellationToken>,
}

/// Serializes metrics refreshes for one subscription.
pub struct MetricsRefresher {
    source: Arc<dyn MetricsSource>,
    deliver: MetricsCallback,
    label: String,
    state: Mutex<RefreshState>,
    // Held across the currency check and the callback.
    delivery: Mutex<()>,
}

impl MetricsRefresher {
    /// `label` identifies the owning subscription in logs.
    pub fn new(
        source: Arc<dyn MetricsSource>,
        deliver: MetricsCallback,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source,
            deliver,
            label: label.into(),
            state: Mutex::new(RefreshState::default()),
            delivery: Mutex::new(()),
        }
    }

    /// Start a fetch, superseding any fetch still in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let token = CancellationToken::new();
        let generation = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = state.in_flight.replace(token.clone()) {
                previous.cancel();
            }
            state.generation += 1;
            state.generation
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::Cancelled),
                result = this.source.fetch_metrics() => result,
            };

            match outcome {
                Ok(metrics) => {
                    let _delivery = this.delivery.lock().unwrap_or_else(PoisonError::into_inner);
                    if this.finish(generation) {
                        (this.deliver)(metrics);
                    } else {
                        debug!(
                            subscription_id = %this.label,
                            generation,
                            "Discarding superseded metrics",
                        );
                    }
                }
                Err(e) if e.is_cancelled() => {
                    debug!(subscription_id = %this.label, generation, "Metrics refresh superseded");
                }
                Err(e) => {
                    this.finish(generation);
                    warn!(subscription_id = %this.label, error = %e, "Metrics refresh failed");
                }
            }
        })
    }

    /// Cancel the fetch in flight, if any.
    ///
    /// Waits for a delivery already under way, so no snapshot reaches the
    /// callback after this returns.
    pub fn cancel(&self) {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = state.in_flight.take() {
            token.cancel();
        }
    }

    /// Number of refreshes started so far.
    pub fn generation(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// Whether a fetch is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .is_some()
    }

    /// Clear the in-flight marker if `generation` is still the latest,
    /// uncancelled refresh. Returns whether it was.
    fn finish(&self, generation: u64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation == generation && state.in_flight.is_some() {
            state.in_flight = None;
            true
        } else {
            false
        }
    }
}

/// Trigger a refresh every `every` until the task is aborted.
///
/// The interval's immediate first tick is skipped; readiness already
/// triggers a refresh.
pub async fn poll_metrics(refresher: Arc<MetricsRefresher>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        refresher.refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use choices_core::Result;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns scripted snapshots after scripted delays.
    struct ScriptedSource {
        script: Mutex<VecDeque<(Duration, u64)>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<(Duration, u64)>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MetricsSource for ScriptedSource {
        async fn fetch_metrics(&self) -> Result<SystemMetrics> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, topics) = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((Duration::ZERO, 0));
            tokio::time::sleep(delay).await;
            Ok(SystemMetrics {
                total_topics: topics,
                ..Default::default()
            })
        }
    }

    fn collecting() -> (MetricsCallback, Arc<Mutex<Vec<u64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: MetricsCallback = Arc::new(move |m: SystemMetrics| {
            sink.lock().unwrap().push(m.total_topics);
        });
        (callback, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_refresh_supersedes_first() {
        let source = ScriptedSource::new(vec![
            (Duration::from_millis(50), 1),
            (Duration::from_millis(100), 2),
        ]);
        let (callback, seen) = collecting();
        let refresher = Arc::new(MetricsRefresher::new(source.clone(), callback, "admin-test"));

        let first = refresher.refresh();
        // Let the first fetch start before superseding it.
        tokio::task::yield_now().await;
        let second = refresher.refresh();
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![2]);
        assert_eq!(refresher.generation(), 2);
        assert!(!refresher.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_refreshes_all_deliver() {
        let source = ScriptedSource::new(vec![]);
        let (callback, seen) = collecting();
        let refresher = Arc::new(MetricsRefresher::new(source.clone(), callback, "admin-test"));

        refresher.refresh().await.unwrap();
        refresher.refresh().await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_in_flight_result() {
        let source = ScriptedSource::new(vec![(Duration::from_millis(100), 7)]);
        let (callback, seen) = collecting();
        let refresher = Arc::new(MetricsRefresher::new(source, callback, "admin-test"));

        let handle = refresher.refresh();
        assert!(refresher.is_refreshing());
        refresher.cancel();
        handle.await.unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    /// Source whose snapshot is the order in which its fetch started.
    struct CountingSource {
        started: AtomicUsize,
    }

    #[async_trait]
    impl MetricsSource for CountingSource {
        async fn fetch_metrics(&self) -> Result<SystemMetrics> {
            let order = self.started.fetch_add(1, Ordering::SeqCst) as u64;
            tokio::task::yield_now().await;
            Ok(SystemMetrics {
                total_topics: order,
                ..Default::default()
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_burst_never_delivers_stale_snapshot_last() {
        let source = Arc::new(CountingSource {
            started: AtomicUsize::new(0),
        });
        let (callback, seen) = collecting();
        let refresher = Arc::new(MetricsRefresher::new(source, callback, "admin-test"));

        let mut handles = Vec::new();
        for _ in 0..200 {
            handles.push(refresher.refresh());
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(
            seen.windows(2).all(|w| w[0] < w[1]),
            "deliveries out of order: {:?}",
            *seen
        );
        assert!(!refresher.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_delivery_suppresses_it() {
        let source = ScriptedSource::new(vec![]);
        let (callback, seen) = collecting();
        let refresher = Arc::new(MetricsRefresher::new(source, callback, "admin-test"));

        refresher.cancel();
        refresher.refresh().await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);

        let handle = refresher.refresh();
        refresher.cancel();
        handle.await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_triggers_on_interval() {
        let source = ScriptedSource::new(vec![]);
        let (callback, seen) = collecting();
        let refresher = Arc::new(MetricsRefresher::new(source, callback, "admin-test"));

        let poller = tokio::spawn(poll_metrics(Arc::clone(&refresher), Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(3500)).await;
        poller.abort();

        assert_eq!(seen.lock().unwrap().len(), 3);
    }
}
