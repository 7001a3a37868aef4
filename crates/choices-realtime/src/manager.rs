//! Subscription manager.
//!
//! Each subscription owns one realtime channel, one dispatcher task that
//! drains the channel in order and invokes the caller's handler, and (for
//! admin subscriptions) a [`MetricsRefresher`]. Subscriptions are registered
//! only once the channel is confirmed ready; until then the id is tracked as
//! pending so an early unsubscribe can cancel the setup.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use choices_core::{
    normalize_activity_item, normalize_admin_notification, normalize_feedback_row, AdminEvent,
    ChannelKind, FeedbackEvent, Result,
};

use crate::config::RealtimeConfig;
use crate::ids::SubscriptionId;
use crate::metrics::{HttpMetricsSource, MetricsSource};
use crate::refresh::{poll_metrics, MetricsCallback, MetricsRefresher};
use crate::transport::{
    ChangeKind, ChangePayload, ChannelSpec, EventFilter, RealtimeChannel, RealtimeTransport,
};

/// Admin notification rows.
pub const ADMIN_NOTIFICATIONS_TABLE: &str = "admin_notifications";
/// Admin activity log rows.
pub const ADMIN_ACTIVITY_LOG_TABLE: &str = "admin_activity_log";
/// Health rows; any change triggers a metrics refresh.
pub const SYSTEM_HEALTH_TABLE: &str = "system_health";
/// Trending topic rows; any change triggers a metrics refresh.
pub const TRENDING_TOPICS_TABLE: &str = "trending_topics";
/// Feedback rows.
pub const FEEDBACK_TABLE: &str = "feedback";

/// Handler for admin subscriptions.
pub type AdminHandler = Arc<dyn Fn(AdminEvent) + Send + Sync>;
/// Handler for feedback subscriptions.
pub type FeedbackHandler = Arc<dyn Fn(FeedbackEvent) + Send + Sync>;

/// Channel bindings for admin updates.
pub fn admin_channel_spec(id: &SubscriptionId) -> ChannelSpec {
    ChannelSpec::new(format!("admin-updates-{}", id))
        .on(ADMIN_NOTIFICATIONS_TABLE, EventFilter::Only(ChangeKind::Insert))
        .on(ADMIN_ACTIVITY_LOG_TABLE, EventFilter::Only(ChangeKind::Insert))
        .on(SYSTEM_HEALTH_TABLE, EventFilter::Any)
        .on(TRENDING_TOPICS_TABLE, EventFilter::Any)
}

/// Channel bindings for feedback updates.
pub fn feedback_channel_spec(id: &SubscriptionId) -> ChannelSpec {
    ChannelSpec::new(format!("feedback-updates-{}", id))
        .on(FEEDBACK_TABLE, EventFilter::Only(ChangeKind::Insert))
        .on(FEEDBACK_TABLE, EventFilter::Only(ChangeKind::Update))
}

/// Registry entry: setup still running, or a live subscription.
enum Entry {
    Pending(CancellationToken),
    Live(LiveSubscription),
}

struct LiveSubscription {
    channel: Box<dyn RealtimeChannel>,
    dispatcher: JoinHandle<()>,
    refresher: Option<Arc<MetricsRefresher>>,
    poller: Option<JoinHandle<()>>,
}

impl LiveSubscription {
    /// Stop delivery, then release the channel.
    ///
    /// Waits for the dispatcher to wind down, so the handler is not running
    /// once this returns.
    async fn shutdown(self, id: &SubscriptionId) {
        self.dispatcher.abort();
        if let Some(poller) = &self.poller {
            poller.abort();
        }
        if let Some(refresher) = &self.refresher {
            refresher.cancel();
        }
        let _ = self.dispatcher.await;
        if let Some(poller) = self.poller {
            let _ = poller.await;
        }
        if let Err(e) = self.channel.close().await {
            warn!(
                subscription_id = %id,
                channel = %self.channel.name(),
                error = %e,
                "Failed to close realtime channel",
            );
        }
    }
}

struct ManagerInner {
    config: RealtimeConfig,
    transport: Arc<dyn RealtimeTransport>,
    metrics: Arc<dyn MetricsSource>,
    entries: DashMap<SubscriptionId, Entry>,
}

/// Creates and tears down realtime subscriptions.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<ManagerInner>,
}

impl SubscriptionManager {
    pub fn new(
        config: RealtimeConfig,
        transport: Arc<dyn RealtimeTransport>,
        metrics: Arc<dyn MetricsSource>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                transport,
                metrics,
                entries: DashMap::new(),
            }),
        }
    }

    /// Manager whose metrics come from the configured HTTP endpoint.
    pub fn from_config(
        config: RealtimeConfig,
        transport: Arc<dyn RealtimeTransport>,
    ) -> Result<Self> {
        let metrics = Arc::new(HttpMetricsSource::new(&config)?);
        Ok(Self::new(config, transport, metrics))
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    /// Subscribe to admin dashboard updates.
    ///
    /// Returns immediately; channel setup runs in the background. Once the
    /// channel is ready, one metrics refresh is triggered. If the channel
    /// cannot be opened, the failure is logged and one metrics fetch is
    /// still attempted so the dashboard gets a snapshot.
    pub fn subscribe_to_admin_updates<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(AdminEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::generate(ChannelKind::Admin);
        let Some(runtime) = self.network_runtime(&id) else {
            return id;
        };

        let token = CancellationToken::new();
        self.inner
            .entries
            .insert(id.clone(), Entry::Pending(token.clone()));
        let inner = Arc::clone(&self.inner);
        runtime.spawn(inner.setup_admin(id.clone(), Arc::new(handler), token));
        id
    }

    /// Subscribe to feedback inserts and updates.
    ///
    /// Returns immediately; channel setup runs in the background.
    pub fn subscribe_to_feedback_updates<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(FeedbackEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::generate(ChannelKind::Feedback);
        let Some(runtime) = self.network_runtime(&id) else {
            return id;
        };

        let token = CancellationToken::new();
        self.inner
            .entries
            .insert(id.clone(), Entry::Pending(token.clone()));
        let inner = Arc::clone(&self.inner);
        runtime.spawn(inner.setup_feedback(id.clone(), Arc::new(handler), token));
        id
    }

    /// Tear down a subscription.
    ///
    /// Unknown or already-removed ids are a no-op. The id leaves the
    /// registry before this returns; a setup still in progress is cancelled
    /// and closes its own channel.
    pub async fn unsubscribe(&self, id: &SubscriptionId) {
        match self.inner.entries.remove(id) {
            None => {
                debug!(subscription_id = %id, "Unsubscribe for unknown subscription ignored");
            }
            Some((_, Entry::Pending(token))) => {
                token.cancel();
                info!(subscription_id = %id, "Cancelled pending subscription");
            }
            Some((_, Entry::Live(live))) => {
                live.shutdown(id).await;
                info!(subscription_id = %id, "Unsubscribed");
            }
        }
    }

    /// Tear down every subscription, pending or live.
    pub async fn unsubscribe_all(&self) {
        let ids: Vec<SubscriptionId> = self
            .inner
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        join_all(ids.iter().map(|id| self.unsubscribe(id))).await;
    }

    /// Trigger an out-of-band metrics refresh for a live admin subscription.
    ///
    /// Returns false if `id` is not a live admin subscription.
    pub fn refresh_metrics(&self, id: &SubscriptionId) -> bool {
        let refresher = match self.inner.entries.get(id).as_deref() {
            Some(Entry::Live(live)) => live.refresher.clone(),
            _ => None,
        };
        match refresher {
            Some(refresher) => {
                refresher.refresh();
                true
            }
            None => false,
        }
    }

    /// Whether `id` has a confirmed, registered channel.
    pub fn is_live(&self, id: &SubscriptionId) -> bool {
        matches!(self.inner.entries.get(id).as_deref(), Some(Entry::Live(_)))
    }

    /// Number of live subscriptions.
    pub fn live_count(&self) -> usize {
        self.inner
            .entries
            .iter()
            .filter(|entry| matches!(entry.value(), Entry::Live(_)))
            .count()
    }

    /// Number of subscriptions whose setup is still running.
    pub fn pending_count(&self) -> usize {
        self.inner
            .entries
            .iter()
            .filter(|entry| matches!(entry.value(), Entry::Pending(_)))
            .count()
    }

    /// Runtime to spawn channel setup on, or `None` when network setup must
    /// be skipped.
    fn network_runtime(&self, id: &SubscriptionId) -> Option<Handle> {
        if self.inner.config.is_headless() {
            warn!(
                subscription_id = %id,
                "Realtime subscription requested in a headless context; skipping network setup",
            );
            return None;
        }
        match Handle::try_current() {
            Ok(handle) => Some(handle),
            Err(_) => {
                warn!(
                    subscription_id = %id,
                    "Realtime subscription requested outside an async runtime; skipping network setup",
                );
                None
            }
        }
    }
}

impl ManagerInner {
    #[instrument(skip(self, id, handler, token), fields(subscription_id = %id))]
    async fn setup_admin(
        self: Arc<Self>,
        id: SubscriptionId,
        handler: AdminHandler,
        token: CancellationToken,
    ) {
        let deliver: MetricsCallback = {
            let handler = Arc::clone(&handler);
            Arc::new(move |metrics| handler(AdminEvent::SystemMetrics(metrics)))
        };
        let refresher = Arc::new(MetricsRefresher::new(
            Arc::clone(&self.metrics),
            deliver,
            id.to_string(),
        ));

        let (sink, changes) = mpsc::channel(self.config.delivery_buffer);
        let channel = match self.transport.subscribe(admin_channel_spec(&id), sink).await {
            Ok(channel) => channel,
            Err(e) => {
                error!(
                    error = %e,
                    "Failed to open admin channel; realtime updates will not arrive",
                );
                let still_wanted = self.forget_pending(&id);
                if still_wanted && !token.is_cancelled() {
                    refresher.refresh();
                }
                return;
            }
        };

        if token.is_cancelled() {
            close_abandoned(channel).await;
            return;
        }

        let (start_dispatch, dispatch_gate) = oneshot::channel();
        let dispatcher = tokio::spawn(gated(
            dispatch_gate,
            dispatch_admin(changes, handler, Arc::clone(&refresher), id.clone()),
        ));
        let (start_poll, poll_gate) = oneshot::channel();
        let poller = self.config.metrics_poll_interval.map(|every| {
            tokio::spawn(gated(poll_gate, poll_metrics(Arc::clone(&refresher), every)))
        });

        let live = LiveSubscription {
            channel,
            dispatcher,
            refresher: Some(Arc::clone(&refresher)),
            poller,
        };
        if !self.register(&id, &token, live).await {
            return;
        }

        let _ = start_dispatch.send(());
        let _ = start_poll.send(());
        info!("Admin subscription live");
        refresher.refresh();
    }

    #[instrument(skip(self, id, handler, token), fields(subscription_id = %id))]
    async fn setup_feedback(
        self: Arc<Self>,
        id: SubscriptionId,
        handler: FeedbackHandler,
        token: CancellationToken,
    ) {
        let (sink, changes) = mpsc::channel(self.config.delivery_buffer);
        let channel = match self
            .transport
            .subscribe(feedback_channel_spec(&id), sink)
            .await
        {
            Ok(channel) => channel,
            Err(e) => {
                error!(
                    error = %e,
                    "Failed to open feedback channel; realtime updates will not arrive",
                );
                self.forget_pending(&id);
                return;
            }
        };

        if token.is_cancelled() {
            close_abandoned(channel).await;
            return;
        }

        let (start_dispatch, dispatch_gate) = oneshot::channel();
        let dispatcher = tokio::spawn(gated(
            dispatch_gate,
            dispatch_feedback(changes, handler, id.clone()),
        ));
        let live = LiveSubscription {
            channel,
            dispatcher,
            refresher: None,
            poller: None,
        };
        if self.register(&id, &token, live).await {
            let _ = start_dispatch.send(());
            info!("Feedback subscription live");
        }
    }

    /// Swap the pending entry for `live`. If the subscription was cancelled
    /// meanwhile, tear `live` down instead and return false.
    async fn register(
        &self,
        id: &SubscriptionId,
        token: &CancellationToken,
        live: LiveSubscription,
    ) -> bool {
        let rejected = match self.entries.get_mut(id) {
            Some(mut entry) if matches!(*entry, Entry::Pending(_)) && !token.is_cancelled() => {
                *entry = Entry::Live(live);
                None
            }
            _ => Some(live),
        };

        match rejected {
            None => true,
            Some(live) => {
                debug!("Unsubscribed during setup; closing channel");
                live.shutdown(id).await;
                false
            }
        }
    }

    /// Drop a pending entry after a failed setup. Returns false if the id
    /// had already been unsubscribed.
    fn forget_pending(&self, id: &SubscriptionId) -> bool {
        self.entries
            .remove_if(id, |_, entry| matches!(entry, Entry::Pending(_)))
            .is_some()
    }
}

/// Run `task` once `gate` fires. A dropped sender means the subscription
/// never went live, and `task` is dropped unstarted.
async fn gated(gate: oneshot::Receiver<()>, task: impl Future<Output = ()>) {
    if gate.await.is_ok() {
        task.await;
    }
}

/// Close a channel whose subscription was cancelled while it opened.
async fn close_abandoned(channel: Box<dyn RealtimeChannel>) {
    debug!(channel = %channel.name(), "Unsubscribed during setup; closing channel");
    if let Err(e) = channel.close().await {
        warn!(channel = %channel.name(), error = %e, "Failed to close realtime channel");
    }
}

async fn dispatch_admin(
    mut changes: mpsc::Receiver<ChangePayload>,
    handler: AdminHandler,
    refresher: Arc<MetricsRefresher>,
    id: SubscriptionId,
) {
    while let Some(change) = changes.recv().await {
        match change.table.as_str() {
            ADMIN_NOTIFICATIONS_TABLE => match normalize_admin_notification(&change.new_row) {
                Some(notification) => handler(AdminEvent::Notification(notification)),
                None => debug!(subscription_id = %id, "Dropping notification row without id"),
            },
            ADMIN_ACTIVITY_LOG_TABLE => match normalize_activity_item(&change.new_row) {
                Some(activity) => handler(AdminEvent::Activity(activity)),
                None => debug!(subscription_id = %id, "Dropping activity row without id"),
            },
            SYSTEM_HEALTH_TABLE | TRENDING_TOPICS_TABLE => {
                trace!(
                    subscription_id = %id,
                    table = %change.table,
                    kind = %change.kind,
                    "Metrics source changed",
                );
                refresher.refresh();
            }
            other => {
                trace!(subscription_id = %id, table = other, "Ignoring change from unbound table");
            }
        }
    }
    debug!(subscription_id = %id, "Admin channel drained");
}

async fn dispatch_feedback(
    mut changes: mpsc::Receiver<ChangePayload>,
    handler: FeedbackHandler,
    id: SubscriptionId,
) {
    while let Some(change) = changes.recv().await {
        if change.table != FEEDBACK_TABLE {
            trace!(
                subscription_id = %id,
                table = %change.table,
                "Ignoring change from unbound table",
            );
            continue;
        }
        let event = match change.kind {
            ChangeKind::Insert => {
                FeedbackEvent::FeedbackReceived(normalize_feedback_row(&change.new_row))
            }
            ChangeKind::Update => {
                FeedbackEvent::FeedbackUpdated(normalize_feedback_row(&change.new_row))
            }
            ChangeKind::Delete => {
                trace!(subscription_id = %id, "Ignoring feedback delete");
                continue;
            }
        };
        handler(event);
    }
    debug!(subscription_id = %id, "Feedback channel drained");
}
