//! # choices-realtime
//!
//! Realtime subscriptions for the Choices admin dashboard and feedback inbox.
//!
//! [`SubscriptionManager`] opens a channel per subscription on a
//! [`RealtimeTransport`], normalizes each change row with `choices-core`,
//! and hands the typed event to the caller's handler. Admin subscriptions
//! also keep a metrics snapshot fresh through a [`MetricsSource`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use choices_realtime::{LocalTransport, RealtimeConfig, SubscriptionManager};
//!
//! # async fn run() -> choices_core::Result<()> {
//! let manager = SubscriptionManager::from_config(
//!     RealtimeConfig::load(),
//!     Arc::new(LocalTransport::new()),
//! )?;
//! let id = manager.subscribe_to_feedback_updates(|event| {
//!     println!("{}: {}", event.kind(), event.context().title);
//! });
//! manager.unsubscribe(&id).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Everything is emitted through `tracing`; the embedding binary installs
//! the subscriber.
//!
//! | Level | Events |
//! |-------|--------|
//! | `error` | channel failed to open |
//! | `warn` | metrics fetch failed, subscribe skipped (headless or no runtime), channel close failed |
//! | `info` | subscription live, unsubscribed |
//! | `debug` | superseded refresh, dropped rows, unknown unsubscribe |
//! | `trace` | ignored tables and deletes |

pub mod config;
pub mod ids;
pub mod local;
pub mod manager;
pub mod metrics;
pub mod refresh;
pub mod transport;

pub use config::{ExecutionContext, RealtimeConfig};
pub use ids::SubscriptionId;
pub use local::LocalTransport;
pub use manager::{AdminHandler, FeedbackHandler, SubscriptionManager};
pub use metrics::{unwrap_metrics_envelope, HttpMetricsSource, MetricsSource};
pub use refresh::MetricsRefresher;
pub use transport::{
    ChangeKind, ChangePayload, ChangeSink, ChannelSpec, ChannelStatus, EventFilter,
    RealtimeChannel, RealtimeTransport, TableBinding,
};
