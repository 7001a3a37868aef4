//! Typed realtime events delivered to subscription handlers.
//!
//! Each event family is a closed tagged union serialized as
//! `{"kind": "...", "payload": {...}}`, e.g.
//! `{"kind":"feedback-received","payload":{"feedbackId":"..."}}`.
//! Events own their payloads; a handler receives each event exactly once.

use serde::Serialize;

use crate::models::{ActivityItem, AdminNotification, FeedbackContext, SystemMetrics};

/// Event class a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Admin,
    Feedback,
}

impl ChannelKind {
    /// Prefix used for subscription ids and channel names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Admin => "admin",
            ChannelKind::Feedback => "feedback",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin dashboard updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum AdminEvent {
    /// A fresh metrics snapshot.
    SystemMetrics(SystemMetrics),
    /// A new admin notification.
    Notification(AdminNotification),
    /// A new activity log entry.
    Activity(ActivityItem),
}

impl AdminEvent {
    /// Wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            AdminEvent::SystemMetrics(_) => "system-metrics",
            AdminEvent::Notification(_) => "notification",
            AdminEvent::Activity(_) => "activity",
        }
    }
}

/// Feedback inbox updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum FeedbackEvent {
    /// A feedback row was inserted.
    FeedbackReceived(FeedbackContext),
    /// A feedback row was updated.
    FeedbackUpdated(FeedbackContext),
}

impl FeedbackEvent {
    /// Wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedbackEvent::FeedbackReceived(_) => "feedback-received",
            FeedbackEvent::FeedbackUpdated(_) => "feedback-updated",
        }
    }

    /// The feedback context carried by either variant.
    pub fn context(&self) -> &FeedbackContext {
        match self {
            FeedbackEvent::FeedbackReceived(ctx) | FeedbackEvent::FeedbackUpdated(ctx) => ctx,
        }
    }
}
