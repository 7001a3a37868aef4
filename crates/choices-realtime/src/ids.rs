//! Subscription identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use uuid::Uuid;

use choices_core::ChannelKind;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque handle for one subscription, unique within the process.
///
/// Formatted as `{kind}-{sequence}-{uuid}`: the process-wide sequence keeps
/// ids unique even when many are created within one clock tick, and the
/// time-ordered UUIDv7 keeps them unique across processes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Allocate a fresh id for a subscription of `kind`.
    pub fn generate(kind: ChannelKind) -> Self {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}-{}", kind, seq, Uuid::now_v7().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Event class encoded in the id, if it was generated here.
    pub fn kind(&self) -> Option<ChannelKind> {
        match self.0.split('-').next() {
            Some("admin") => Some(ChannelKind::Admin),
            Some("feedback") => Some(ChannelKind::Feedback),
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SubscriptionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SubscriptionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for SubscriptionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_in_a_tight_loop() {
        let ids: HashSet<SubscriptionId> = (0..10_000)
            .map(|i| {
                let kind = if i % 2 == 0 {
                    ChannelKind::Admin
                } else {
                    ChannelKind::Feedback
                };
                SubscriptionId::generate(kind)
            })
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_id_carries_kind_prefix() {
        let id = SubscriptionId::generate(ChannelKind::Feedback);
        assert!(id.as_str().starts_with("feedback-"));
        assert_eq!(id.kind(), Some(ChannelKind::Feedback));
        assert_eq!(SubscriptionId::from("bogus").kind(), None);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = SubscriptionId::from("admin-1-abc");
        assert_eq!(serde_json::to_value(&id).unwrap(), "admin-1-abc");
        assert_eq!(id.to_string(), "admin-1-abc");
    }
}
