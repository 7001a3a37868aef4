//! Realtime transport abstraction.
//!
//! A transport opens named publish/subscribe channels bound to table change
//! patterns and pushes each matching change, in emission order, into the
//! sink it was given. The hosted backend's realtime client, or the in-process
//! [`LocalTransport`](crate::local::LocalTransport), sit behind this trait.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use choices_core::defaults::REALTIME_SCHEMA;
use choices_core::Result;

/// Kind of row change carried by a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which change kinds a binding listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// Wildcard (`*`): every change on the table.
    Any,
    /// A single change kind.
    Only(ChangeKind),
}

impl EventFilter {
    pub fn matches(&self, kind: ChangeKind) -> bool {
        match self {
            EventFilter::Any => true,
            EventFilter::Only(only) => *only == kind,
        }
    }

    /// Event pattern as the backend spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventFilter::Any => "*",
            EventFilter::Only(kind) => kind.as_str(),
        }
    }
}

/// A change pattern on one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBinding {
    pub schema: String,
    pub table: String,
    pub filter: EventFilter,
}

impl TableBinding {
    /// Binding on a table in the default realtime schema.
    pub fn new(table: impl Into<String>, filter: EventFilter) -> Self {
        Self {
            schema: REALTIME_SCHEMA.to_string(),
            table: table.into(),
            filter,
        }
    }

    pub fn matches(&self, table: &str, kind: ChangeKind) -> bool {
        self.table == table && self.filter.matches(kind)
    }
}

/// Name and bindings of a channel to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub name: String,
    pub bindings: Vec<TableBinding>,
}

impl ChannelSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
        }
    }

    /// Add a binding for `table` with `filter`.
    pub fn on(mut self, table: impl Into<String>, filter: EventFilter) -> Self {
        self.bindings.push(TableBinding::new(table, filter));
        self
    }

    /// Whether any binding matches a change.
    pub fn matches(&self, table: &str, kind: ChangeKind) -> bool {
        self.bindings.iter().any(|b| b.matches(table, kind))
    }
}

/// One change delivered by a channel. Rows are untyped at this boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePayload {
    pub table: String,
    pub kind: ChangeKind,
    pub new_row: Value,
    pub old_row: Value,
    pub commit_timestamp: Option<String>,
}

impl ChangePayload {
    pub fn insert(table: impl Into<String>, row: Value) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Insert,
            new_row: row,
            old_row: Value::Null,
            commit_timestamp: None,
        }
    }

    pub fn update(table: impl Into<String>, new_row: Value, old_row: Value) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Update,
            new_row,
            old_row,
            commit_timestamp: None,
        }
    }

    pub fn delete(table: impl Into<String>, old_row: Value) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Delete,
            new_row: Value::Null,
            old_row,
            commit_timestamp: None,
        }
    }
}

/// Status reported by a channel's subscribe callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Subscribed,
    ChannelError,
    TimedOut,
    Closed,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Subscribed => "SUBSCRIBED",
            ChannelStatus::ChannelError => "CHANNEL_ERROR",
            ChannelStatus::TimedOut => "TIMED_OUT",
            ChannelStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiving end of a channel's deliveries.
pub type ChangeSink = mpsc::Sender<ChangePayload>;

/// An open channel. Dropping the handle does not close it; call [`close`].
///
/// [`close`]: RealtimeChannel::close
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Release the channel's network resources.
    async fn close(&self) -> Result<()>;
}

/// Opens realtime channels.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Open `spec` and wait for its status callback.
    ///
    /// Resolves to the channel once it reports [`ChannelStatus::Subscribed`];
    /// any other status is returned as `Error::ChannelStatus`. Matching
    /// changes are pushed into `sink` in the order the backend emits them.
    async fn subscribe(&self, spec: ChannelSpec, sink: ChangeSink)
        -> Result<Box<dyn RealtimeChannel>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_filter_matches() {
        assert!(EventFilter::Any.matches(ChangeKind::Delete));
        assert!(EventFilter::Only(ChangeKind::Insert).matches(ChangeKind::Insert));
        assert!(!EventFilter::Only(ChangeKind::Insert).matches(ChangeKind::Update));
        assert_eq!(EventFilter::Any.as_str(), "*");
        assert_eq!(EventFilter::Only(ChangeKind::Update).as_str(), "UPDATE");
    }

    #[test]
    fn test_channel_spec_matching() {
        let spec = ChannelSpec::new("feedback-updates")
            .on("feedback", EventFilter::Only(ChangeKind::Insert))
            .on("feedback", EventFilter::Only(ChangeKind::Update));
        assert_eq!(spec.bindings.len(), 2);
        assert_eq!(spec.bindings[0].schema, "public");
        assert!(spec.matches("feedback", ChangeKind::Update));
        assert!(!spec.matches("feedback", ChangeKind::Delete));
        assert!(!spec.matches("polls", ChangeKind::Insert));
    }

    #[test]
    fn test_change_kind_serde() {
        assert_eq!(serde_json::to_value(ChangeKind::Insert).unwrap(), "INSERT");
        let kind: ChangeKind = serde_json::from_value(serde_json::json!("DELETE")).unwrap();
        assert_eq!(kind, ChangeKind::Delete);
    }

    #[test]
    fn test_channel_status_names() {
        assert_eq!(ChannelStatus::TimedOut.to_string(), "TIMED_OUT");
        assert_eq!(ChannelStatus::Subscribed.as_str(), "SUBSCRIBED");
    }
}
