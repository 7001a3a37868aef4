use serde_json::Value;

use super::record_id;
use crate::decode::Fields;
use crate::defaults::ACTIVITY_TYPE;
use crate::models::{ActivityItem, AdminNotification, NotificationAction};

/// Decode an `admin_notifications` row. `None` when the row has no usable id.
pub fn normalize_admin_notification(value: &Value) -> Option<AdminNotification> {
    let f = Fields::of(value);
    let id = record_id(&f, &["id", "notification_id"])?;

    let action = f.nested(&["action"]);
    let action = match (
        action.get::<String>(&["label"]),
        action.get::<String>(&["url", "href"]),
    ) {
        (Some(label), Some(url)) => Some(NotificationAction { label, url }),
        _ => None,
    };

    Some(AdminNotification {
        id,
        kind: f.parsed(&["type", "kind"]).unwrap_or_default(),
        title: f.string(&["title"]),
        message: f.string(&["message", "body"]),
        timestamp: f.get(&["timestamp", "created_at", "createdAt"]),
        read: f.flag(&["read", "is_read", "isRead"]),
        action,
        metadata: f.get(&["metadata"]).unwrap_or_default(),
    })
}

/// Decode an `admin_activity_log` row. `None` when the row has no usable id.
pub fn normalize_activity_item(value: &Value) -> Option<ActivityItem> {
    let f = Fields::of(value);
    let id = record_id(&f, &["id", "activity_id"])?;

    Some(ActivityItem {
        id,
        activity_type: f.get_or(&["type", "activity_type"], ACTIVITY_TYPE.to_string()),
        title: f.string(&["title", "action"]),
        description: f.string(&["description", "details"]),
        timestamp: f.get(&["timestamp", "created_at", "createdAt"]),
        user_id: f.get(&["user_id", "userId"]),
        metadata: f.get(&["metadata"]).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;
    use serde_json::json;

    #[test]
    fn test_notification_requires_id() {
        assert!(normalize_admin_notification(&json!({"title": "x"})).is_none());
        assert!(normalize_admin_notification(&json!({"id": ""})).is_none());
        assert!(normalize_admin_notification(&json!(null)).is_none());
        assert!(normalize_admin_notification(&json!([{"id": "n1"}])).is_none());
    }

    #[test]
    fn test_notification_full_row() {
        let n = normalize_admin_notification(&json!({
            "id": "n1",
            "type": "warning",
            "title": "Disk",
            "message": "Disk at 90%",
            "created_at": "2026-04-02T10:00:00Z",
            "read": true,
            "action": {"label": "Open", "url": "/admin/system"},
            "metadata": {"host": "db-1"}
        }))
        .unwrap();
        assert_eq!(n.id, "n1");
        assert_eq!(n.kind, NotificationKind::Warning);
        assert_eq!(n.message, "Disk at 90%");
        assert!(n.read);
        assert!(n.timestamp.is_some());
        assert_eq!(n.action.unwrap().url, "/admin/system");
        assert_eq!(n.metadata["host"], "db-1");
    }

    #[test]
    fn test_notification_partial_action_dropped() {
        let n = normalize_admin_notification(&json!({"id": 7, "action": {"label": "Open"}}))
            .unwrap();
        assert_eq!(n.id, "7");
        assert!(n.action.is_none());
        assert_eq!(n.kind, NotificationKind::Info);
        assert!(!n.read);
        assert!(n.metadata.is_empty());
    }

    #[test]
    fn test_activity_defaults() {
        let a = normalize_activity_item(&json!({"id": "a1", "metadata": "nope"})).unwrap();
        assert_eq!(a.activity_type, "system");
        assert_eq!(a.title, "");
        assert!(a.user_id.is_none());
        assert!(a.metadata.is_empty());
    }

    #[test]
    fn test_activity_requires_id() {
        assert!(normalize_activity_item(&json!({"type": "login"})).is_none());
    }
}
