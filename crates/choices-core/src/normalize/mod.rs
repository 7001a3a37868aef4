//! Total decoders from untyped rows and JSON blobs into domain entities.
//!
//! Every function here is pure and never fails: malformed or missing fields
//! are replaced by their documented defaults, and a non-object input yields
//! a fully defaulted value (or `None` where the entity requires an id).

mod admin;
mod feedback;
mod journey;
mod metrics;

pub use admin::{normalize_activity_item, normalize_admin_notification};
pub use feedback::{normalize_feedback_context, normalize_feedback_row, stored_feedback_context};
pub use journey::{normalize_device_info, normalize_journey_performance, normalize_user_journey};
pub use metrics::normalize_system_metrics;

pub use crate::decode::normalize_string_array;

use crate::decode::Fields;

/// Record id as a string: non-empty strings, or non-negative integers.
///
/// Keys are tried in order on each layer; the first key holding either
/// shape wins.
fn record_id(fields: &Fields<'_>, keys: &[&str]) -> Option<String> {
    fields.resolve(|layer| {
        keys.iter().find_map(|key| {
            let key = std::slice::from_ref(key);
            layer
                .get::<String>(key)
                .or_else(|| layer.get::<u64>(key).map(|n| n.to_string()))
        })
    })
}

/// Keep only the most recent `cap` entries.
fn keep_recent<T>(mut items: Vec<T>, cap: usize) -> Vec<T> {
    if items.len() > cap {
        items.drain(..items.len() - cap);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_accepts_integers() {
        let v = json!({"id": 42});
        assert_eq!(record_id(&Fields::of(&v), &["id"]), Some("42".to_string()));
        let v = json!({"id": ""});
        assert_eq!(record_id(&Fields::of(&v), &["id"]), None);
        let v = json!({"id": -1});
        assert_eq!(record_id(&Fields::of(&v), &["id"]), None);
    }

    #[test]
    fn test_record_id_key_order_beats_shape() {
        let v = json!({"feedbackId": 42, "id": "row-1"});
        assert_eq!(
            record_id(&Fields::of(&v), &["feedbackId", "id"]),
            Some("42".to_string())
        );
    }

    #[test]
    fn test_keep_recent_drops_oldest() {
        assert_eq!(keep_recent(vec![1, 2, 3, 4, 5], 3), vec![3, 4, 5]);
        assert_eq!(keep_recent(vec![1, 2], 3), vec![1, 2]);
    }
}
