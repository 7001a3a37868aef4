use serde_json::Value;
use tracing::trace;

use super::journey::journey_from;
use super::record_id;
use crate::decode::Fields;
use crate::defaults::{FEEDBACK_CONTEXT_KEYS, FEEDBACK_SOURCE, FEEDBACK_SOURCE_DATABASE};
use crate::models::{AiAnalysis, FeedbackContext, NetworkRequest, UserJourney};

/// Decode a feedback context blob with full fidelity.
pub fn normalize_feedback_context(value: &Value) -> FeedbackContext {
    context_from(Fields::of(value))
}

/// Decode a `feedback` table row.
///
/// When the row's `metadata` carries a stored context blob, the blob is
/// decoded and any field it lacks is taken from the row's own columns.
/// Otherwise a minimal context is synthesized from the columns, with empty
/// logs and a default journey.
pub fn normalize_feedback_row(row: &Value) -> FeedbackContext {
    let columns = Fields::of(row);
    match stored_feedback_context(row) {
        Some(blob) => {
            trace!("Decoding feedback row from stored context");
            context_from(Fields::of(blob).with_fallback(columns))
        }
        None => {
            trace!("Synthesizing feedback context from row columns");
            synthesize_from_columns(columns)
        }
    }
}

/// The stored context blob in a feedback row's metadata, if any.
pub fn stored_feedback_context(row: &Value) -> Option<&Value> {
    let metadata = row.get("metadata")?.as_object()?;
    FEEDBACK_CONTEXT_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key))
        .find(|blob| blob.is_object())
}

fn context_from(f: Fields<'_>) -> FeedbackContext {
    FeedbackContext {
        feedback_id: record_id(&f, &["feedbackId", "feedback_id", "id"]).unwrap_or_default(),
        timestamp: f.get(&["timestamp", "createdAt", "created_at"]),
        source: f.get_or(&["source"], FEEDBACK_SOURCE.to_string()),
        user_journey: journey_from(f.nested(&["userJourney", "user_journey"])),
        kind: f
            .parsed(&["type", "feedbackType", "feedback_type"])
            .unwrap_or_default(),
        title: f.string(&["title"]),
        description: f.string(&["description"]),
        sentiment: f.parsed(&["sentiment"]).unwrap_or_default(),
        screenshot: f.get(&["screenshot"]),
        console_logs: f
            .get(&["consoleLogs", "console_logs"])
            .unwrap_or_default(),
        network_requests: f
            .list(&["networkRequests", "network_requests"])
            .iter()
            .filter_map(network_request)
            .collect(),
        category: category(&f, &["category", "categories", "tags"]),
        priority: f.parsed(&["priority"]).unwrap_or_default(),
        severity: f.parsed(&["severity"]).unwrap_or_default(),
        ai_analysis: ai_analysis_from(f.nested(&["aiAnalysis", "ai_analysis"])),
    }
}

fn synthesize_from_columns(f: Fields<'_>) -> FeedbackContext {
    FeedbackContext {
        feedback_id: record_id(&f, &["id", "feedback_id"]).unwrap_or_default(),
        timestamp: f.get(&["created_at", "updated_at", "createdAt"]),
        source: FEEDBACK_SOURCE_DATABASE.to_string(),
        user_journey: UserJourney::default(),
        kind: f.parsed(&["type", "feedback_type"]).unwrap_or_default(),
        title: f.string(&["title"]),
        description: f.string(&["description"]),
        sentiment: f.parsed(&["sentiment"]).unwrap_or_default(),
        screenshot: f.get(&["screenshot"]),
        console_logs: Vec::new(),
        network_requests: Vec::new(),
        category: category(&f, &["tags", "category"]),
        priority: f.parsed(&["priority"]).unwrap_or_default(),
        severity: f.parsed(&["severity"]).unwrap_or_default(),
        ai_analysis: None,
    }
}

/// Category list; a single string becomes a one-element list.
fn category(f: &Fields<'_>, keys: &[&str]) -> Vec<String> {
    f.resolve(|layer| {
        keys.iter().find_map(|key| {
            let key = std::slice::from_ref(key);
            layer
                .get::<Vec<String>>(key)
                .or_else(|| layer.get::<String>(key).map(|single| vec![single]))
        })
    })
    .unwrap_or_default()
}

fn network_request(value: &Value) -> Option<NetworkRequest> {
    let f = Fields::of(value);
    Some(NetworkRequest {
        url: f.get(&["url"])?,
        method: f.get_or(&["method"], "GET".to_string()),
        status: f.get(&["status"]),
        duration: f.number(&["duration"]),
        timestamp: f.get(&["timestamp"]),
    })
}

/// All-or-nothing: any missing required field yields `None`.
fn ai_analysis_from(f: Fields<'_>) -> Option<AiAnalysis> {
    Some(AiAnalysis {
        intent: f.get(&["intent"])?,
        category: f.get(&["category"])?,
        sentiment: f.get(&["sentiment"])?,
        urgency: f.get(&["urgency"])?,
        complexity: f.get(&["complexity"])?,
        keywords: f.get(&["keywords"]).unwrap_or_default(),
        suggested_actions: f
            .get(&["suggestedActions", "suggested_actions"])
            .unwrap_or_default(),
    })
}
