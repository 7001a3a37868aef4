//! Feedback context delivered to the admin feedback inbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::journey::UserJourney;

string_enum! {
    /// What the feedback is about.
    pub enum FeedbackKind {
        Bug => "bug",
        Feature => "feature",
        General => "general",
        Performance => "performance",
        Accessibility => "accessibility",
        Security => "security",
        Correction => "correction",
    }
    default = General;
}

string_enum! {
    /// Reporter sentiment.
    pub enum Sentiment {
        Positive => "positive",
        Negative => "negative",
        Neutral => "neutral",
        Mixed => "mixed",
    }
    default = Neutral;
}

string_enum! {
    /// Triage priority.
    pub enum Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
    default = Medium;
}

string_enum! {
    /// Impact of the reported problem.
    pub enum Severity {
        Minor => "minor",
        Moderate => "moderate",
        Major => "major",
        Critical => "critical",
    }
    default = Moderate;
}

/// A network request captured alongside the feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub url: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Automated triage of a feedback item. Only ever constructed complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub intent: String,
    pub category: String,
    pub sentiment: f64,
    pub urgency: f64,
    pub complexity: f64,
    pub keywords: Vec<String>,
    pub suggested_actions: Vec<String>,
}

/// A feedback record with the journey snapshot taken when it was filed.
///
/// `category` is always an array and `ai_analysis` is either complete or
/// `None` (serialized as `null`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackContext {
    pub feedback_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub source: String,
    pub user_journey: UserJourney,
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub title: String,
    pub description: String,
    pub sentiment: Sentiment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    pub console_logs: Vec<String>,
    pub network_requests: Vec<NetworkRequest>,
    pub category: Vec<String>,
    pub priority: Priority,
    pub severity: Severity,
    pub ai_analysis: Option<AiAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_context_serializes_camel_case() {
        let ctx = FeedbackContext {
            feedback_id: "fb-1".to_string(),
            category: vec!["ui".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["feedbackId"], "fb-1");
        assert_eq!(json["type"], "general");
        assert_eq!(json["consoleLogs"], serde_json::json!([]));
        assert!(json["aiAnalysis"].is_null());
        assert_eq!(json["userJourney"]["deviceInfo"]["type"], "unknown");
    }

    #[test]
    fn test_enum_defaults() {
        assert_eq!(FeedbackKind::default(), FeedbackKind::General);
        assert_eq!(Sentiment::default(), Sentiment::Neutral);
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Severity::default(), Severity::Moderate);
        assert_eq!(Severity::Major.to_string(), "major");
    }
}
