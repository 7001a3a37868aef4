//! User journey snapshot embedded in feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

string_enum! {
    /// Form factor of the reporting client.
    pub enum DeviceType {
        Mobile => "mobile",
        Tablet => "tablet",
        Desktop => "desktop",
        Unknown => "unknown",
    }
    default = Unknown;
}

/// Client device description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub os: String,
    pub browser: String,
    pub screen_resolution: String,
    pub viewport_size: String,
    pub language: String,
    pub timezone: String,
}

/// Page performance figures, all in milliseconds except layout shift.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyPerformance {
    pub page_load_time: f64,
    pub time_to_interactive: f64,
    pub first_contentful_paint: f64,
    pub largest_contentful_paint: f64,
    pub cumulative_layout_shift: f64,
}

/// An error observed on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One step of the navigation breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyAction {
    pub action: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: Map<String, Value>,
}

/// Point-in-time snapshot of a client session.
///
/// `errors` and `action_sequence` never exceed
/// [`JOURNEY_MAX_ERRORS`](crate::defaults::JOURNEY_MAX_ERRORS) and
/// [`JOURNEY_MAX_ACTIONS`](crate::defaults::JOURNEY_MAX_ACTIONS).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJourney {
    pub current_page: String,
    pub current_path: String,
    pub page_title: String,
    pub referrer: String,
    pub time_on_page: f64,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_start_time: Option<DateTime<Utc>>,
    pub device_info: DeviceInfo,
    pub performance_metrics: JourneyPerformance,
    pub errors: Vec<JourneyError>,
    pub action_sequence: Vec<JourneyAction>,
    pub last_action: String,
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}
