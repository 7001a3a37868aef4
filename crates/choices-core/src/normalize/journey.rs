use serde_json::Value;

use super::keep_recent;
use crate::decode::Fields;
use crate::defaults::{JOURNEY_MAX_ACTIONS, JOURNEY_MAX_ERRORS};
use crate::models::{DeviceInfo, JourneyAction, JourneyError, JourneyPerformance, UserJourney};

/// Decode a user journey snapshot.
///
/// Accepts both the camelCase keys written by the web client and the
/// snake_case keys of older producers; camelCase wins when both are present.
/// Errors and actions keep only the most recent bounded window.
pub fn normalize_user_journey(value: &Value) -> UserJourney {
    journey_from(Fields::of(value))
}

/// Decode device information.
pub fn normalize_device_info(value: &Value) -> DeviceInfo {
    device_info_from(Fields::of(value))
}

/// Decode page performance figures.
pub fn normalize_journey_performance(value: &Value) -> JourneyPerformance {
    performance_from(Fields::of(value))
}

pub(super) fn journey_from(f: Fields<'_>) -> UserJourney {
    let errors = f
        .list(&["errors"])
        .iter()
        .filter_map(journey_error)
        .collect();
    let actions = f
        .list(&["actionSequence", "action_sequence"])
        .iter()
        .filter_map(journey_action)
        .collect();

    UserJourney {
        current_page: f.string(&["currentPage", "current_page"]),
        current_path: f.string(&["currentPath", "current_path"]),
        page_title: f.string(&["pageTitle", "page_title"]),
        referrer: f.string(&["referrer"]),
        time_on_page: f.number(&["timeOnPage", "time_on_page"]),
        session_id: f.string(&["sessionId", "session_id"]),
        session_start_time: f.get(&["sessionStartTime", "session_start_time"]),
        device_info: device_info_from(f.nested(&["deviceInfo", "device_info"])),
        performance_metrics: performance_from(
            f.nested(&["performanceMetrics", "performance_metrics"]),
        ),
        errors: keep_recent(errors, JOURNEY_MAX_ERRORS),
        action_sequence: keep_recent(actions, JOURNEY_MAX_ACTIONS),
        last_action: f.string(&["lastAction", "last_action"]),
        is_authenticated: f.flag(&["isAuthenticated", "is_authenticated"]),
        user_role: f.get(&["userRole", "user_role"]),
        user_id: f.get(&["userId", "user_id"]),
    }
}

fn device_info_from(f: Fields<'_>) -> DeviceInfo {
    DeviceInfo {
        device_type: f.parsed(&["type", "deviceType", "device_type"]).unwrap_or_default(),
        os: f.string(&["os"]),
        browser: f.string(&["browser"]),
        screen_resolution: f.string(&["screenResolution", "screen_resolution"]),
        viewport_size: f.string(&["viewportSize", "viewport_size"]),
        language: f.string(&["language"]),
        timezone: f.string(&["timezone"]),
    }
}

fn performance_from(f: Fields<'_>) -> JourneyPerformance {
    JourneyPerformance {
        page_load_time: f.number(&["pageLoadTime", "page_load_time"]),
        time_to_interactive: f.number(&["timeToInteractive", "time_to_interactive"]),
        first_contentful_paint: f.number(&["firstContentfulPaint", "first_contentful_paint"]),
        largest_contentful_paint: f.number(&["largestContentfulPaint", "largest_contentful_paint"]),
        cumulative_layout_shift: f.number(&["cumulativeLayoutShift", "cumulative_layout_shift"]),
    }
}

/// A bare string is an error message; objects need a non-empty message.
fn journey_error(value: &Value) -> Option<JourneyError> {
    if let Some(message) = value.as_str().filter(|s| !s.is_empty()) {
        return Some(JourneyError {
            kind: "error".to_string(),
            message: message.to_string(),
            stack: None,
            timestamp: None,
        });
    }
    let f = Fields::of(value);
    Some(JourneyError {
        message: f.get(&["message"])?,
        kind: f.get_or(&["type", "kind"], "error".to_string()),
        stack: f.get(&["stack"]),
        timestamp: f.get(&["timestamp"]),
    })
}

/// A bare string is an action name; objects need a non-empty action.
fn journey_action(value: &Value) -> Option<JourneyAction> {
    if let Some(action) = value.as_str().filter(|s| !s.is_empty()) {
        return Some(JourneyAction {
            action: action.to_string(),
            target: String::new(),
            timestamp: None,
            metadata: Default::default(),
        });
    }
    let f = Fields::of(value);
    Some(JourneyAction {
        action: f.get(&["action", "type"])?,
        target: f.string(&["target", "page", "element"]),
        timestamp: f.get(&["timestamp"]),
        metadata: f.get(&["metadata"]).unwrap_or_default(),
    })
}
