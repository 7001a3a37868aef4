//! Client session recorder that produces [`UserJourney`] snapshots.
//!
//! Errors and actions are kept in bounded ring buffers; pushing past the
//! cap evicts the oldest entry, so a long-lived session never grows them
//! beyond [`JOURNEY_MAX_ERRORS`] / [`JOURNEY_MAX_ACTIONS`].

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::defaults::{JOURNEY_MAX_ACTIONS, JOURNEY_MAX_ERRORS};
use crate::models::{DeviceInfo, JourneyAction, JourneyError, JourneyPerformance, UserJourney};

/// Records navigation, actions and errors for one client session.
#[derive(Debug, Clone)]
pub struct JourneyRecorder {
    session_id: String,
    session_start: DateTime<Utc>,
    current_path: String,
    page_title: String,
    referrer: String,
    page_entered_at: DateTime<Utc>,
    device_info: DeviceInfo,
    performance: JourneyPerformance,
    errors: VecDeque<JourneyError>,
    actions: VecDeque<JourneyAction>,
    user_id: Option<String>,
    user_role: Option<String>,
}

impl JourneyRecorder {
    /// Start a new session with a random session id.
    pub fn new(device_info: DeviceInfo) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            session_start: now,
            current_path: String::new(),
            page_title: String::new(),
            referrer: String::new(),
            page_entered_at: now,
            device_info,
            performance: JourneyPerformance::default(),
            errors: VecDeque::with_capacity(JOURNEY_MAX_ERRORS),
            actions: VecDeque::with_capacity(JOURNEY_MAX_ACTIONS),
            user_id: None,
            user_role: None,
        }
    }

    /// Use an externally assigned session id.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Move to a new page. The previous path becomes the referrer and the
    /// navigation is recorded as an action.
    pub fn navigate(&mut self, path: impl Into<String>, title: impl Into<String>) {
        let path = path.into();
        let previous = std::mem::replace(&mut self.current_path, path.clone());
        if !previous.is_empty() {
            self.referrer = previous;
        }
        self.page_title = title.into();
        self.page_entered_at = Utc::now();
        self.record_action("navigate", path);
    }

    /// Record a user action against `target`.
    pub fn record_action(&mut self, action: impl Into<String>, target: impl Into<String>) {
        self.push_action(JourneyAction {
            action: action.into(),
            target: target.into(),
            timestamp: Some(Utc::now()),
            metadata: Map::new(),
        });
    }

    /// Record an action with metadata attached.
    pub fn record_action_with(
        &mut self,
        action: impl Into<String>,
        target: impl Into<String>,
        metadata: Map<String, Value>,
    ) {
        self.push_action(JourneyAction {
            action: action.into(),
            target: target.into(),
            timestamp: Some(Utc::now()),
            metadata,
        });
    }

    /// Record a client-side error.
    pub fn record_error(
        &mut self,
        kind: impl Into<String>,
        message: impl Into<String>,
        stack: Option<String>,
    ) {
        if self.errors.len() == JOURNEY_MAX_ERRORS {
            self.errors.pop_front();
        }
        self.errors.push_back(JourneyError {
            kind: kind.into(),
            message: message.into(),
            stack,
            timestamp: Some(Utc::now()),
        });
    }

    pub fn set_performance(&mut self, performance: JourneyPerformance) {
        self.performance = performance;
    }

    /// Attach (or clear) the signed-in user.
    pub fn set_user(&mut self, user_id: Option<String>, role: Option<String>) {
        self.user_id = user_id;
        self.user_role = role;
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Owned snapshot of the session as of now.
    pub fn snapshot(&self) -> UserJourney {
        self.snapshot_at(Utc::now())
    }

    /// Owned snapshot with time-on-page measured up to `now`, in seconds.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> UserJourney {
        let elapsed_ms = (now - self.page_entered_at).num_milliseconds().max(0);
        let time_on_page = elapsed_ms as f64 / 1000.0;
        UserJourney {
            current_page: self.current_path.clone(),
            current_path: self.current_path.clone(),
            page_title: self.page_title.clone(),
            referrer: self.referrer.clone(),
            time_on_page,
            session_id: self.session_id.clone(),
            session_start_time: Some(self.session_start),
            device_info: self.device_info.clone(),
            performance_metrics: self.performance.clone(),
            errors: self.errors.iter().cloned().collect(),
            action_sequence: self.actions.iter().cloned().collect(),
            last_action: self
                .actions
                .back()
                .map(|a| a.action.clone())
                .unwrap_or_default(),
            is_authenticated: self.user_id.is_some(),
            user_role: self.user_role.clone(),
            user_id: self.user_id.clone(),
        }
    }

    fn push_action(&mut self, action: JourneyAction) {
        if self.actions.len() == JOURNEY_MAX_ACTIONS {
            self.actions.pop_front();
        }
        self.actions.push_back(action);
    }
}
