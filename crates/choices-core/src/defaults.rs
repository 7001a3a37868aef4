//! Centralized default constants for Choices realtime.
//!
//! Decoders, the journey recorder and the realtime crate all read these
//! instead of defining their own magic numbers.

// =============================================================================
// DECODE DEFAULTS
// =============================================================================

/// Health status reported when a metrics payload has none (or an unknown one).
pub const SYSTEM_HEALTH_UNKNOWN: &str = "unknown";

/// Source recorded on a feedback context that did not carry one.
pub const FEEDBACK_SOURCE: &str = "widget";

/// Source recorded on a feedback context synthesized from table columns.
pub const FEEDBACK_SOURCE_DATABASE: &str = "database";

/// Activity type used when an activity row has none.
pub const ACTIVITY_TYPE: &str = "system";

// =============================================================================
// USER JOURNEY
// =============================================================================

/// Maximum number of actions kept in a journey's action sequence.
pub const JOURNEY_MAX_ACTIONS: usize = 20;

/// Maximum number of errors kept in a journey.
pub const JOURNEY_MAX_ERRORS: usize = 10;

// =============================================================================
// FEEDBACK ROW METADATA
// =============================================================================

/// Metadata keys under which a stored feedback context blob may live.
pub const FEEDBACK_CONTEXT_KEYS: &[&str] = &["feedbackContext", "feedback_context"];

// =============================================================================
// REALTIME
// =============================================================================

/// Default API base URL for the metrics snapshot endpoint.
pub const API_BASE_URL: &str = "http://localhost:3000";

/// Default path of the metrics snapshot endpoint.
pub const METRICS_PATH: &str = "/api/admin/system-metrics";

/// Default HTTP timeout for one metrics fetch.
pub const METRICS_TIMEOUT_SECS: u64 = 10;

/// Per-subscription delivery buffer between channel and dispatcher.
pub const DELIVERY_BUFFER: usize = 256;

/// Postgres schema realtime tables live in.
pub const REALTIME_SCHEMA: &str = "public";

/// Envelope paths tried, in order, when unwrapping a metrics response.
pub const METRICS_ENVELOPE_PATHS: &[&str] = &["/data/metrics", "/data", "/metrics"];
