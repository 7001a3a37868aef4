use chrono::Utc;
use serde_json::Value;

use crate::decode::Fields;
use crate::models::{PerformanceMetrics, SystemMetrics};

/// Decode a metrics snapshot.
///
/// Counts default to `0`, health to `unknown`, and `last_updated` to the
/// decode time when the payload has no valid RFC 3339 timestamp.
pub fn normalize_system_metrics(value: &Value) -> SystemMetrics {
    let f = Fields::of(value);
    let perf = f.nested(&["performance_metrics", "performanceMetrics", "performance"]);

    SystemMetrics {
        total_topics: f.count(&["total_topics", "totalTopics"]),
        total_polls: f.count(&["total_polls", "totalPolls"]),
        active_polls: f.count(&["active_polls", "activePolls"]),
        total_users: f.get(&["total_users", "totalUsers"]),
        system_health: f
            .parsed(&["system_health", "systemHealth", "status"])
            .unwrap_or_default(),
        last_updated: f
            .get(&["last_updated", "lastUpdated", "timestamp"])
            .unwrap_or_else(Utc::now),
        performance_metrics: perf.is_object().then(|| PerformanceMetrics {
            response_time_avg: perf.number(&["response_time_avg", "responseTimeAvg"]),
            error_rate: perf.number(&["error_rate", "errorRate"]),
            uptime: perf.number(&["uptime"]),
        }),
    }
}
