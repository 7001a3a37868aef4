//! System metrics snapshot shown on the admin dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_enum! {
    /// Overall system health reported by the backend.
    pub enum SystemHealth {
        Healthy => "healthy",
        Warning => "warning",
        Critical => "critical",
        Unknown => "unknown",
    }
    default = Unknown;
}

/// Optional request-level performance figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Average response time in milliseconds.
    pub response_time_avg: f64,
    /// Fraction of failed requests (0.0 - 1.0).
    pub error_rate: f64,
    /// Uptime percentage.
    pub uptime: f64,
}

/// Numeric dashboard snapshot.
///
/// Count fields are always present (`0` when the source had nothing usable)
/// and `system_health` is [`SystemHealth::Unknown`] when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub total_topics: u64,
    pub total_polls: u64,
    pub active_polls: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_users: Option<u64>,
    pub system_health: SystemHealth,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_metrics: Option<PerformanceMetrics>,
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self {
            total_topics: 0,
            total_polls: 0,
            active_polls: 0,
            total_users: None,
            system_health: SystemHealth::Unknown,
            last_updated: Utc::now(),
            performance_metrics: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_health_from_str() {
        assert_eq!("healthy".parse::<SystemHealth>(), Ok(SystemHealth::Healthy));
        assert_eq!(" CRITICAL ".parse::<SystemHealth>(), Ok(SystemHealth::Critical));
        assert!("degraded".parse::<SystemHealth>().is_err());
    }

    #[test]
    fn test_system_metrics_serializes_unknown_health() {
        let json = serde_json::to_value(SystemMetrics::default()).unwrap();
        assert_eq!(json["system_health"], "unknown");
        assert_eq!(json["total_topics"], 0);
        assert!(json.get("total_users").is_none());
        assert!(json.get("performance_metrics").is_none());
        assert!(json["last_updated"].is_string());
    }
}
