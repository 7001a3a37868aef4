//! Error types for Choices realtime.
//!
//! Decoding is total and never produces these. They only appear at the
//! transport and HTTP boundary, where the subscription manager absorbs and
//! logs them.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for realtime operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Opening or closing a realtime channel failed
    #[error("Channel error: {0}")]
    Channel(String),

    /// Channel reported a status other than subscribed
    #[error("Channel {channel} reported status {status}")]
    ChannelStatus { channel: String, status: String },

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Response body did not carry a recognizable payload
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation was superseded or cancelled before completing
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for [`Error::Cancelled`], which callers log below error level.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_channel() {
        let err = Error::Channel("socket closed".to_string());
        assert_eq!(err.to_string(), "Channel error: socket closed");
    }

    #[test]
    fn test_error_display_channel_status() {
        let err = Error::ChannelStatus {
            channel: "admin-updates".to_string(),
            status: "TIMED_OUT".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Channel admin-updates reported status TIMED_OUT"
        );
    }

    #[test]
    fn test_error_display_request() {
        let err = Error::Request("network unreachable".to_string());
        assert_eq!(err.to_string(), "Request error: network unreachable");
    }

    #[test]
    fn test_error_display_invalid_payload() {
        let err = Error::InvalidPayload("no metrics envelope".to_string());
        assert_eq!(err.to_string(), "Invalid payload: no metrics envelope");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("empty base url".to_string());
        assert_eq!(err.to_string(), "Configuration error: empty base url");
    }

    #[test]
    fn test_cancelled_is_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Internal("x".to_string()).is_cancelled());
        assert_eq!(Error::Cancelled.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>(r#"{"invalid": json}"#);
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
