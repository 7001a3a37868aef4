//! Domain entities produced by the normalizer.
//!
//! Every entity is an owned value: events embed their snapshots by value and
//! never share mutable state with each other or with the decoder.

/// Declares a closed string-valued enum with serde names, `Display`,
/// case-insensitive `FromStr` and an explicit default variant.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
        default = $default:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant, )+
        }

        impl $name {
            /// Wire name of this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(format!("unknown {}: {}", stringify!($name), other)),
                }
            }
        }
    };
}

pub mod admin;
pub mod feedback;
pub mod journey;
pub mod metrics;

pub use admin::{ActivityItem, AdminNotification, NotificationAction, NotificationKind};
pub use feedback::{
    AiAnalysis, FeedbackContext, FeedbackKind, NetworkRequest, Priority, Sentiment, Severity,
};
pub use journey::{
    DeviceInfo, DeviceType, JourneyAction, JourneyError, JourneyPerformance, UserJourney,
};
pub use metrics::{PerformanceMetrics, SystemHealth, SystemMetrics};
