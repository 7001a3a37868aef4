//! # choices-core
//!
//! Domain types and the payload normalizer for Choices realtime updates.
//!
//! Rows arriving from the backend change feed are untyped and their field
//! names drift between producers. This crate is the compatibility boundary:
//! the [`normalize`] functions turn any JSON value into a structurally valid
//! entity, and [`events`] wraps those entities in the tagged unions that
//! subscription handlers receive.

pub mod decode;
pub mod defaults;
pub mod error;
pub mod events;
pub mod models;
pub mod normalize;
pub mod recorder;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{AdminEvent, ChannelKind, FeedbackEvent};
pub use models::*;
pub use normalize::*;
pub use recorder::JourneyRecorder;
