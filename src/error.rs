//! Error types for Synheart Touch

use thiserror::Error;

/// Errors that can occur while building measurements, loading configuration
/// or parsing recorded touch streams.
///
/// Gesture protocol violations are not errors of this type; see
/// [`crate::tracker::GestureFailure`].
#[derive(Debug, Error)]
pub enum TouchError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown measurement kind: {0}")]
    UnknownKind(String),

    #[error("Measurement kind {kind} expects a {expected} value")]
    KindMismatch { kind: String, expected: &'static str },

    #[error("Non-finite value for measurement kind {kind}")]
    NonFiniteValue { kind: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid touch sample: {0}")]
    InvalidSample(String),
}
