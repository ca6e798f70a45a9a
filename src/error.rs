//! Error types for the library.

use thiserror::Error;

/// Errors raised by an event transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is closed, or was never opened.
    #[error("Transport closed")]
    Closed,

    /// Reading or writing the underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An outbound message could not be serialized.
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors decoding an inbound frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame has no `chuckt` envelope.
    #[error("Missing event envelope")]
    MissingEnvelope,

    /// The envelope has no event name.
    #[error("Missing event name")]
    MissingEvent,
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file or environment could not be read.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A color string is neither `rgb(r, g, b)` nor `#rrggbb`.
    #[error("Invalid color: {0}")]
    Color(String),

    /// The configuration was read but its values are unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
