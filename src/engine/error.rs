//! Engine Error Definitions
//!
//! Defines error types used throughout the preview engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Preview engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    // =========================================================================
    // Thumbnail Errors
    // =========================================================================
    #[error("Frame capture failed: {0}")]
    CaptureFailed(String),

    #[error("Store write failed: {0}")]
    StoreFailed(String),

    // =========================================================================
    // Playback Errors
    // =========================================================================
    #[error("Play request rejected by autoplay policy: {0}")]
    PlaybackRejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported format: {0}")]
    FormatUnsupported(String),

    // =========================================================================
    // Streaming Errors
    // =========================================================================
    #[error("Fatal stream error: {0}")]
    FatalStream(String),

    #[error("Stream session closed")]
    SessionClosed,

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Preview engine result type
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Error Classification
// =============================================================================

/// Classification stored in a preview's error state, driving the retry
/// affordance shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Network,
    Decode,
    FormatUnsupported,
    Aborted,
}

/// Classified error with a human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl EngineError {
    /// Maps an engine error onto the user-facing classification, when one
    /// applies. Ambient errors (IO, JSON, settings) have no preview-card
    /// classification and return `None`.
    pub fn classify(&self) -> Option<ErrorKind> {
        match self {
            Self::Network(_) => Some(ErrorKind::Network),
            Self::Decode(_) | Self::FatalStream(_) => Some(ErrorKind::Decode),
            Self::FormatUnsupported(_) => Some(ErrorKind::FormatUnsupported),
            Self::Timeout(_) | Self::SessionClosed => Some(ErrorKind::Aborted),
            _ => None,
        }
    }
}
