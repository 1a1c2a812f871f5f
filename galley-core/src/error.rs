//! Error types for Galley.
//!
//! This module provides the error hierarchy using `thiserror`.
//! Upstream failures keep the diagnostic text the provider gave us so it can be
//! surfaced in the error envelope unchanged.

use thiserror::Error;

/// Result type alias using `GalleyError`.
pub type Result<T> = std::result::Result<T, GalleyError>;

/// Main error type for all Galley operations.
#[derive(Debug, Error)]
pub enum GalleyError {
    // ═══════════════════════════════════════════════════════════════════════════
    // REQUEST ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Request body failed schema validation.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Operation id does not name a known task.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // UPSTREAM ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Model provider answered with a non-success status.
    #[error("AI API error: {reason}")]
    UpstreamStatus { status: u16, reason: String },

    /// Model provider could not be reached.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Model provider answered with a body we could not read.
    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl GalleyError {
    /// Returns true if the failure came from the model provider.
    ///
    /// Upstream failures are reported to the caller as-is; nothing retries them.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            GalleyError::UpstreamStatus { .. }
                | GalleyError::HttpError(_)
                | GalleyError::MalformedResponse(_)
        )
    }

    /// Returns true if the caller sent something we reject (HTTP 400).
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            GalleyError::ValidationError(_) | GalleyError::UnknownTask(_)
        )
    }
}
