//! The uniform success/error wrapper returned by every handler.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tagged result envelope.
///
/// Serializes to exactly one of:
///
/// ```json
/// {"status": "success", "data": ...}
/// {"status": "error", "message": "..."}
/// ```
///
/// Only `Success` envelopes may be cached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResultEnvelope {
    /// Provider output for a completed operation.
    Success {
        /// Provider payload (the completion text for AI operations)
        data: Value,
    },
    /// Diagnostic for a failed operation.
    Error {
        /// Human-readable reason; never empty
        message: String,
    },
}

impl ResultEnvelope {
    /// Wraps a payload in a success envelope.
    pub fn success(data: impl Into<Value>) -> Self {
        Self::Success { data: data.into() }
    }

    /// Builds an error envelope.
    ///
    /// An empty message is replaced so that error envelopes always carry a reason.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Unknown error occurred".to_string()
        } else {
            message
        };
        Self::Error { message }
    }

    /// Returns true for success envelopes.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Converts into a JSON value, as stored in the cache.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success { data } => serde_json::json!({ "status": "success", "data": data }),
            Self::Error { message } => serde_json::json!({ "status": "error", "message": message }),
        }
    }
}
