//! Common traits for Galley.
//!
//! These traits define the seams between the HTTP layer and the outside world,
//! so handlers can be driven by in-memory implementations in tests.

use async_trait::async_trait;

use crate::types::{Completion, ModelProfile, PromptContext};

// ═══════════════════════════════════════════════════════════════════════════════
// COMPLETION CLIENT TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for issuing one completion request to a model provider.
///
/// Implementations might use:
/// - An OpenAI-compatible HTTP endpoint (production)
/// - A scripted in-memory responder (testing)
///
/// A call never panics and never returns a transport error directly: every
/// failure is folded into [`Completion::Failure`] with a diagnostic message.
/// Implementations perform exactly one upstream attempt per call and keep no
/// state between calls.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends the rendered context to the model described by `profile`.
    async fn complete(&self, profile: &ModelProfile, context: &PromptContext) -> Completion;
}
