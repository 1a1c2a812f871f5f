//! Core data types for Galley.

mod completion;
mod envelope;
mod task;

pub use completion::{Completion, ModelProfile, PromptContext};
pub use envelope::ResultEnvelope;
pub use task::{Domain, Task};
