//! # Galley Core
//!
//! Core types, errors, and traits for the Galley restaurant AI gateway.
//!
//! This crate provides the building blocks shared by the other Galley crates:
//!
//! - **Types**: result envelopes, the task catalog, model profiles and prompt contexts
//! - **Errors**: a single error hierarchy built on `thiserror`
//! - **Constants**: deployment defaults (TTLs, temperatures, rate limits)
//! - **Traits**: the completion-client seam the API layer is written against
//!
//! ## Example
//!
//! ```rust
//! use galley_core::{ResultEnvelope, Task};
//!
//! let task = Task::InventoryPrediction;
//! assert_eq!(task.operation(), "inventory_prediction");
//!
//! let envelope = ResultEnvelope::success(serde_json::json!("restock tomatoes"));
//! let json = serde_json::to_value(&envelope).unwrap();
//! assert_eq!(json["status"], "success");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{GalleyError, Result};
pub use traits::*;
pub use types::*;
