//! Model-provider client for Galley.
//!
//! Sends one chat-completions request per call to an OpenAI-compatible
//! endpoint and folds every outcome into a [`galley_core::Completion`].
//! No caching and no retries happen here; those belong to the caller.

mod client;

pub use client::{GatewayConfig, HttpGateway};
