//! Model profiles, prompt contexts and completion outcomes.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::error::Result;
use crate::types::task::{Domain, Task};

/// Sampling configuration for one domain.
///
/// All domains share the model name and token cap; only the temperature differs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Model name sent to the provider
    pub model: String,
    /// Completion token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl ModelProfile {
    /// Default profile for a domain.
    pub fn for_domain(domain: Domain) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: domain.temperature(),
        }
    }

    /// Overrides the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Everything the model is told about a task.
///
/// Rendered as pretty-printed JSON with the task description first, then the
/// payload fields in the task's declared order, then the requirement flags.
#[derive(Clone, Debug, PartialEq)]
pub struct PromptContext {
    task: String,
    payload: Vec<(String, Value)>,
    requirements: Vec<(String, bool)>,
}

impl PromptContext {
    /// Creates an empty context for a free-form task description.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            payload: Vec::new(),
            requirements: Vec::new(),
        }
    }

    /// Builds the context for a catalog task from a request body.
    ///
    /// Only the task's payload fields are forwarded; a missing field is sent as `null`.
    pub fn for_task(task: Task, body: &Value) -> Self {
        let mut ctx = Self::new(task.description());
        for field in task.payload_fields() {
            let value = body.get(*field).cloned().unwrap_or(Value::Null);
            ctx = ctx.with_field(*field, value);
        }
        for flag in task.requirements() {
            ctx = ctx.with_requirement(*flag, true);
        }
        ctx
    }

    /// Appends a payload field.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.payload.push((name.into(), value));
        self
    }

    /// Appends a requirement flag.
    pub fn with_requirement(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.requirements.push((name.into(), enabled));
        self
    }

    /// Task description.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Payload value by field name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Requirement flags, in insertion order.
    pub fn requirements(&self) -> &[(String, bool)] {
        &self.requirements
    }

    /// Renders the prompt text sent to the model.
    pub fn render(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Serialize for PromptContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.payload.len() + 2))?;
        map.serialize_entry("task", &self.task)?;
        for (name, value) in &self.payload {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("requirements", &Flags(&self.requirements))?;
        map.end()
    }
}

struct Flags<'a>(&'a [(String, bool)]);

impl Serialize for Flags<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, enabled) in self.0 {
            map.serialize_entry(name, enabled)?;
        }
        map.end()
    }
}

/// Outcome of one gateway call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The provider produced completion text.
    Success {
        /// Completion text
        text: String,
    },
    /// The call failed; nothing was produced.
    Failure {
        /// Diagnostic message
        error: String,
    },
}

impl Completion {
    /// Returns true if the provider produced text.
    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Success { .. })
    }

    /// Converts into a `Result` over the text and the diagnostic.
    pub fn into_result(self) -> std::result::Result<String, String> {
        match self {
            Completion::Success { text } => Ok(text),
            Completion::Failure { error } => Err(error),
        }
    }
}
