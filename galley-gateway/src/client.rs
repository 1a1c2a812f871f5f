//! Chat-completions gateway implementation.
//!
//! Builds `{model, messages, max_tokens, temperature}` from a model profile
//! and a prompt context, posts it with a bearer credential, and reads
//! `choices[0].message.content` back out.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use galley_core::constants::{DEFAULT_AI_ENDPOINT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use galley_core::error::{GalleyError, Result};
use galley_core::traits::CompletionClient;
use galley_core::types::{Completion, Domain, ModelProfile, PromptContext};

/// Gateway configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Chat-completions endpoint
    pub endpoint: String,
    /// Bearer credential for the provider
    pub api_key: String,
    /// Model name used by every domain profile
    pub model: String,
    /// Token cap used by every domain profile
    pub max_tokens: u32,
    /// Request timeout in seconds; `None` waits indefinitely
    pub timeout_seconds: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_AI_ENDPOINT.into(),
            api_key: String::new(),
            model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_seconds: None,
        }
    }
}

impl GatewayConfig {
    /// Creates config for the default endpoint with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Points the gateway at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets a request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Profile for a domain, using this config's model and token cap.
    pub fn profile(&self, domain: Domain) -> ModelProfile {
        ModelProfile::for_domain(domain)
            .with_model(self.model.clone())
            .with_max_tokens(self.max_tokens)
    }

    /// Checks that the endpoint is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| GalleyError::ConfigError(format!("Invalid AI endpoint '{}': {}", self.endpoint, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GalleyError::ConfigError(format!(
                "AI endpoint must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.max_tokens == 0 {
            return Err(GalleyError::ConfigError("max_tokens must be positive".into()));
        }
        Ok(())
    }
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
///
/// Stateless between calls; safe to share behind an `Arc`.
pub struct HttpGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl HttpGateway {
    /// Creates a gateway with the given config.
    pub fn with_config(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        if config.api_key.is_empty() {
            warn!("No AI API key configured; upstream calls will be rejected");
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder
            .build()
            .map_err(|e| GalleyError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Sends one request and returns the completion text.
    #[instrument(skip(self, prompt), fields(model = %profile.model, temperature = profile.temperature))]
    pub async fn send(&self, profile: &ModelProfile, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &profile.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: profile.max_tokens,
            temperature: profile.temperature,
        };

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GalleyError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_u16().to_string());
            return Err(GalleyError::UpstreamStatus {
                status: status.as_u16(),
                reason,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GalleyError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GalleyError::MalformedResponse("response has no completion content".into()))?;

        debug!(chars = text.len(), "Received completion");
        Ok(text)
    }
}

#[async_trait]
impl CompletionClient for HttpGateway {
    async fn complete(&self, profile: &ModelProfile, context: &PromptContext) -> Completion {
        let prompt = match context.render() {
            Ok(p) => p,
            Err(e) => return Completion::Failure { error: e.to_string() },
        };

        match self.send(profile, &prompt).await {
            Ok(text) => Completion::Success { text },
            Err(e) => {
                warn!(task = context.task(), error = %e, "Completion failed");
                Completion::Failure { error: e.to_string() }
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}
