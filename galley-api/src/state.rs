//! App state: config, response cache, gateway client, rate limiter.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use galley_cache::{CacheConfig, FingerprintCache, SingleFlight};
use galley_core::constants::DEFAULT_AI_ENDPOINT;
use galley_core::error::Result;
use galley_core::traits::CompletionClient;
use galley_core::types::ResultEnvelope;
use galley_gateway::{GatewayConfig, HttpGateway};

use crate::rate_limit::{FixedWindowLimiter, RateLimitConfig};

/// Server configuration.
#[derive(Clone, Debug, Default)]
pub struct ApiConfig {
    /// Model provider settings
    pub gateway: GatewayConfig,
    /// Response cache settings
    pub cache: CacheConfig,
    /// Per-client request limits
    pub rate_limit: RateLimitConfig,
    /// Share one upstream call between concurrent identical requests.
    /// Off unless enabled; each cache miss then calls upstream on its own.
    pub coalesce_requests: bool,
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "Ignoring unparseable environment value");
            default
        }),
        Err(_) => default,
    }
}

/// `true`/`1`/`yes` (any case) enable a flag; anything else leaves it off.
fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

impl ApiConfig {
    /// Reads configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let defaults_gateway = GatewayConfig::default();
        let defaults_cache = CacheConfig::default();
        let defaults_limit = RateLimitConfig::default();

        let gateway = GatewayConfig {
            endpoint: std::env::var("GALLEY_AI_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_AI_ENDPOINT.into()),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: std::env::var("GALLEY_AI_MODEL").unwrap_or(defaults_gateway.model),
            max_tokens: env_parse("GALLEY_AI_MAX_TOKENS", defaults_gateway.max_tokens),
            timeout_seconds: std::env::var("GALLEY_AI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .filter(|secs: &u64| *secs > 0),
        };

        let cache = CacheConfig {
            max_entries: env_parse("GALLEY_CACHE_MAX_ENTRIES", defaults_cache.max_entries),
            default_ttl_seconds: env_parse(
                "GALLEY_CACHE_DEFAULT_TTL_SECS",
                defaults_cache.default_ttl_seconds,
            ),
            check_period_seconds: env_parse(
                "GALLEY_CACHE_CHECK_PERIOD_SECS",
                defaults_cache.check_period_seconds,
            ),
        };

        let rate_limit = RateLimitConfig {
            max_requests: env_parse("GALLEY_RATE_LIMIT_MAX", defaults_limit.max_requests),
            window_seconds: env_parse(
                "GALLEY_RATE_LIMIT_WINDOW_SECS",
                defaults_limit.window_seconds,
            ),
            trust_proxy: env_flag("GALLEY_TRUST_PROXY"),
        };

        Self {
            gateway,
            cache,
            rate_limit,
            coalesce_requests: env_flag("GALLEY_COALESCE_REQUESTS"),
        }
    }
}

/// Shared state handed to every handler.
pub struct AppState {
    /// Configuration the server was built with
    pub config: ApiConfig,
    /// Response cache
    pub cache: Arc<FingerprintCache>,
    /// Model provider client
    pub client: Arc<dyn CompletionClient>,
    /// Upstream calls in progress, by fingerprint
    pub flights: SingleFlight<ResultEnvelope>,
    /// Per-client request counters
    pub limiter: FixedWindowLimiter,
    /// When the state was built
    pub started_at: Instant,
}

impl AppState {
    /// Builds state with an HTTP gateway to the configured provider.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let gateway = HttpGateway::with_config(config.gateway.clone())?;
        Ok(Self::with_client(config, Arc::new(gateway)))
    }

    /// Builds state around an existing completion client.
    pub fn with_client(config: ApiConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            cache: Arc::new(FingerprintCache::with_config(config.cache.clone())),
            limiter: FixedWindowLimiter::new(config.rate_limit.clone()),
            client,
            flights: SingleFlight::new(),
            started_at: Instant::now(),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_conservative() {
        let config = ApiConfig::default();
        assert!(!config.coalesce_requests);
        assert!(!config.rate_limit.trust_proxy);
    }

    #[test]
    fn test_env_flag_parsing() {
        std::env::set_var("GALLEY_TEST_FLAG_ON", "True");
        std::env::set_var("GALLEY_TEST_FLAG_OFF", "no");
        assert!(env_flag("GALLEY_TEST_FLAG_ON"));
        assert!(!env_flag("GALLEY_TEST_FLAG_OFF"));
        assert!(!env_flag("GALLEY_TEST_FLAG_UNSET"));
    }
}
