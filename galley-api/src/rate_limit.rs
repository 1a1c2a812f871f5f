//! Fixed-window rate limiting per client address.
//!
//! Each client gets a counter that resets when its window elapses. The
//! window starts at the client's first request, not on a global boundary.
//! Requests over the limit are rejected with 429 and a `Retry-After` header
//! before they reach validation, the cache or the gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use galley_cache::{Clock, SystemClock};
use galley_core::constants::{
    DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_WINDOW_SECS, RATE_LIMIT_MESSAGE,
};
use galley_core::types::ResultEnvelope;

use crate::state::AppState;

/// Rate limit configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_seconds: u64,
    /// Key on `X-Forwarded-For` / `X-Real-IP` instead of the peer address.
    /// Only safe behind a reverse proxy that overwrites those headers.
    #[serde(default)]
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            trust_proxy: false,
        }
    }
}

impl RateLimitConfig {
    fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Admitted; `remaining` more requests fit in this window
    Allowed {
        /// Requests left in the window
        remaining: u32,
    },
    /// Rejected until the window resets
    Limited {
        /// Whole seconds until the window resets, at least 1
        retry_after: u64,
    },
}

/// Per-client fixed-window counters.
pub struct FixedWindowLimiter {
    windows: DashMap<String, Window>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    /// Creates a limiter on the system clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a limiter reading time from `clock`.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            config,
            clock,
        }
    }

    /// Returns the limiter configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Counts a request from `client` and decides whether to admit it.
    ///
    /// Rejected requests still count toward the window.
    pub fn check(&self, client: &str) -> Decision {
        let now = self.clock.now();
        let window = self.config.window();

        let mut entry = self.windows.entry(client.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now.duration_since(entry.started_at) >= window {
            *entry = Window {
                started_at: now,
                count: 0,
            };
        }
        entry.count = entry.count.saturating_add(1);

        if entry.count <= self.config.max_requests {
            Decision::Allowed {
                remaining: self.config.max_requests - entry.count,
            }
        } else {
            let elapsed = now.duration_since(entry.started_at);
            let left = window.saturating_sub(elapsed);
            let retry_after = left.as_secs() + u64::from(left.subsec_nanos() > 0);
            Decision::Limited {
                retry_after: retry_after.max(1),
            }
        }
    }

    /// Drops windows that have fully elapsed. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let now = self.clock.now();
        let window = self.config.window();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.duration_since(w.started_at) < window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients with a live window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Error type for rate limit middleware.
#[derive(Debug)]
pub struct RateLimitError {
    /// Seconds until the window resets
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ResultEnvelope::error(RATE_LIMIT_MESSAGE)),
        )
            .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after));
        response
    }
}

/// Client identity used as the rate limit key.
///
/// The peer address of the connection. With `trust_proxy`, the first hop of
/// `X-Forwarded-For` or else `X-Real-IP` wins over the peer address.
pub fn client_key(request: &Request, trust_proxy: bool) -> String {
    let header_ip = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let forwarded = if trust_proxy {
        header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip"))
    } else {
        None
    };

    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware for the AI routes.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let client = client_key(&request, state.limiter.config().trust_proxy);

    match state.limiter.check(&client) {
        Decision::Allowed { remaining } => {
            debug!(client = %client, remaining, "Request admitted");
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                header::HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(state.limiter.config().max_requests),
            );
            headers.insert(
                header::HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(remaining),
            );
            Ok(response)
        }
        Decision::Limited { retry_after } => {
            warn!(client = %client, retry_after, "Rate limit exceeded");
            Err(RateLimitError { retry_after })
        }
    }
}
