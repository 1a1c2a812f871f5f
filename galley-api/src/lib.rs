//! # Galley API Server
//!
//! REST gateway that turns restaurant operations data into AI-generated
//! advice, with a fingerprint cache in front of the model provider.
//!
//! ## Endpoints
//!
//! - `POST /api/menu/recommendations` - Menu recommendations
//! - `POST /api/menu/optimize-item` - Optimize a single menu item
//! - `POST /api/menu/describe-item` - Write menu copy for an item
//! - `POST /api/inventory/predict` - Predict inventory needs
//! - `POST /api/inventory/optimize-reorder-points` - Tune reorder points
//! - `POST /api/inventory/analyze-waste` - Analyze waste
//! - `POST /api/labor/optimize-schedule` - Optimize staff schedule
//! - `POST /api/labor/predict-staffing` - Predict staffing needs
//! - `POST /api/labor/analyze-costs` - Analyze labor costs
//! - `POST /api/compliance/analyze-inspection` - Analyze an inspection
//! - `POST /api/compliance/plan` - Build a compliance plan
//! - `POST /api/compliance/assess-risk` - Assess compliance risk
//! - `GET /health` - Liveness and cache statistics
//!
//! ## Example
//!
//! ```rust,ignore
//! use galley_api::{ApiServer, ApiConfig};
//!
//! let config = ApiConfig::from_env();
//! let server = ApiServer::new(config)?;
//! server.run(([0, 0, 0, 0], 3000)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod dto;
mod error;
mod extract;
mod handlers;
pub mod rate_limit;
mod routes;
mod state;

pub use error::ApiError;
pub use extract::Validated;
pub use rate_limit::{FixedWindowLimiter, RateLimitConfig};
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use galley_core::error::Result;

/// API server for Galley.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new API server with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self::with_state(Arc::new(AppState::new(config)?)))
    }

    /// Creates a server around prepared state.
    pub fn with_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Returns the shared state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address until Ctrl-C.
    ///
    /// Starts the cache sweeper and the rate limit pruner alongside it.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        let check_period = Duration::from_secs(self.state.config.cache.check_period_seconds.max(1));
        let sweeper = self.state.cache.spawn_sweeper(check_period);
        let pruner = self.spawn_limiter_pruner();

        info!(
            %addr,
            model = %self.state.config.gateway.model,
            coalesce = self.state.config.coalesce_requests,
            trust_proxy = self.state.config.rate_limit.trust_proxy,
            "Galley API server listening"
        );

        let app = self.router();
        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        sweeper.abort();
        pruner.abort();
        info!("Galley API server stopped");
        served
    }

    fn spawn_limiter_pruner(&self) -> tokio::task::JoinHandle<()> {
        let state = Arc::downgrade(&self.state);
        let period = Duration::from_secs(self.state.config.rate_limit.window_seconds.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(state) = state.upgrade() else { break };
                let pruned = state.limiter.prune();
                if pruned > 0 {
                    debug!(pruned, "Pruned idle rate limit windows");
                }
            }
        })
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Could not listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Starts the API server with configuration from the environment.
pub async fn start_server(port: u16) -> std::io::Result<()> {
    let config = ApiConfig::from_env();
    let server = ApiServer::new(config).map_err(|e| std::io::Error::other(e.to_string()))?;
    server.run(([0, 0, 0, 0], port)).await
}
