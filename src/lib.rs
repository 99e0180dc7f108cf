use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod compliance;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod stdio;

use compliance::ComplianceProvider;

#[derive(Clone)]
pub struct AppState {
    pub api_token: Option<Arc<str>>,
    pub call_timeout: Duration,
    pub provider: Arc<dyn ComplianceProvider>,
}

impl AppState {
    pub fn new(
        api_token: Option<String>,
        call_timeout: Duration,
        provider: Arc<dyn ComplianceProvider>,
    ) -> Self {
        Self {
            api_token: api_token.map(Arc::<str>::from),
            call_timeout,
            provider,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/mcp", post(http::handlers::mcp_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .merge(protected)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
