//! HTTP server setup and request orchestration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener, serve with graceful shutdown
//! - Per request: resolve mapping → breaker gate → admission control →
//!   forward → record outcome → respond

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::forward::{ForwardError, HttpForwarder};
use crate::http::request::{RequestIdLayer, X_REQUEST_ID};
use crate::observability::metrics;
use crate::resilience::{BreakerDecision, CircuitBreaker, Outcome, RateLimiter};
use crate::routing::MappingResolver;
use crate::store::Backend;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<GatewayConfig>>,
    pub resolver: MappingResolver,
    pub limiter: RateLimiter<Backend>,
    pub breaker: CircuitBreaker<Backend>,
    pub forwarder: HttpForwarder,
}

/// HTTP server for the outbound gateway.
pub struct GatewayServer {
    router: Router,
    config: Arc<ArcSwap<GatewayConfig>>,
}

impl GatewayServer {
    /// Create a new server with the given configuration and state store.
    pub fn new(config: GatewayConfig, store: Backend) -> Self {
        let forwarder = HttpForwarder::new(&config.forward);
        let on_outage = config.store.on_outage;
        let config = Arc::new(ArcSwap::from_pointee(config));

        let state = AppState {
            config: config.clone(),
            resolver: MappingResolver::new(config.clone()),
            limiter: RateLimiter::new(store.clone(), on_outage),
            breaker: CircuitBreaker::new(store),
            forwarder,
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Handle for swapping in reloaded configurations.
    pub fn config_handle(&self) -> Arc<ArcSwap<GatewayConfig>> {
        self.config.clone()
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Main proxy handler.
///
/// The ordering is load-bearing: an open breaker must not consume rate
/// budget, and a rate-limited request must never reach the upstream or
/// touch breaker state.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let method = request.method().clone();
    let method_str = method.to_string();
    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying outbound request"
    );

    // 1. Resolve mapping.
    let Some(mapping) = state.resolver.resolve(&path) else {
        tracing::warn!(request_id = %request_id, path = %path, "No mapping matched");
        metrics::record_request(&method_str, 404, "none", start);
        return error_response(GatewayError::MappingNotFound(path), &request_id);
    };
    let match_key = mapping.match_key.clone();

    // 2. Breaker gate: reject without contacting upstream or the limiter.
    if state.breaker.check(&match_key, &mapping.breaker).await == BreakerDecision::Reject {
        tracing::warn!(request_id = %request_id, match_key = %match_key, "Circuit open, failing fast");
        metrics::record_breaker_rejection(&match_key);
        metrics::record_request(&method_str, 503, &match_key, start);
        return error_response(GatewayError::BreakerOpen(match_key), &request_id);
    }

    // 3. Admission control.
    if !state
        .limiter
        .check_and_increment(&match_key, mapping.rate_limit_per_second)
        .await
    {
        tracing::warn!(request_id = %request_id, match_key = %match_key, "Rate limit exceeded");
        metrics::record_rate_limited(&match_key);
        metrics::record_request(&method_str, 429, &match_key, start);
        return error_response(GatewayError::RateLimitExceeded(match_key), &request_id);
    }

    // 4. Buffer the inbound body and forward.
    let max_body = state.config.load().forward.max_body_bytes;
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, max_body).await {
        Ok(bytes) => bytes,
        Err(_) => {
            metrics::record_request(&method_str, 413, &match_key, start);
            return error_response(GatewayError::BodyTooLarge, &request_id);
        }
    };

    let target = match upstream_url(&mapping.upstream_base_url, &path_and_query) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(request_id = %request_id, match_key = %match_key, error = %e, "Bad upstream target");
            metrics::record_request(&method_str, 500, &match_key, start);
            return error_response(GatewayError::Upstream(e), &request_id);
        }
    };

    let forward_start = Instant::now();
    let result = state
        .forwarder
        .forward(method, target, &parts.headers, body_bytes)
        .await;
    let latency = forward_start.elapsed();

    // 5. Record the outcome before responding.
    let outcome = Outcome {
        success: result
            .as_ref()
            .map(|r| r.status.is_success())
            .unwrap_or(false),
        latency,
    };
    state
        .breaker
        .record_outcome(&match_key, outcome, &mapping.breaker)
        .await;

    // 6/7. Respond: upstream response verbatim, or 500 with a diagnostic.
    match result {
        Ok(upstream) => {
            metrics::record_request(&method_str, upstream.status.as_u16(), &match_key, start);
            let mut response = Response::new(Body::from(upstream.body));
            *response.status_mut() = upstream.status;
            *response.headers_mut() = upstream.headers;
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                match_key = %match_key,
                error = %e,
                "Upstream request failed"
            );
            metrics::record_request(&method_str, 500, &match_key, start);
            error_response(GatewayError::Upstream(e), &request_id)
        }
    }
}

/// Join the mapping's base URL with the full inbound path and query.
fn upstream_url(base: &str, path_and_query: &str) -> Result<Url, ForwardError> {
    let target = format!("{}{}", base.trim_end_matches('/'), path_and_query);
    Url::parse(&target).map_err(|_| ForwardError::InvalidUrl(target))
}

/// Error responses echo the caller's request id.
fn error_response(err: GatewayError, request_id: &str) -> Response {
    let mut response = err.into_response();
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}
