//! RAG Chatbot Gateway
//!
//! The HTTP face of the chatbot. Handles:
//! - The query endpoint (`POST /rag-chatbot/v1/query`)
//! - The embeddable chat widget
//! - Health and Prometheus metrics endpoints
//! - Observability (logging, request IDs, tracing spans)

pub mod handlers;
pub mod telemetry;
pub mod widget;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use ragchat_common::{config::AppConfig, RagPipeline};
use std::sync::Arc;
use tower::{limit::ConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Path prefix of the chatbot API
pub const API_PREFIX: &str = "/rag-chatbot/v1";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: RagPipeline,
    pub metrics: PrometheusHandle,
    /// Widget markup, rendered once at startup
    pub widget: Arc<String>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: RagPipeline, metrics: PrometheusHandle) -> Self {
        let widget = widget::render_widget(&config.server.public_endpoint);
        Self {
            config: Arc::new(config),
            pipeline,
            metrics,
            widget: Arc::new(widget),
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        .route("/query", post(handlers::query::query))
        .route("/widget", get(handlers::widget::widget));

    Router::new()
        .route("/", get(handlers::widget::page))
        .route("/health", get(handlers::health::health))
        .route("/metrics", get(handlers::health::metrics))
        .nest(API_PREFIX, api_routes)
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(request_id)
                .layer(TraceLayer::new_for_http())
                .layer(propagate_id)
                .layer(cors)
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    state.config.request_timeout(),
                ))
                .layer(ConcurrencyLimitLayer::new(
                    state.config.server.max_concurrent_requests,
                )),
        )
        .with_state(state)
}
