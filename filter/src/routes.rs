use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::FilterError;
use crate::metrics::Metrics;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
}

pub fn create_routes(metrics: Arc<Metrics>) -> Router {
    let state = AppState { metrics };

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render_prometheus(),
    )
}

/// Bind `addr` and serve metrics until the task is dropped.
pub async fn serve_metrics(addr: SocketAddr, metrics: Arc<Metrics>) -> Result<(), FilterError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| FilterError::MetricsServer { addr, source })?;
    info!("Serving metrics on http://{}/metrics", addr);

    axum::serve(listener, create_routes(metrics))
        .await
        .map_err(|source| FilterError::MetricsServer { addr, source })
}
