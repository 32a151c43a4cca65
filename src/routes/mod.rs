pub mod health;
pub mod jobs;
pub mod metrics;
pub mod pages;
pub mod youtube;

use axum::routing::{get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use self::metrics::MetricsState;

/// Forms are small; nothing is uploaded through the server.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

pub fn router(state: AppState, metrics_state: MetricsState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/submit", post(pages::submit))
        .route("/process/{id}", get(pages::process))
        .route("/jobs", get(pages::jobs))
        .route("/results/{id}", get(pages::results))
        .route("/jobs/{id}/delete", post(pages::delete_job))
        .route("/jobs/{id}/upload", post(jobs::upload_job))
        .route("/cleanup", post(pages::cleanup))
        .route("/shorts/{id}/download", get(pages::download_short))
        .route("/shorts/{id}/upload", post(jobs::upload_short))
        .route("/youtube/auth", get(youtube::auth))
        .route("/youtube/callback", get(youtube::callback))
        .route("/youtube/disconnect", post(youtube::disconnect))
        .route("/api/jobs/{id}", get(jobs::job_status))
        .route("/health", get(health::health_check))
        .route("/static/app.css", get(pages::stylesheet))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(metrics_state),
        )
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
}
