use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::time::Instant;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
    pub features: Features,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
    pub redis: ComponentHealth,
    pub storage: ComponentHealth,
}

/// Optional integrations; their absence degrades features, not health.
#[derive(Serialize)]
pub struct Features {
    pub ai_analysis: bool,
    pub youtube_upload: bool,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    pub latency_ms: Option<u64>,
}

impl ComponentHealth {
    fn from_check<E>(started: Instant, check: Result<(), E>) -> Self {
        match check {
            Ok(()) => Self {
                status: "ok",
                latency_ms: Some(started.elapsed().as_millis() as u64),
            },
            Err(_) => Self {
                status: "error",
                latency_ms: None,
            },
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// GET /health: PostgreSQL, Redis and the data directory.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let started = Instant::now();
    let database = ComponentHealth::from_check(
        started,
        sqlx::query("SELECT 1").execute(&state.db).await.map(|_| ()),
    );

    let started = Instant::now();
    let redis = ComponentHealth::from_check(started, state.queue.health_check().await);

    let started = Instant::now();
    let storage = ComponentHealth::from_check(started, state.dirs.ensure().await);

    let healthy = database.is_ok() && redis.is_ok() && storage.is_ok();
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks { database, redis, storage },
        features: Features {
            ai_analysis: state.gemini.is_available(),
            youtube_upload: state.youtube.is_some(),
        },
    };

    (status_code, Json(response))
}
