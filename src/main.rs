use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use shorts_generator::app_state::AppState;
use shorts_generator::config::AppConfig;
use shorts_generator::db;
use shorts_generator::routes::{self, metrics::MetricsState};
use shorts_generator::services::keep_alive;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing shorts-generator server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    routes::metrics::describe();

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let bind_addr = config.bind_addr.clone();
    let keep_alive = config
        .keep_alive_url
        .clone()
        .filter(|url| !url.trim().is_empty())
        .map(|url| (url, Duration::from_secs(config.keep_alive_interval_secs)));

    let state = AppState::from_config(db_pool, config).expect("Failed to initialize services");

    tracing::info!(data_dir = %state.dirs.root().display(), "Preparing data directories");
    state
        .dirs
        .ensure()
        .await
        .expect("Failed to create data directories");

    if let Some((url, interval)) = keep_alive {
        tokio::spawn(keep_alive::run(url, interval));
    }

    let metrics_state = MetricsState {
        handle: Arc::new(prometheus_handle),
        queue: state.queue.clone(),
    };
    let app = routes::router(state, metrics_state);

    tracing::info!("Starting shorts-generator on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .expect("Server error");
}
