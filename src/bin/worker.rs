use metrics_exporter_prometheus::PrometheusBuilder;
use shorts_generator::{
    app_state::AppState,
    config::AppConfig,
    db::{self, queries, short_queries},
    routes,
    services::{dispatch, queue::ClaimedTask},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting shorts worker");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    let metrics_addr: SocketAddr = config
        .worker_metrics_addr
        .parse()
        .expect("WORKER_METRICS_ADDR must be a socket address");
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .expect("Failed to install Prometheus exporter");
    routes::metrics::describe();

    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let concurrency = config.worker_concurrency.max(1);
    let state = AppState::from_config(db_pool, config).expect("Failed to initialize services");
    state
        .dirs
        .ensure()
        .await
        .expect("Failed to create data directories");

    if let Err(e) = recover(&state).await {
        tracing::error!(error = %e, "Startup recovery failed");
    }

    tracing::info!(concurrency, "Worker ready, starting task loop");

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        // Hold a permit before claiming so a task never waits in the processing list.
        let permit = tokio::select! {
            _ = &mut shutdown => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        match claim_next(&state).await {
            Ok(Some(claimed)) => spawn_task(state.clone(), claimed, permit),
            Ok(None) => {
                drop(permit);
                tracing::trace!("No tasks available, sleeping");
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = sleep(Duration::from_millis(POLL_INTERVAL_MS)) => {}
                }
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Error dequeuing task, will retry");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }

    tracing::info!("Shutdown signal received, waiting for in-flight tasks");
    let _ = semaphore.acquire_many(concurrency as u32).await;
    tracing::info!("Worker stopped");
}

/// Clean up after a worker that died mid-task.
///
/// Jobs and uploads it left in flight are failed, never restarted, so a job
/// cannot move backwards. Their tasks return to the queue, where the pipeline
/// and uploader skip them because they are no longer pending.
async fn recover(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = queries::fail_interrupted_jobs(&state.db).await?;
    for job_id in &jobs {
        tracing::warn!(%job_id, "Failed job interrupted by a previous worker");
    }
    let uploads = short_queries::fail_interrupted_uploads(&state.db).await?;
    let requeued = state.queue.recover_processing().await?;

    tracing::info!(
        interrupted_jobs = jobs.len(),
        interrupted_uploads = uploads,
        requeued,
        "Startup recovery complete"
    );
    Ok(())
}

async fn claim_next(state: &AppState) -> Result<Option<ClaimedTask>, Box<dyn std::error::Error>> {
    let claimed = state.queue.dequeue().await?;
    if let Ok(depth) = state.queue.queue_depth().await {
        metrics::gauge!("shorts_queue_depth").set(depth as f64);
    }
    Ok(claimed)
}

fn spawn_task(state: AppState, claimed: ClaimedTask, permit: OwnedSemaphorePermit) {
    tokio::spawn(async move {
        let _permit = permit;
        dispatch::run(&state, &claimed).await;
    });
}
