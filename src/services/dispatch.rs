//! Runs claimed queue tasks and settles them with the queue.

use std::time::Duration;

use crate::app_state::AppState;
use crate::services::queue::{ClaimedTask, QueuedTask};
use crate::services::{pipeline, uploader};

/// Pause before a task that could not start goes back on the queue.
pub const REDELIVERY_DELAY: Duration = Duration::from_secs(2);

/// Run one claimed task, then acknowledge it.
///
/// A task whose job or short could not be read from the database is returned
/// to the queue instead, so an outage delays work but never loses it. If Redis
/// is down too, the task stays in the processing list for startup recovery.
pub async fn run(state: &AppState, claimed: &ClaimedTask) {
    let kind = claimed.task.kind();
    tracing::info!(task = kind, "Processing task");

    let started = match &claimed.task {
        QueuedTask::ProcessJob { job_id } => pipeline::process_job(state, *job_id).await,
        QueuedTask::UploadShort { short_id, account_email } => {
            uploader::upload_short(state, *short_id, account_email).await
        }
    };

    let settled = match started {
        Ok(()) => state.queue.complete(claimed).await,
        Err(e) => {
            tracing::warn!(task = kind, error = %e, delay = ?REDELIVERY_DELAY, "Task could not start, redelivering");
            tokio::time::sleep(REDELIVERY_DELAY).await;
            state.queue.requeue(claimed).await
        }
    };
    if let Err(e) = settled {
        tracing::error!(task = kind, error = %e, "Failed to settle task with the queue");
    }
}
