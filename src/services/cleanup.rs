use crate::app_state::AppState;
use crate::db::queries;
use crate::services::queue::QueueError;
use crate::services::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("queue purge failed: {0}")]
    Queue(#[from] QueueError),

    #[error("database cleanup failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Summary of a completed cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub jobs_deleted: u64,
}

/// Delete every task, job, short and working file.
///
/// Queued tasks go first so no worker picks up a job that is about to vanish.
/// Steps that already ran are not rolled back when a later one fails.
pub async fn clean_all(state: &AppState) -> Result<CleanupReport, CleanupError> {
    state.queue.purge().await?;
    let jobs_deleted = queries::delete_all(&state.db).await?;
    state.dirs.wipe().await?;

    tracing::warn!(jobs_deleted, data_dir = %state.dirs.root().display(), "All jobs and files deleted");
    Ok(CleanupReport { jobs_deleted })
}
