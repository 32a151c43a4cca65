use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{queries, short_queries};
use crate::error::{AppError, AppResult};
use crate::models::short::UploadStatus;
use crate::models::submission::JobStatusResponse;
use crate::services::queue::QueuedTask;
use crate::services::session::{Flash, SessionClaims};

/// GET /api/jobs/{id}: JSON status for scripted polling.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, StatusCode> {
    let job = queries::get_job(&state.db, job_id)
        .await
        .map_err(|e| {
            tracing::error!(%job_id, error = %e, "Failed to load job status");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;
    let shorts_count = short_queries::count_for_job(&state.db, job_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(JobStatusResponse::from_job(&job, shorts_count)))
}

/// The connected account, or the flash explaining why uploads are not possible.
fn upload_account(state: &AppState, cookies: &Cookies) -> Result<SessionClaims, Flash> {
    if state.youtube.is_none() {
        return Err(Flash::YoutubeNotConfigured);
    }
    state.sessions.current(cookies).ok_or(Flash::YoutubeNotConnected)
}

async fn enqueue_uploads(state: &AppState, short_ids: &[Uuid], account: &SessionClaims) -> Flash {
    for &short_id in short_ids {
        let task = QueuedTask::UploadShort {
            short_id,
            account_email: account.account_email().to_string(),
        };
        if let Err(e) = state.queue.enqueue(&task).await {
            tracing::error!(%short_id, error = %e, "Failed to queue upload");
            return Flash::QueueUnavailable;
        }
    }
    tracing::info!(count = short_ids.len(), account = account.account_email(), "Uploads queued");
    Flash::UploadQueued
}

/// POST /jobs/{id}/upload: queue every short of the job still awaiting upload.
pub async fn upload_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    cookies: Cookies,
) -> AppResult<Redirect> {
    let back = Redirect::to(&format!("/results/{job_id}"));
    let account = match upload_account(&state, &cookies) {
        Ok(account) => account,
        Err(flash) => {
            flash.set(&cookies);
            return Ok(back);
        }
    };

    let job = queries::get_job(&state.db, job_id)
        .await?
        .ok_or(AppError::NotFound("Job"))?;
    if !job.accepts_uploads() {
        Flash::JobNotCompleted.set(&cookies);
        return Ok(back);
    }
    let pending = short_queries::pending_upload_ids(&state.db, job_id).await?;

    let flash = if pending.is_empty() {
        Flash::NothingToUpload
    } else {
        enqueue_uploads(&state, &pending, &account).await
    };
    flash.set(&cookies);
    Ok(back)
}

/// POST /shorts/{id}/upload: queue one short. A failed upload is reset and retried.
pub async fn upload_short(
    State(state): State<AppState>,
    Path(short_id): Path<Uuid>,
    cookies: Cookies,
) -> AppResult<Redirect> {
    let short = short_queries::get_short(&state.db, short_id)
        .await?
        .ok_or(AppError::NotFound("Short"))?;
    let back = Redirect::to(&format!("/results/{}", short.job_id));

    let account = match upload_account(&state, &cookies) {
        Ok(account) => account,
        Err(flash) => {
            flash.set(&cookies);
            return Ok(back);
        }
    };

    let job = queries::get_job(&state.db, short.job_id)
        .await?
        .ok_or(AppError::NotFound("Job"))?;
    if !job.accepts_uploads() {
        Flash::JobNotCompleted.set(&cookies);
        return Ok(back);
    }

    let ready = match short.upload_status {
        UploadStatus::Pending => true,
        UploadStatus::Failed => short_queries::reset_failed_upload(&state.db, short_id).await?,
        UploadStatus::Uploading | UploadStatus::Completed => false,
    };

    let flash = if ready {
        enqueue_uploads(&state, &[short_id], &account).await
    } else {
        Flash::UploadUnavailable
    };
    flash.set(&cookies);
    Ok(back)
}
