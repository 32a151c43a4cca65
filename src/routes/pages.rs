use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use garde::Validate;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{queries, short_queries};
use crate::error::{AppError, AppResult};
use crate::models::submission::{CleanupForm, SubmitVideoForm};
use crate::services::cleanup;
use crate::services::queue::QueuedTask;
use crate::services::session::Flash;
use crate::views::pages::{self, UploadAccess};

const RECENT_JOBS: i64 = 6;

/// GET /: submission form and the most recent jobs.
pub async fn index(State(state): State<AppState>, cookies: Cookies) -> AppResult<Html<String>> {
    let recent = queries::recent_jobs(&state.db, RECENT_JOBS).await?;
    let session = state.sessions.current(&cookies);
    Ok(Html(pages::home(&recent, Flash::take(&cookies), session.as_ref())))
}

/// POST /submit: create a pending job, queue it, and send the browser to its status page.
pub async fn submit(
    State(state): State<AppState>,
    cookies: Cookies,
    form: Result<Form<SubmitVideoForm>, FormRejection>,
) -> AppResult<Redirect> {
    let form = match form {
        Ok(Form(form)) => form.normalized(),
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected submission with unsupported options");
            Flash::InvalidOptions.set(&cookies);
            return Ok(Redirect::to("/"));
        }
    };

    if form.youtube_url.is_empty() {
        Flash::MissingUrl.set(&cookies);
        return Ok(Redirect::to("/"));
    }
    if let Err(report) = form.validate() {
        tracing::warn!(errors = %report, "Submission failed validation");
        Flash::InvalidOptions.set(&cookies);
        return Ok(Redirect::to("/"));
    }

    let job = queries::create_job(&state.db, &form.youtube_url, &form.options()).await?;

    if let Err(e) = state.queue.enqueue(&QueuedTask::ProcessJob { job_id: job.id }).await {
        tracing::error!(job_id = %job.id, error = %e, "Failed to queue job");
        queries::mark_failed(&state.db, job.id, "could not be queued: the job queue is unavailable").await?;
        Flash::QueueUnavailable.set(&cookies);
        return Ok(Redirect::to("/"));
    }

    metrics::counter!("shorts_jobs_submitted_total").increment(1);
    tracing::info!(job_id = %job.id, url = %job.youtube_url, "Job submitted");

    Ok(Redirect::to(&format!("/process/{}", job.id)))
}

/// GET /process/{id}: status page, reloading itself until the job ends.
pub async fn process(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    cookies: Cookies,
) -> AppResult<Html<String>> {
    let job = queries::get_job(&state.db, job_id)
        .await?
        .ok_or(AppError::NotFound("Job"))?;
    Ok(Html(pages::status(&job, Flash::take(&cookies))))
}

/// GET /jobs
pub async fn jobs(State(state): State<AppState>, cookies: Cookies) -> AppResult<Html<String>> {
    let all = queries::list_jobs(&state.db).await?;
    let session = state.sessions.current(&cookies);
    Ok(Html(pages::jobs(&all, Flash::take(&cookies), session.as_ref())))
}

/// GET /results/{id}
pub async fn results(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    cookies: Cookies,
) -> AppResult<Html<String>> {
    let job = queries::get_job(&state.db, job_id)
        .await?
        .ok_or(AppError::NotFound("Job"))?;
    let shorts = short_queries::list_for_job(&state.db, job_id).await?;
    let session = state.sessions.current(&cookies);
    let access = UploadAccess::new(state.youtube.is_some(), session.as_ref());
    Ok(Html(pages::results(&job, &shorts, access, Flash::take(&cookies))))
}

/// POST /jobs/{id}/delete: remove one job, its shorts and its files.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    cookies: Cookies,
) -> AppResult<Redirect> {
    if !queries::delete_job(&state.db, job_id).await? {
        return Err(AppError::NotFound("Job"));
    }
    if let Err(e) = state.dirs.remove_job_files(job_id).await {
        tracing::warn!(%job_id, error = %e, "Job deleted but some files remain");
    }
    tracing::info!(%job_id, "Job deleted");
    Flash::JobDeleted.set(&cookies);
    Ok(Redirect::to("/jobs"))
}

/// POST /cleanup: delete everything, only with `confirm=DELETE`.
pub async fn cleanup(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<CleanupForm>,
) -> Redirect {
    if !form.is_confirmed() {
        Flash::CleanupNotConfirmed.set(&cookies);
        return Redirect::to("/jobs");
    }

    match cleanup::clean_all(&state).await {
        Ok(_) => Flash::CleanupDone.set(&cookies),
        Err(e) => {
            tracing::error!(error = %e, "Cleanup failed");
            Flash::CleanupFailed.set(&cookies);
        }
    }
    Redirect::to("/")
}

/// GET /shorts/{id}/download: the rendered clip as an attachment.
pub async fn download_short(
    State(state): State<AppState>,
    Path(short_id): Path<Uuid>,
    cookies: Cookies,
) -> AppResult<Response> {
    let short = short_queries::get_short(&state.db, short_id)
        .await?
        .ok_or(AppError::NotFound("Short"))?;

    let file = short
        .output_path
        .as_deref()
        .map(std::path::Path::new)
        .filter(|path| state.dirs.is_output_file(path));
    let bytes = match file {
        Some(path) => tokio::fs::read(path).await.ok(),
        None => None,
    };
    let Some(bytes) = bytes else {
        tracing::warn!(%short_id, path = ?short.output_path, "Short file missing");
        Flash::ShortFileMissing.set(&cookies);
        return Ok(Redirect::to(&format!("/results/{}", short.job_id)).into_response());
    };

    let disposition = format!("attachment; filename=\"short_{}.mp4\"", short.position);
    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// GET /static/app.css
pub async fn stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        include_str!("../../static/app.css"),
    )
}
