use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::parse_text;
use crate::models::job::{JobOptions, JobStatus, VideoJob};

const JOB_COLUMNS: &str = r#"
    id, youtube_url, video_quality, aspect_ratio, max_shorts, short_duration,
    content_language, status, title, error_message, video_path, transcript_path,
    duration_seconds, created_at, updated_at, started_at, completed_at
"#;

/// A status write that the stored lifecycle state does not permit.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("illegal job transition {from} -> {to}")]
    Illegal { from: JobStatus, to: JobStatus },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn job_from_row(row: &PgRow) -> Result<VideoJob, sqlx::Error> {
    let max_shorts: i32 = row.try_get("max_shorts")?;
    let options = JobOptions {
        video_quality: parse_text("video_quality", row.try_get("video_quality")?)?,
        aspect_ratio: parse_text("aspect_ratio", row.try_get("aspect_ratio")?)?,
        max_shorts: max_shorts.max(0) as u32,
        short_duration: parse_text("short_duration", row.try_get("short_duration")?)?,
        content_language: parse_text("content_language", row.try_get("content_language")?)?,
    };

    Ok(VideoJob {
        id: row.try_get("id")?,
        youtube_url: row.try_get("youtube_url")?,
        options,
        status: parse_text("status", row.try_get("status")?)?,
        title: row.try_get("title")?,
        error_message: row.try_get("error_message")?,
        video_path: row.try_get("video_path")?,
        transcript_path: row.try_get("transcript_path")?,
        duration_seconds: row.try_get("duration_seconds")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

/// Insert a new job in `pending` state.
pub async fn create_job(
    pool: &PgPool,
    youtube_url: &str,
    options: &JobOptions,
) -> Result<VideoJob, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO video_jobs (id, youtube_url, video_quality, aspect_ratio, max_shorts,
                                short_duration, content_language, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(youtube_url)
    .bind(options.video_quality.as_ref())
    .bind(options.aspect_ratio.as_ref())
    .bind(options.max_shorts as i32)
    .bind(options.short_duration.as_ref())
    .bind(options.content_language.as_ref())
    .fetch_one(pool)
    .await?;

    job_from_row(&row)
}

/// Get a job by ID
pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<VideoJob>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM video_jobs WHERE id = $1"))
        .bind(job_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// All jobs, newest first.
pub async fn list_jobs(pool: &PgPool) -> Result<Vec<VideoJob>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {JOB_COLUMNS} FROM video_jobs ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(job_from_row).collect()
}

pub async fn recent_jobs(pool: &PgPool, limit: i64) -> Result<Vec<VideoJob>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {JOB_COLUMNS} FROM video_jobs ORDER BY created_at DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(job_from_row).collect()
}

/// Move a job to `next`.
///
/// The UPDATE only matches when the stored status is a legal predecessor of
/// `next`, so a stale or concurrent writer can never move a job backwards or
/// out of a terminal state.
pub async fn advance_status(
    pool: &PgPool,
    job_id: Uuid,
    next: JobStatus,
) -> Result<(), TransitionError> {
    transition(pool, job_id, next, None).await
}

/// Mark a job failed with a message shown to the viewer.
pub async fn mark_failed(pool: &PgPool, job_id: Uuid, message: &str) -> Result<(), TransitionError> {
    transition(pool, job_id, JobStatus::Failed, Some(message)).await
}

async fn transition(
    pool: &PgPool,
    job_id: Uuid,
    next: JobStatus,
    error: Option<&str>,
) -> Result<(), TransitionError> {
    let allowed: Vec<String> = JobStatus::allowed_predecessors(next)
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let result = sqlx::query(
        r#"
        UPDATE video_jobs
        SET status = $1,
            error_message = COALESCE($2, error_message),
            updated_at = NOW(),
            started_at = CASE WHEN started_at IS NULL AND $1 <> 'pending' THEN NOW() ELSE started_at END,
            completed_at = CASE WHEN $1 IN ('completed', 'failed') THEN NOW() ELSE completed_at END
        WHERE id = $3 AND status = ANY($4)
        "#,
    )
    .bind(next.as_ref())
    .bind(error)
    .bind(job_id)
    .bind(&allowed)
    .execute(pool)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    match get_job(pool, job_id).await? {
        Some(job) => Err(TransitionError::Illegal {
            from: job.status,
            to: next,
        }),
        None => Err(TransitionError::NotFound(job_id)),
    }
}

/// A job deleted mid-pipeline surfaces as `RowNotFound` from the artifact writers.
fn require_job(result: PgQueryResult) -> Result<(), sqlx::Error> {
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn set_title(pool: &PgPool, job_id: Uuid, title: &str) -> Result<(), sqlx::Error> {
    let result = sqlx::query("UPDATE video_jobs SET title = $1, updated_at = NOW() WHERE id = $2")
        .bind(title)
        .bind(job_id)
        .execute(pool)
        .await?;
    require_job(result)
}

pub async fn set_video_artifact(
    pool: &PgPool,
    job_id: Uuid,
    video_path: &str,
    duration_seconds: Option<f64>,
) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE video_jobs
        SET video_path = $1, duration_seconds = COALESCE($2, duration_seconds), updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(video_path)
    .bind(duration_seconds)
    .bind(job_id)
    .execute(pool)
    .await?;
    require_job(result)
}

pub async fn set_transcript_path(
    pool: &PgPool,
    job_id: Uuid,
    transcript_path: &str,
) -> Result<(), sqlx::Error> {
    let result = sqlx::query("UPDATE video_jobs SET transcript_path = $1, updated_at = NOW() WHERE id = $2")
        .bind(transcript_path)
        .bind(job_id)
        .execute(pool)
        .await?;
    require_job(result)
}

/// Fail jobs that a crashed worker left mid-pipeline. Returns their IDs.
pub async fn fail_interrupted_jobs(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        UPDATE video_jobs
        SET status = 'failed',
            error_message = 'processing interrupted: the worker stopped before this job finished',
            updated_at = NOW(),
            completed_at = NOW()
        WHERE status IN ('downloading', 'transcribing', 'analyzing', 'editing')
        RETURNING id
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(|r| r.try_get("id")).collect()
}

/// Delete one job; its shorts go with it through the cascade.
pub async fn delete_job(pool: &PgPool, job_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM video_jobs WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove every job and short in one transaction. Returns the number of jobs removed.
pub async fn delete_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM video_shorts").execute(&mut *tx).await?;
    let jobs = sqlx::query("DELETE FROM video_jobs").execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(jobs.rows_affected())
}

pub async fn count_jobs(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM video_jobs")
        .fetch_one(pool)
        .await?;
    row.try_get("count")
}
