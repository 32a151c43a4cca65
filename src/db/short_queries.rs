use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::parse_text;
use crate::models::short::{NewShort, UploadStatus, VideoShort};

const SHORT_COLUMNS: &str = r#"
    id, job_id, position, start_time, end_time, title, description, tags, score,
    engagement_score, emotion_score, viral_potential, quotability, emotions, keywords,
    reason, output_path, thumbnail_path, upload_status, upload_error, youtube_video_id,
    created_at
"#;

fn short_from_row(row: &PgRow) -> Result<VideoShort, sqlx::Error> {
    Ok(VideoShort {
        id: row.try_get("id")?,
        job_id: row.try_get("job_id")?,
        position: row.try_get("position")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        tags: row.try_get("tags")?,
        score: row.try_get("score")?,
        engagement_score: row.try_get("engagement_score")?,
        emotion_score: row.try_get("emotion_score")?,
        viral_potential: row.try_get("viral_potential")?,
        quotability: row.try_get("quotability")?,
        emotions: row.try_get("emotions")?,
        keywords: row.try_get("keywords")?,
        reason: row.try_get("reason")?,
        output_path: row.try_get("output_path")?,
        thumbnail_path: row.try_get("thumbnail_path")?,
        upload_status: parse_text("upload_status", row.try_get("upload_status")?)?,
        upload_error: row.try_get("upload_error")?,
        youtube_video_id: row.try_get("youtube_video_id")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert a rendered short
pub async fn insert_short(pool: &PgPool, short: &NewShort) -> Result<VideoShort, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO video_shorts (
            id, job_id, position, start_time, end_time, title, description, tags, score,
            engagement_score, emotion_score, viral_potential, quotability, emotions, keywords,
            reason, output_path, thumbnail_path, upload_status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, 'pending')
        RETURNING {SHORT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(short.job_id)
    .bind(short.position)
    .bind(short.start_time)
    .bind(short.end_time)
    .bind(&short.title)
    .bind(&short.description)
    .bind(&short.tags)
    .bind(short.score)
    .bind(short.engagement_score)
    .bind(short.emotion_score)
    .bind(short.viral_potential)
    .bind(short.quotability)
    .bind(&short.emotions)
    .bind(&short.keywords)
    .bind(&short.reason)
    .bind(&short.output_path)
    .bind(&short.thumbnail_path)
    .fetch_one(pool)
    .await?;

    short_from_row(&row)
}

pub async fn get_short(pool: &PgPool, short_id: Uuid) -> Result<Option<VideoShort>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {SHORT_COLUMNS} FROM video_shorts WHERE id = $1"))
        .bind(short_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(short_from_row).transpose()
}

/// Shorts of a job in render order.
pub async fn list_for_job(pool: &PgPool, job_id: Uuid) -> Result<Vec<VideoShort>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {SHORT_COLUMNS} FROM video_shorts WHERE job_id = $1 ORDER BY position ASC"
    ))
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(short_from_row).collect()
}

pub async fn count_for_job(pool: &PgPool, job_id: Uuid) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM video_shorts WHERE job_id = $1")
        .bind(job_id)
        .fetch_one(pool)
        .await?;
    row.try_get("count")
}

/// IDs of a job's shorts still waiting for upload.
pub async fn pending_upload_ids(pool: &PgPool, job_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id FROM video_shorts WHERE job_id = $1 AND upload_status = 'pending' ORDER BY position",
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(|r| r.try_get("id")).collect()
}

/// Claim a pending short for upload. Returns false when another task got there first.
pub async fn claim_for_upload(pool: &PgPool, short_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE video_shorts
        SET upload_status = 'uploading', upload_error = NULL
        WHERE id = $1 AND upload_status = 'pending'
        "#,
    )
    .bind(short_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_uploaded(
    pool: &PgPool,
    short_id: Uuid,
    youtube_video_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE video_shorts
        SET upload_status = 'completed', youtube_video_id = $1, upload_error = NULL
        WHERE id = $2
        "#,
    )
    .bind(youtube_video_id)
    .bind(short_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_upload_failed(pool: &PgPool, short_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE video_shorts SET upload_status = 'failed', upload_error = $1 WHERE id = $2",
    )
    .bind(error)
    .bind(short_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Put a failed upload back in the queue state. Other states are left untouched.
pub async fn reset_failed_upload(pool: &PgPool, short_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE video_shorts
        SET upload_status = 'pending', upload_error = NULL
        WHERE id = $1 AND upload_status = 'failed'
        "#,
    )
    .bind(short_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Fail uploads a crashed worker left in `uploading`.
pub async fn fail_interrupted_uploads(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE video_shorts
        SET upload_status = 'failed', upload_error = 'upload interrupted: the worker stopped mid-upload'
        WHERE upload_status = $1
        "#,
    )
    .bind(UploadStatus::Uploading.as_ref())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
