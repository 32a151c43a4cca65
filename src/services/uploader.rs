//! Worker side of YouTube uploads.

use std::path::Path;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::short_queries;
use crate::models::short::VideoShort;
use crate::services::credentials;
use crate::services::pipeline::{PipelineError, Stage};
use crate::services::youtube::UploadMetadata;

/// Upload one short with the given account's credentials.
///
/// Only a short that can be claimed (`pending` → `uploading`) is uploaded, so a
/// duplicate task for the same short is a no-op. Failures are stored on the
/// short; the job itself is already completed and is not touched. An error
/// means the short could not be claimed and the task must be delivered again.
pub async fn upload_short(state: &AppState, short_id: Uuid, account_email: &str) -> Result<(), sqlx::Error> {
    if !short_queries::claim_for_upload(&state.db, short_id).await? {
        tracing::info!(%short_id, "Short is not awaiting upload, skipping");
        return Ok(());
    }

    let outcome = match short_queries::get_short(&state.db, short_id).await {
        Ok(Some(short)) => upload(state, &short, account_email).await,
        Ok(None) => {
            tracing::warn!(%short_id, "Short deleted before upload");
            return Ok(());
        }
        Err(e) => Err(PipelineError::new(Stage::Upload, e)),
    };

    match outcome {
        Ok(video_id) => {
            metrics::counter!("shorts_uploads_total", "outcome" => "completed").increment(1);
            tracing::info!(%short_id, %video_id, account = account_email, "Short uploaded");
            if let Err(e) = short_queries::mark_uploaded(&state.db, short_id, &video_id).await {
                tracing::error!(%short_id, error = %e, "Failed to record upload");
            }
        }
        Err(e) => {
            metrics::counter!("shorts_uploads_total", "outcome" => "failed").increment(1);
            tracing::error!(%short_id, error = %e, "Upload failed");
            if let Err(db_err) = short_queries::mark_upload_failed(&state.db, short_id, &e.to_string()).await {
                tracing::error!(%short_id, error = %db_err, "Failed to record upload failure");
            }
        }
    }
    Ok(())
}

async fn upload(state: &AppState, short: &VideoShort, account_email: &str) -> Result<String, PipelineError> {
    let fail = |cause: &dyn std::fmt::Display| PipelineError::new(Stage::Upload, cause);

    let youtube = state
        .youtube
        .as_deref()
        .ok_or_else(|| fail(&"YouTube OAuth client is not configured"))?;
    let file = short
        .output_path
        .as_deref()
        .map(Path::new)
        .filter(|p| p.is_file())
        .ok_or_else(|| fail(&"rendered file is missing"))?;

    let token = credentials::fresh_access_token(&state.db, &state.cipher, youtube, account_email)
        .await
        .map_err(|e| fail(&e))?;

    let metadata = UploadMetadata {
        title: short.title.clone(),
        description: short.description.clone(),
        tags: short.tags.clone(),
    };
    youtube
        .upload_video(&token, file, &metadata)
        .await
        .map_err(|e| fail(&e))
}
