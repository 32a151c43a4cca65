//! The per-job pipeline: download, transcribe, analyze, edit.
//!
//! Each stage first moves the job to its status, so viewers see the stage
//! that is running. Any stage error fails the job with `"<stage> failed: <cause>"`.

use std::fmt::Display;
use std::path::Path;
use std::time::Instant;
use strum::{Display as StrumDisplay, IntoStaticStr};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries::{self, TransitionError};
use crate::db::short_queries;
use crate::models::analysis::{ScoredWindow, ShortMetadata, TranscriptSegment};
use crate::models::job::{JobStatus, VideoJob};
use crate::models::short::NewShort;
use crate::services::media::{ffmpeg, ytdlp};
use crate::services::segments::{self, MAX_SCORED_WINDOWS};
use crate::services::transcript;

/// One phase of the work done for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Download,
    Transcription,
    Analysis,
    Edit,
    Upload,
}

impl Stage {
    /// Job status entered when this stage starts. Uploads happen after completion.
    pub fn status(self) -> Option<JobStatus> {
        match self {
            Stage::Download => Some(JobStatus::Downloading),
            Stage::Transcription => Some(JobStatus::Transcribing),
            Stage::Analysis => Some(JobStatus::Analyzing),
            Stage::Edit => Some(JobStatus::Editing),
            Stage::Upload => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {message}")]
pub struct PipelineError {
    pub stage: Stage,
    pub message: String,
}

impl PipelineError {
    pub fn new(stage: Stage, cause: impl Display) -> Self {
        Self {
            stage,
            message: cause.to_string(),
        }
    }
}

/// A window picked for rendering, with its generated metadata.
struct PlannedShort {
    scored: ScoredWindow,
    metadata: ShortMetadata,
}

/// Run the pipeline for a job with the configured timeout, recording the outcome.
///
/// Jobs that are no longer `pending` are skipped, so a task delivered twice
/// never restarts work or moves a job backwards. An error means the job could
/// not even be read; its task must be delivered again rather than acknowledged.
pub async fn process_job(state: &AppState, job_id: Uuid) -> Result<(), sqlx::Error> {
    let job = match queries::get_job(&state.db, job_id).await? {
        Some(job) => job,
        None => {
            tracing::warn!(%job_id, "Job no longer exists, dropping task");
            return Ok(());
        }
    };
    if job.status != JobStatus::Pending {
        tracing::info!(%job_id, status = %job.status, "Job already picked up, skipping");
        return Ok(());
    }

    tracing::info!(%job_id, url = %job.youtube_url, options = ?job.options, "Processing job");
    let started = Instant::now();
    let timeout = state.config.job_timeout();

    let outcome = match tokio::time::timeout(timeout, run_stages(state, &job)).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError {
            stage: current_stage(state, job_id).await,
            message: format!("timed out after {} seconds", timeout.as_secs()),
        }),
    };

    match outcome {
        Ok(shorts) => match queries::advance_status(&state.db, job_id, JobStatus::Completed).await {
            Ok(()) => {
                metrics::counter!("shorts_jobs_completed_total").increment(1);
                metrics::histogram!("shorts_pipeline_seconds").record(started.elapsed().as_secs_f64());
                tracing::info!(
                    %job_id,
                    shorts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job completed"
                );
            }
            Err(TransitionError::NotFound(_)) => discard_files(state, job_id).await,
            Err(e) => tracing::error!(%job_id, error = %e, "Failed to mark job completed"),
        },
        Err(e) => {
            metrics::counter!("shorts_jobs_failed_total").increment(1);
            tracing::error!(%job_id, stage = %e.stage, error = %e, "Job failed");
            fail_job(state, job_id, &e).await;
        }
    }
    Ok(())
}

/// Record a pipeline failure on the job.
///
/// A job deleted while it ran (single delete or cleanup) has nothing to record
/// the failure on, but its stages may have recreated files after the delete
/// removed them. Those are removed here.
pub async fn fail_job(state: &AppState, job_id: Uuid, error: &PipelineError) {
    match queries::mark_failed(&state.db, job_id, &error.to_string()).await {
        Ok(()) => {}
        Err(TransitionError::NotFound(_)) => discard_files(state, job_id).await,
        Err(e) => tracing::error!(%job_id, error = %e, "Failed to record job failure"),
    }
}

async fn discard_files(state: &AppState, job_id: Uuid) {
    tracing::info!(%job_id, "Job was deleted while running, removing its files");
    if let Err(e) = state.dirs.remove_job_files(job_id).await {
        tracing::warn!(%job_id, error = %e, "Failed to remove files of deleted job");
    }
}

/// Stage whose status the job is in, for labelling a timeout.
async fn current_stage(state: &AppState, job_id: Uuid) -> Stage {
    let status = queries::get_job(&state.db, job_id)
        .await
        .ok()
        .flatten()
        .map(|job| job.status);
    match status {
        Some(JobStatus::Transcribing) => Stage::Transcription,
        Some(JobStatus::Analyzing) => Stage::Analysis,
        Some(JobStatus::Editing) => Stage::Edit,
        _ => Stage::Download,
    }
}

async fn run_stages(state: &AppState, job: &VideoJob) -> Result<usize, PipelineError> {
    let (title, source) = timed(Stage::Download, download(state, job)).await?;
    let segments = timed(Stage::Transcription, transcribe(state, job)).await?;
    let planned = timed(Stage::Analysis, analyze(state, job, &title, &segments)).await?;
    timed(Stage::Edit, edit(state, job, &source, planned)).await
}

async fn timed<T>(
    stage: Stage,
    work: impl std::future::Future<Output = Result<T, PipelineError>>,
) -> Result<T, PipelineError> {
    let started = Instant::now();
    let result = work.await;
    let name: &'static str = stage.into();
    metrics::histogram!("shorts_stage_seconds", "stage" => name).record(started.elapsed().as_secs_f64());
    result
}

async fn enter(state: &AppState, job_id: Uuid, stage: Stage) -> Result<(), PipelineError> {
    if let Some(status) = stage.status() {
        queries::advance_status(&state.db, job_id, status)
            .await
            .map_err(|e| PipelineError::new(stage, e))?;
        tracing::info!(%job_id, status = %status, "Stage started");
    }
    Ok(())
}

async fn download(state: &AppState, job: &VideoJob) -> Result<(String, std::path::PathBuf), PipelineError> {
    let stage = Stage::Download;
    enter(state, job.id, stage).await?;
    let fail = |e| PipelineError::new(stage, e);

    let info = ytdlp::fetch_info(&job.youtube_url).await.map_err(fail)?;
    let title = info
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "YouTube video".to_string());
    queries::set_title(&state.db, job.id, &title)
        .await
        .map_err(|e| PipelineError::new(stage, e))?;

    let source = ytdlp::download(&job.youtube_url, job.options.video_quality, &state.dirs.upload_dir(job.id))
        .await
        .map_err(fail)?;
    queries::set_video_artifact(&state.db, job.id, &source.to_string_lossy(), info.duration)
        .await
        .map_err(|e| PipelineError::new(stage, e))?;

    tracing::info!(job_id = %job.id, title = %title, duration = ?info.duration, "Video downloaded");
    Ok((title, source))
}

async fn transcribe(state: &AppState, job: &VideoJob) -> Result<Vec<TranscriptSegment>, PipelineError> {
    let stage = Stage::Transcription;
    enter(state, job.id, stage).await?;
    let fail = |e: std::io::Error| PipelineError::new(stage, e);

    let temp_dir = state.dirs.temp_dir(job.id);
    let vtt_path = ytdlp::fetch_subtitles(
        &job.youtube_url,
        job.options.content_language.subtitle_langs(),
        &temp_dir,
    )
    .await
    .map_err(|e| PipelineError::new(stage, e))?;

    let vtt = tokio::fs::read_to_string(&vtt_path).await.map_err(fail)?;
    let segments = transcript::parse_vtt(&vtt);
    if segments.is_empty() {
        return Err(PipelineError::new(stage, "subtitles contain no speech"));
    }

    let transcript_path = temp_dir.join("transcript.json");
    let json = serde_json::to_vec_pretty(&segments).map_err(|e| PipelineError::new(stage, e))?;
    tokio::fs::write(&transcript_path, json).await.map_err(fail)?;
    queries::set_transcript_path(&state.db, job.id, &transcript_path.to_string_lossy())
        .await
        .map_err(|e| PipelineError::new(stage, e))?;

    tracing::info!(job_id = %job.id, segments = segments.len(), "Transcript ready");
    Ok(segments)
}

async fn analyze(
    state: &AppState,
    job: &VideoJob,
    title: &str,
    segments: &[TranscriptSegment],
) -> Result<Vec<PlannedShort>, PipelineError> {
    let stage = Stage::Analysis;
    enter(state, job.id, stage).await?;

    let bounds = job.options.short_duration.bounds();
    let windows = segments::build_windows(segments, bounds);
    if windows.is_empty() {
        return Err(PipelineError::new(
            stage,
            format!(
                "transcript is too short for a {} second short",
                job.options.short_duration
            ),
        ));
    }
    let candidates = windows.len();
    let windows = segments::pre_rank(windows, MAX_SCORED_WINDOWS);

    let mut scored = Vec::with_capacity(windows.len());
    for window in windows {
        let analysis = state.gemini.analyze_segment(&window.text).await;
        let score = analysis.overall_score();
        scored.push(ScoredWindow { window, analysis, score });
    }

    let selected = segments::select_top(scored, job.options.max_shorts as usize);
    let mut planned = Vec::with_capacity(selected.len());
    for scored in selected {
        let metadata = state
            .gemini
            .generate_metadata(&scored.window.text, title, job.options.content_language)
            .await;
        planned.push(PlannedShort { scored, metadata });
    }

    tracing::info!(
        job_id = %job.id,
        candidates,
        selected = planned.len(),
        ai = state.gemini.is_available(),
        "Analysis complete"
    );
    Ok(planned)
}

async fn edit(
    state: &AppState,
    job: &VideoJob,
    source: &Path,
    planned: Vec<PlannedShort>,
) -> Result<usize, PipelineError> {
    let stage = Stage::Edit;
    enter(state, job.id, stage).await?;

    let output_dir = state.dirs.output_dir(job.id);
    tokio::fs::create_dir_all(&output_dir)
        .await
        .map_err(|e| PipelineError::new(stage, e))?;

    let count = planned.len();
    for (index, PlannedShort { scored, metadata }) in planned.into_iter().enumerate() {
        let position = index as i32 + 1;
        let window = &scored.window;
        let clip = output_dir.join(format!("short_{position}.mp4"));
        ffmpeg::cut_short(
            source,
            &clip,
            window.start,
            window.end,
            job.options.aspect_ratio,
            job.options.video_quality,
        )
        .await
        .map_err(|e| PipelineError::new(stage, format!("short {position}: {e}")))?;

        let thumb = output_dir.join(format!("short_{position}.jpg"));
        let thumbnail_path = match ffmpeg::thumbnail(&clip, &thumb, (window.duration() / 2.0).min(1.0)).await {
            Ok(()) => Some(thumb.to_string_lossy().into_owned()),
            Err(e) => {
                tracing::warn!(job_id = %job.id, position, error = %e, "Thumbnail failed, continuing");
                None
            }
        };

        let analysis = scored.analysis;
        short_queries::insert_short(
            &state.db,
            &NewShort {
                job_id: job.id,
                position,
                start_time: window.start,
                end_time: window.end,
                title: metadata.title,
                description: metadata.description,
                tags: metadata.tags,
                score: scored.score,
                engagement_score: analysis.engagement_score,
                emotion_score: analysis.emotion_score,
                viral_potential: analysis.viral_potential,
                quotability: analysis.quotability,
                emotions: analysis.emotions,
                keywords: analysis.keywords,
                reason: analysis.reason,
                output_path: clip.to_string_lossy().into_owned(),
                thumbnail_path,
            },
        )
        .await
        .map_err(|e| PipelineError::new(stage, e))?;
        tracing::info!(job_id = %job.id, position, score = scored.score, "Short rendered");
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_names_the_stage() {
        let err = PipelineError::new(Stage::Download, "yt-dlp exited with status Some(1): private video");
        assert_eq!(
            err.to_string(),
            "download failed: yt-dlp exited with status Some(1): private video"
        );
        assert_eq!(
            PipelineError::new(Stage::Transcription, "no subtitles").to_string(),
            "transcription failed: no subtitles"
        );
    }

    #[test]
    fn test_stage_statuses_follow_pipeline_order() {
        let statuses: Vec<JobStatus> = [Stage::Download, Stage::Transcription, Stage::Analysis, Stage::Edit]
            .into_iter()
            .filter_map(Stage::status)
            .collect();
        for pair in statuses.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]));
        }
        assert!(JobStatus::Pending.can_transition_to(statuses[0]));
        assert!(statuses[3].can_transition_to(JobStatus::Completed));
        assert_eq!(Stage::Upload.status(), None);
    }
}
