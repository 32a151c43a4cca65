use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{
    AspectRatio, ContentLanguage, JobOptions, JobStatus, ShortDuration, VideoJob, VideoQuality,
};

/// Fields posted by the submission form on the home page.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitVideoForm {
    #[serde(default)]
    #[garde(length(min = 1, max = 2048))]
    pub youtube_url: String,

    #[serde(default)]
    #[garde(skip)]
    pub video_quality: VideoQuality,

    #[serde(default)]
    #[garde(skip)]
    pub aspect_ratio: AspectRatio,

    #[serde(default = "default_max_shorts")]
    #[garde(range(min = 1, max = 20))]
    pub max_shorts: u32,

    #[serde(default)]
    #[garde(skip)]
    pub short_duration: ShortDuration,

    #[serde(default)]
    #[garde(skip)]
    pub content_language: ContentLanguage,
}

fn default_max_shorts() -> u32 {
    5
}

impl SubmitVideoForm {
    /// The URL with surrounding whitespace removed.
    pub fn normalized(mut self) -> Self {
        self.youtube_url = self.youtube_url.trim().to_string();
        self
    }

    pub fn options(&self) -> JobOptions {
        JobOptions {
            video_quality: self.video_quality,
            aspect_ratio: self.aspect_ratio,
            max_shorts: self.max_shorts,
            short_duration: self.short_duration,
            content_language: self.content_language,
        }
    }
}

/// Confirmation posted by the cleanup form.
#[derive(Debug, Deserialize)]
pub struct CleanupForm {
    #[serde(default)]
    pub confirm: String,
}

impl CleanupForm {
    pub const CONFIRMATION: &'static str = "DELETE";

    pub fn is_confirmed(&self) -> bool {
        self.confirm.trim() == Self::CONFIRMATION
    }
}

/// Response for querying job status.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub is_error: bool,
    pub error: Option<String>,
    pub title: Option<String>,
    pub options: JobOptions,
    pub shorts_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatusResponse {
    pub fn from_job(job: &VideoJob, shorts_count: i64) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress: job.status.progress(),
            is_error: job.status.is_error(),
            error: job.error_message.clone(),
            title: job.title.clone(),
            options: job.options,
            shorts_count,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(body: &'static str) -> SubmitVideoForm {
        use axum::extract::FromRequest;

        let request = axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(axum::body::Body::from(body))
            .unwrap();
        let axum::Form(form) = axum::Form::<SubmitVideoForm>::from_request(request, &())
            .await
            .unwrap();
        form
    }

    #[tokio::test]
    async fn test_defaults_apply_to_missing_fields() {
        let form = parse("youtube_url=https%3A%2F%2Fyoutu.be%2Fabc123").await;
        assert_eq!(form.options(), JobOptions::default());
        assert!(form.validate().is_ok());
    }

    #[tokio::test]
    async fn test_submitted_options_are_kept_verbatim() {
        let form = parse(
            "youtube_url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc123\
             &video_quality=720p&aspect_ratio=9%3A16&max_shorts=5\
             &short_duration=15-30&content_language=english",
        )
        .await;
        let options = form.options();
        assert_eq!(form.youtube_url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(options.aspect_ratio.as_ref(), "9:16");
        assert_eq!(options.max_shorts, 5);
        assert_eq!(options.video_quality.as_ref(), "720p");
        assert_eq!(options.short_duration.as_ref(), "15-30");
        assert_eq!(options.content_language.as_ref(), "english");
    }

    #[tokio::test]
    async fn test_blank_url_fails_validation() {
        let form = parse("youtube_url=++").await.normalized();
        assert!(form.youtube_url.is_empty());
        assert!(form.validate().is_err());
    }

    #[tokio::test]
    async fn test_max_shorts_range() {
        let form = parse("youtube_url=x&max_shorts=0").await;
        assert!(form.validate().is_err());
        let form = parse("youtube_url=x&max_shorts=21").await;
        assert!(form.validate().is_err());
        let form = parse("youtube_url=x&max_shorts=20").await;
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_cleanup_requires_exact_confirmation() {
        assert!(CleanupForm { confirm: "DELETE".into() }.is_confirmed());
        assert!(CleanupForm { confirm: " DELETE ".into() }.is_confirmed());
        assert!(!CleanupForm { confirm: "delete".into() }.is_confirmed());
        assert!(!CleanupForm { confirm: String::new() }.is_confirmed());
    }

    #[test]
    fn test_status_response_flags_failures() {
        let now = Utc::now();
        let job = VideoJob {
            id: Uuid::new_v4(),
            youtube_url: "https://youtu.be/abc123".into(),
            options: JobOptions::default(),
            status: JobStatus::Failed,
            title: None,
            error_message: Some("download failed: private video".into()),
            video_path: None,
            transcript_path: None,
            duration_seconds: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        };
        let response = JobStatusResponse::from_job(&job, 0);
        assert_eq!(response.progress, 100);
        assert!(response.is_error);
        assert_eq!(response.error.as_deref(), Some("download failed: private video"));
    }
}
