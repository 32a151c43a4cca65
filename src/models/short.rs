use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// YouTube upload state of a generated short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Failed,
}

/// A generated clip belonging to exactly one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoShort {
    pub id: Uuid,
    pub job_id: Uuid,
    pub position: i32,
    pub start_time: f64,
    pub end_time: f64,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub score: f64,
    pub engagement_score: f64,
    pub emotion_score: f64,
    pub viral_potential: f64,
    pub quotability: f64,
    pub emotions: Vec<String>,
    pub keywords: Vec<String>,
    pub reason: String,
    pub output_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub upload_status: UploadStatus,
    pub upload_error: Option<String>,
    pub youtube_video_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VideoShort {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn youtube_url(&self) -> Option<String> {
        self.youtube_video_id
            .as_ref()
            .map(|id| format!("https://www.youtube.com/shorts/{id}"))
    }
}

/// Row data for inserting a rendered short.
#[derive(Debug, Clone)]
pub struct NewShort {
    pub job_id: Uuid,
    pub position: i32,
    pub start_time: f64,
    pub end_time: f64,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub score: f64,
    pub engagement_score: f64,
    pub emotion_score: f64,
    pub viral_potential: f64,
    pub quotability: f64,
    pub emotions: Vec<String>,
    pub keywords: Vec<String>,
    pub reason: String,
    pub output_path: String,
    pub thumbnail_path: Option<String>,
}
