use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

/// Lifecycle status of a video job.
///
/// Forward moves follow the pipeline order declared here. `Failed` is
/// reachable from every non-terminal status; `Completed` and `Failed`
/// accept no further transitions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Downloading,
    Transcribing,
    Analyzing,
    Editing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Progress percentage shown to viewers.
    pub fn progress(self) -> u8 {
        match self {
            JobStatus::Pending => 10,
            JobStatus::Downloading => 20,
            JobStatus::Transcribing => 40,
            JobStatus::Analyzing => 60,
            JobStatus::Editing => 80,
            JobStatus::Completed | JobStatus::Failed => 100,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// True only for `Failed`; the UI renders its 100% as an error.
    pub fn is_error(self) -> bool {
        self == JobStatus::Failed
    }

    /// Position along the pipeline. `Failed` sits outside the ordering.
    fn rank(self) -> Option<u8> {
        match self {
            JobStatus::Pending => Some(0),
            JobStatus::Downloading => Some(1),
            JobStatus::Transcribing => Some(2),
            JobStatus::Analyzing => Some(3),
            JobStatus::Editing => Some(4),
            JobStatus::Completed => Some(5),
            JobStatus::Failed => None,
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }

    /// Every status from which `next` may legally be entered.
    pub fn allowed_predecessors(next: JobStatus) -> Vec<JobStatus> {
        JobStatus::iter()
            .filter(|from| from.can_transition_to(next))
            .collect()
    }

    /// Human label used on the status page.
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "Queued",
            JobStatus::Downloading => "Downloading video",
            JobStatus::Transcribing => "Transcribing audio",
            JobStatus::Analyzing => "Finding the best moments",
            JobStatus::Editing => "Cutting shorts",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter)]
pub enum VideoQuality {
    #[serde(rename = "480p")]
    #[strum(serialize = "480p")]
    P480,
    #[serde(rename = "720p")]
    #[strum(serialize = "720p")]
    P720,
    #[serde(rename = "1080p")]
    #[strum(serialize = "1080p")]
    P1080,
    #[serde(rename = "4k")]
    #[strum(serialize = "4k")]
    Uhd4k,
}

impl Default for VideoQuality {
    fn default() -> Self {
        VideoQuality::P1080
    }
}

impl VideoQuality {
    /// Length in pixels of the short side of the rendered frame.
    pub fn short_side(self) -> u32 {
        match self {
            VideoQuality::P480 => 480,
            VideoQuality::P720 => 720,
            VideoQuality::P1080 => 1080,
            VideoQuality::Uhd4k => 2160,
        }
    }

    /// yt-dlp format selector capped at this quality.
    pub fn ytdlp_format(self) -> String {
        let h = self.short_side();
        format!(
            "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best[height<={h}]/best"
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter)]
pub enum AspectRatio {
    #[serde(rename = "9:16")]
    #[strum(serialize = "9:16")]
    Vertical,
    #[serde(rename = "1:1")]
    #[strum(serialize = "1:1")]
    Square,
    #[serde(rename = "4:5")]
    #[strum(serialize = "4:5")]
    Portrait,
    #[serde(rename = "16:9")]
    #[strum(serialize = "16:9")]
    Landscape,
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Vertical
    }
}

impl AspectRatio {
    /// (width, height) ratio terms.
    pub fn terms(self) -> (u32, u32) {
        match self {
            AspectRatio::Vertical => (9, 16),
            AspectRatio::Square => (1, 1),
            AspectRatio::Portrait => (4, 5),
            AspectRatio::Landscape => (16, 9),
        }
    }

    /// Output frame size for a quality. Both sides are even, as libx264 requires.
    pub fn frame_size(self, quality: VideoQuality) -> (u32, u32) {
        let (w, h) = self.terms();
        let short = quality.short_side();
        let long = |num: u32, den: u32| (short * num / den) & !1;
        if w <= h {
            (short, long(h, w))
        } else {
            (long(w, h), short)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter)]
pub enum ShortDuration {
    #[serde(rename = "15-30")]
    #[strum(serialize = "15-30")]
    Quick,
    #[serde(rename = "30-45")]
    #[strum(serialize = "30-45")]
    Standard,
    #[serde(rename = "45-60")]
    #[strum(serialize = "45-60")]
    Long,
    #[serde(rename = "60-90")]
    #[strum(serialize = "60-90")]
    Extended,
}

impl Default for ShortDuration {
    fn default() -> Self {
        ShortDuration::Standard
    }
}

impl ShortDuration {
    /// Accepted clip length in seconds, inclusive.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            ShortDuration::Quick => (15.0, 30.0),
            ShortDuration::Standard => (30.0, 45.0),
            ShortDuration::Long => (45.0, 60.0),
            ShortDuration::Extended => (60.0, 90.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentLanguage {
    Hinglish,
    Hindi,
    English,
}

impl Default for ContentLanguage {
    fn default() -> Self {
        ContentLanguage::Hinglish
    }
}

impl ContentLanguage {
    /// Subtitle languages requested from YouTube, most preferred first.
    pub fn subtitle_langs(self) -> &'static str {
        match self {
            ContentLanguage::Hinglish => "hi,en,en-US,en-GB",
            ContentLanguage::Hindi => "hi",
            ContentLanguage::English => "en,en-US,en-GB",
        }
    }

    /// Language name handed to the metadata prompt.
    pub fn prompt_name(self) -> &'static str {
        match self {
            ContentLanguage::Hinglish => "Hinglish (Hindi written in Latin script, mixed with English)",
            ContentLanguage::Hindi => "Hindi",
            ContentLanguage::English => "English",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ContentLanguage::Hinglish => "Hinglish",
            ContentLanguage::Hindi => "Hindi",
            ContentLanguage::English => "English",
        }
    }
}

/// Options chosen on the submission form, persisted as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub video_quality: VideoQuality,
    pub aspect_ratio: AspectRatio,
    pub max_shorts: u32,
    pub short_duration: ShortDuration,
    pub content_language: ContentLanguage,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            video_quality: VideoQuality::default(),
            aspect_ratio: AspectRatio::default(),
            max_shorts: 5,
            short_duration: ShortDuration::default(),
            content_language: ContentLanguage::default(),
        }
    }
}

/// A user-submitted video-to-shorts job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJob {
    pub id: Uuid,
    pub youtube_url: String,
    pub options: JobOptions,
    pub status: JobStatus,
    pub title: Option<String>,
    pub error_message: Option<String>,
    pub video_path: Option<String>,
    pub transcript_path: Option<String>,
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl VideoJob {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.youtube_url)
    }

    /// Only shorts of a finished job are offered for upload. A job that
    /// failed mid-edit may still hold some of its shorts.
    pub fn accepts_uploads(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const FORWARD: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::Downloading,
        JobStatus::Transcribing,
        JobStatus::Analyzing,
        JobStatus::Editing,
        JobStatus::Completed,
    ];

    #[test]
    fn test_progress_mapping() {
        let expected = [10, 20, 40, 60, 80, 100];
        for (status, pct) in FORWARD.iter().zip(expected) {
            assert_eq!(status.progress(), pct, "{status}");
        }
        assert_eq!(JobStatus::Failed.progress(), 100);
        assert!(JobStatus::Failed.is_error());
        assert!(!JobStatus::Completed.is_error());
    }

    #[test]
    fn test_forward_transitions_are_monotonic() {
        for (i, from) in FORWARD.iter().enumerate() {
            for (j, to) in FORWARD.iter().enumerate() {
                let expected = !from.is_terminal() && j > i;
                assert_eq!(from.can_transition_to(*to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_only() {
        for status in JobStatus::iter() {
            assert_eq!(
                status.can_transition_to(JobStatus::Failed),
                !status.is_terminal(),
                "{status} -> failed"
            );
        }
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        for next in JobStatus::iter() {
            assert!(!JobStatus::Completed.can_transition_to(next));
            assert!(!JobStatus::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn test_allowed_predecessors() {
        assert_eq!(
            JobStatus::allowed_predecessors(JobStatus::Transcribing),
            vec![JobStatus::Pending, JobStatus::Downloading]
        );
        assert_eq!(
            JobStatus::allowed_predecessors(JobStatus::Failed),
            vec![
                JobStatus::Pending,
                JobStatus::Downloading,
                JobStatus::Transcribing,
                JobStatus::Analyzing,
                JobStatus::Editing,
            ]
        );
        assert!(JobStatus::allowed_predecessors(JobStatus::Pending).is_empty());
    }

    #[test]
    fn test_status_text_round_trip() {
        for status in JobStatus::iter() {
            assert_eq!(JobStatus::from_str(status.as_ref()).unwrap(), status);
        }
        assert_eq!(JobStatus::Transcribing.to_string(), "transcribing");
    }

    #[test]
    fn test_option_strings_match_form_values() {
        assert_eq!(AspectRatio::from_str("9:16").unwrap(), AspectRatio::Vertical);
        assert_eq!(VideoQuality::from_str("4k").unwrap(), VideoQuality::Uhd4k);
        assert_eq!(ShortDuration::Standard.to_string(), "30-45");
        assert_eq!(ContentLanguage::Hinglish.as_ref(), "hinglish");
        assert!(AspectRatio::from_str("3:2").is_err());
    }

    #[test]
    fn test_frame_sizes_are_even_and_match_ratio() {
        assert_eq!(AspectRatio::Vertical.frame_size(VideoQuality::P1080), (1080, 1920));
        assert_eq!(AspectRatio::Square.frame_size(VideoQuality::P720), (720, 720));
        assert_eq!(AspectRatio::Portrait.frame_size(VideoQuality::P1080), (1080, 1350));
        assert_eq!(AspectRatio::Landscape.frame_size(VideoQuality::P480), (852, 480));
        for ratio in AspectRatio::iter() {
            for quality in VideoQuality::iter() {
                let (w, h) = ratio.frame_size(quality);
                assert_eq!(w % 2, 0);
                assert_eq!(h % 2, 0);
            }
        }
    }
}
