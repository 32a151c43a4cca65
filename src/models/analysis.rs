use serde::{Deserialize, Serialize};

/// One timed line of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Contiguous run of transcript segments considered as a candidate short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateWindow {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl CandidateWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &CandidateWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Engagement assessment of a transcript window. Scores are in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAnalysis {
    pub engagement_score: f64,
    pub emotion_score: f64,
    pub viral_potential: f64,
    pub quotability: f64,
    pub emotions: Vec<String>,
    pub keywords: Vec<String>,
    pub reason: String,
}

impl SegmentAnalysis {
    /// Weighted overall score used to rank windows.
    pub fn overall_score(&self) -> f64 {
        0.35 * self.engagement_score
            + 0.25 * self.emotion_score
            + 0.25 * self.viral_potential
            + 0.15 * self.quotability
    }
}

/// Upload-ready title, description and tags for a short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// A window that survived ranking, with its analysis.
#[derive(Debug, Clone)]
pub struct ScoredWindow {
    pub window: CandidateWindow,
    pub analysis: SegmentAnalysis,
    pub score: f64,
}
