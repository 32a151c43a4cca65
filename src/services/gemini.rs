use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::analysis::{SegmentAnalysis, ShortMetadata};
use crate::models::job::ContentLanguage;
use crate::services::fallback;

const ANALYSIS_ATTEMPTS: u32 = 2;
const METADATA_ATTEMPTS: u32 = 3;
const MAX_SEGMENT_CHARS: usize = 1000;
const MAX_REASON_CHARS: usize = 500;

const ANALYSIS_INSTRUCTION: &str = "You are an expert content analyst specializing in viral \
social media content and YouTube Shorts. Analyze the given transcript segment for its potential \
as an engaging short-form video. Score engagement_score, emotion_score, viral_potential and \
quotability between 0.0 and 1.0, list the emotions detected (humor, surprise, excitement, \
inspiration, controversy), the keywords that make it engaging, and give a brief reason. Favour \
strong emotional hooks, surprising turns, humour, clear storytelling and quotable lines.";

/// Client for the Gemini `generateContent` API with key rotation.
///
/// Keys are tried in order. A quota or rate-limit response moves the client to
/// the next key for good; once every key is spent it answers from the
/// heuristics in [`fallback`] only.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    keys: Vec<String>,
    current_key: AtomicUsize,
    exhausted: AtomicBool,
    retry_delay: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct RawAnalysis {
    engagement_score: Option<f64>,
    emotion_score: Option<f64>,
    viral_potential: Option<f64>,
    quotability: Option<f64>,
    #[serde(default)]
    emotions: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    reason: Option<String>,
}

impl RawAnalysis {
    fn normalize(self) -> SegmentAnalysis {
        let clamp = |v: Option<f64>| v.filter(|x| x.is_finite()).unwrap_or(0.5).clamp(0.0, 1.0);
        SegmentAnalysis {
            engagement_score: clamp(self.engagement_score),
            emotion_score: clamp(self.emotion_score),
            viral_potential: clamp(self.viral_potential),
            quotability: clamp(self.quotability),
            emotions: self.emotions.into_iter().take(5).collect(),
            keywords: self.keywords.into_iter().take(10).collect(),
            reason: fallback::truncate_chars(
                self.reason
                    .as_deref()
                    .unwrap_or("Content has potential for engagement"),
                MAX_REASON_CHARS,
            ),
        }
    }
}

#[derive(Deserialize)]
struct RawMetadata {
    title: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
}

impl RawMetadata {
    fn normalize(self, segment_text: &str, original_title: &str) -> ShortMetadata {
        let backup = fallback::metadata(segment_text, original_title);
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .map(|t| fallback::truncate_chars(t.trim(), fallback::MAX_TITLE_CHARS))
            .unwrap_or(backup.title);
        ShortMetadata {
            title,
            description: self
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(backup.description),
            tags: self.tags.map(fallback::fit_tags).unwrap_or(backup.tags),
        }
    }
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, keys: Vec<String>) -> Self {
        if keys.is_empty() {
            tracing::warn!("No Gemini API keys configured, analysis will use heuristics only");
        } else {
            tracing::info!(keys = keys.len(), model, "Gemini client configured");
        }
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            exhausted: AtomicBool::new(keys.is_empty()),
            keys,
            current_key: AtomicUsize::new(0),
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Base pause between retries. Metadata backoff doubles it per attempt.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// False once no key is left and only heuristics are used.
    pub fn is_available(&self) -> bool {
        !self.exhausted.load(Ordering::Acquire)
    }

    pub fn current_key_index(&self) -> usize {
        self.current_key.load(Ordering::Acquire)
    }

    /// Move past the key at `spent`. Returns false when none is left.
    fn rotate_key(&self, spent: usize) -> bool {
        let next = spent + 1;
        if next >= self.keys.len() {
            tracing::warn!("All Gemini API keys exhausted, switching to heuristics");
            self.exhausted.store(true, Ordering::Release);
            return false;
        }
        // A concurrent caller may already have rotated past `spent`.
        let _ = self
            .current_key
            .compare_exchange(spent, next, Ordering::AcqRel, Ordering::Acquire);
        tracing::info!(key = next + 1, "Switching to backup Gemini API key");
        true
    }

    /// Score a transcript window. Never fails: errors fall back to heuristics.
    pub async fn analyze_segment(&self, text: &str) -> SegmentAnalysis {
        let excerpt = fallback::truncate_chars(text, MAX_SEGMENT_CHARS);
        let prompt = format!("Analyze this content segment for YouTube Shorts potential:\n\n{excerpt}");
        let mut failures = 0;

        while self.is_available() {
            let key_index = self.current_key_index();
            match self
                .generate::<RawAnalysis>(key_index, ANALYSIS_INSTRUCTION, &prompt, analysis_schema())
                .await
            {
                Ok(raw) => return raw.normalize(),
                Err(e) if e.is_quota() => {
                    tracing::warn!(error = %e, "Gemini quota hit during analysis");
                    self.rotate_key(key_index);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(error = %e, attempt = failures, "Gemini analysis failed");
                    if failures >= ANALYSIS_ATTEMPTS {
                        break;
                    }
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }

        fallback::analyze(text)
    }

    /// Title, description and tags for a short, in the job's language.
    pub async fn generate_metadata(
        &self,
        segment_text: &str,
        original_title: &str,
        language: ContentLanguage,
    ) -> ShortMetadata {
        let instruction = metadata_instruction(language);
        let prompt = format!(
            "Original video title: {original_title}\n\nContent segment: {segment_text}\n\n\
             Generate YouTube Shorts metadata in {}.",
            language.prompt_name()
        );

        for attempt in 0..METADATA_ATTEMPTS {
            if !self.is_available() {
                break;
            }
            let key_index = self.current_key_index();
            match self
                .generate::<RawMetadata>(key_index, &instruction, &prompt, metadata_schema())
                .await
            {
                Ok(raw) => return raw.normalize(segment_text, original_title),
                Err(e) if e.is_quota() => {
                    tracing::warn!(error = %e, attempt = attempt + 1, "Gemini quota hit during metadata");
                    if !self.rotate_key(key_index) {
                        break;
                    }
                    if attempt + 1 < METADATA_ATTEMPTS {
                        tokio::time::sleep(self.retry_delay * 2u32.pow(attempt + 1)).await;
                    }
                }
                Err(e) if e.is_retryable() && attempt + 1 < METADATA_ATTEMPTS => {
                    let delay = self.retry_delay * 2u32.pow(attempt + 1);
                    tracing::warn!(error = %e, attempt = attempt + 1, ?delay, "Gemini busy, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Gemini metadata generation failed");
                    break;
                }
            }
        }

        fallback::metadata(segment_text, original_title)
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        key_index: usize,
        instruction: &str,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<T, GeminiError> {
        let key = self.keys.get(key_index).ok_or(GeminiError::NoKey)?;
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);

        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: instruction }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api { status, body });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .find(|t| !t.trim().is_empty())
            .ok_or(GeminiError::EmptyResponse)?;

        Ok(serde_json::from_str(&text)?)
    }
}

fn metadata_instruction(language: ContentLanguage) -> String {
    format!(
        "You are an expert YouTube creator specializing in viral Shorts. Write metadata for a \
         Short in {}. The title must be under 100 characters, use two or three fitting emojis and \
         include at least two hashtags. The description should hook the viewer, give context \
         about the moment and end with a call to action. Return up to 28 tags whose combined \
         length stays under 500 characters.",
        language.prompt_name()
    )
}

fn analysis_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "engagement_score": { "type": "NUMBER" },
            "emotion_score": { "type": "NUMBER" },
            "viral_potential": { "type": "NUMBER" },
            "quotability": { "type": "NUMBER" },
            "emotions": { "type": "ARRAY", "items": { "type": "STRING" } },
            "keywords": { "type": "ARRAY", "items": { "type": "STRING" } },
            "reason": { "type": "STRING" }
        },
        "required": ["engagement_score", "emotion_score", "viral_potential", "quotability",
                     "emotions", "keywords", "reason"]
    })
}

fn metadata_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "tags": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["title", "description", "tags"]
    })
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("no Gemini API key available")]
    NoKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Gemini returned an empty response")]
    EmptyResponse,

    #[error("Failed to parse Gemini JSON output: {0}")]
    Parse(#[from] serde_json::Error),
}

impl GeminiError {
    /// Quota or rate-limit responses, which spend the current key.
    pub fn is_quota(&self) -> bool {
        match self {
            GeminiError::Api { status, body } => {
                let body = body.to_lowercase();
                *status == StatusCode::TOO_MANY_REQUESTS
                    || ["resource_exhausted", "quota", "rate limit"]
                        .iter()
                        .any(|needle| body.contains(needle))
            }
            _ => false,
        }
    }

    /// Quota errors plus transient overload, worth a backoff and retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            GeminiError::Api { status, body } => {
                let body = body.to_lowercase();
                self.is_quota()
                    || *status == StatusCode::SERVICE_UNAVAILABLE
                    || body.contains("overloaded")
                    || body.contains("unavailable")
            }
            _ => false,
        }
    }
}
