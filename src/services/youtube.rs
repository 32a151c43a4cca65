use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::services::fallback::truncate_chars;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE: &str = "https://www.googleapis.com";

const SCOPES: &str = "https://www.googleapis.com/auth/youtube.upload \
https://www.googleapis.com/auth/youtube.readonly \
https://www.googleapis.com/auth/userinfo.email";

pub const MAX_DESCRIPTION_CHARS: usize = 4500;
/// People & Blogs
const CATEGORY_ID: &str = "22";

/// Google OAuth and YouTube Data API client.
pub struct YoutubeClient {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    auth_url: String,
    token_url: String,
    api_base: String,
}

/// Tokens returned by Google's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl TokenGrant {
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in.map(|secs| now + Duration::seconds(secs))
    }
}

/// Snippet fields of an upload.
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource<'a> {
    snippet: Snippet<'a>,
    status: VideoStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snippet<'a> {
    title: String,
    description: String,
    tags: &'a [String],
    category_id: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatus {
    privacy_status: &'static str,
    self_declared_made_for_kids: bool,
}

#[derive(Deserialize)]
struct UserInfo {
    email: String,
}

#[derive(Deserialize)]
struct ChannelList {
    #[serde(default)]
    items: Vec<Channel>,
}

#[derive(Deserialize)]
struct Channel {
    snippet: ChannelSnippet,
}

#[derive(Deserialize)]
struct ChannelSnippet {
    title: String,
}

#[derive(Deserialize)]
struct InsertedVideo {
    id: String,
}

impl YoutubeClient {
    pub fn new(client_id: String, client_secret: String, redirect_url: String) -> Self {
        Self {
            http: Client::new(),
            client_id,
            client_secret,
            redirect_url,
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            api_base: API_BASE.to_string(),
        }
    }

    /// Point the token and API calls at another host.
    pub fn with_endpoints(mut self, token_url: &str, api_base: &str) -> Self {
        self.token_url = token_url.to_string();
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Consent screen URL. `prompt=consent` makes Google return a refresh token every time.
    pub fn authorize_url(&self, state: &str) -> Result<Url, YoutubeError> {
        Ok(Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )?)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, YoutubeError> {
        self.token_request(&[
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, YoutubeError> {
        self.token_request(&[
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, YoutubeError> {
        let response = self.http.post(&self.token_url).form(params).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn user_email(&self, access_token: &str) -> Result<String, YoutubeError> {
        let response = self
            .http
            .get(format!("{}/oauth2/v2/userinfo", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await?;
        let info: UserInfo = check(response).await?.json().await?;
        Ok(info.email)
    }

    /// Title of the authenticated user's channel, if they have one.
    pub async fn channel_title(&self, access_token: &str) -> Result<Option<String>, YoutubeError> {
        let response = self
            .http
            .get(format!("{}/youtube/v3/channels", self.api_base))
            .query(&[("part", "snippet"), ("mine", "true")])
            .bearer_auth(access_token)
            .send()
            .await?;
        let channels: ChannelList = check(response).await?.json().await?;
        Ok(channels.items.into_iter().next().map(|c| c.snippet.title))
    }

    /// Resumable `videos.insert`: open a session, then send the file in one PUT.
    /// Returns the new video's ID.
    pub async fn upload_video(
        &self,
        access_token: &str,
        file: &Path,
        metadata: &UploadMetadata,
    ) -> Result<String, YoutubeError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|_| YoutubeError::MissingFile(file.display().to_string()))?;

        let resource = video_resource(metadata);
        let response = self
            .http
            .post(format!("{}/upload/youtube/v3/videos", self.api_base))
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(access_token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", bytes.len())
            .json(&resource)
            .send()
            .await?;
        let response = check(response).await?;

        let session_url = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(YoutubeError::NoUploadSession)?
            .to_string();

        tracing::info!(file = %file.display(), bytes = bytes.len(), "Uploading short to YouTube");
        let response = self
            .http
            .put(&session_url)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .body(bytes)
            .send()
            .await?;
        let video: InsertedVideo = check(response).await?.json().await?;
        Ok(video.id)
    }
}

fn video_resource(metadata: &UploadMetadata) -> VideoResource<'_> {
    let description = if metadata.description.trim().is_empty() {
        "Generated YouTube Short".to_string()
    } else {
        truncate_chars(&metadata.description, MAX_DESCRIPTION_CHARS)
    };
    VideoResource {
        snippet: Snippet {
            title: truncate_chars(&metadata.title, 100),
            description,
            tags: &metadata.tags,
            category_id: CATEGORY_ID,
        },
        status: VideoStatus {
            privacy_status: "public",
            self_declared_made_for_kids: false,
        },
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, YoutubeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(YoutubeError::Api { status, body })
}

#[derive(Debug, thiserror::Error)]
pub enum YoutubeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("invalid OAuth URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("upload session was not opened (no Location header)")]
    NoUploadSession,

    #[error("video file not found: {0}")]
    MissingFile(String),
}
