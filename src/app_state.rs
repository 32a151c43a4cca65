use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    encryption::{EncryptionError, TokenCipher},
    gemini::GeminiClient,
    queue::{QueueError, TaskQueue},
    session::SessionKeys,
    storage::DataDirs,
    youtube::YoutubeClient,
};

/// Shared state for route handlers and worker tasks.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: Arc<TaskQueue>,
    pub cipher: Arc<TokenCipher>,
    pub gemini: Arc<GeminiClient>,
    /// Present only when a Google OAuth client is configured.
    pub youtube: Option<Arc<YoutubeClient>>,
    pub sessions: Arc<SessionKeys>,
    pub dirs: DataDirs,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn from_config(db: PgPool, config: AppConfig) -> Result<Self, StateError> {
        let queue = TaskQueue::new(&config.redis_url)?;
        let cipher = TokenCipher::new(&config.encryption_key)?;
        let gemini = GeminiClient::new(&config.gemini_base_url, &config.gemini_model, config.gemini_keys());

        let youtube = match (&config.google_client_id, &config.google_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some(Arc::new(YoutubeClient::new(
                id.clone(),
                secret.clone(),
                config.oauth_redirect_url.clone(),
            ))),
            _ => {
                tracing::warn!("Google OAuth client not configured, YouTube uploads disabled");
                None
            }
        };

        let sessions = SessionKeys::new(&config.session_secret, config.is_production());
        let dirs = DataDirs::new(config.data_dir.clone());

        Ok(Self {
            db,
            queue: Arc::new(queue),
            cipher: Arc::new(cipher),
            gemini: Arc::new(gemini),
            youtube,
            sessions: Arc::new(sessions),
            dirs,
            config: Arc::new(config),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("job queue: {0}")]
    Queue(#[from] QueueError),

    #[error("token encryption: {0}")]
    Encryption(#[from] EncryptionError),
}
