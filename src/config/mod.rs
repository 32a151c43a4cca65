use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:5000"). Ignored by the worker.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for the task queue
    pub redis_url: String,

    /// Secret used to sign session cookies and OAuth state
    pub session_secret: String,

    /// AES-256-GCM key for OAuth tokens at rest (base64-encoded, 32 bytes)
    pub encryption_key: String,

    /// Root of the temp/, uploads/ and outputs/ directories
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Primary Gemini API key. Without any key the analyzer runs heuristics only.
    pub gemini_api_key: Option<String>,
    pub gemini_api_key_1: Option<String>,
    pub gemini_api_key_2: Option<String>,
    pub gemini_api_key_3: Option<String>,
    pub gemini_api_key_4: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    /// Google OAuth client used for YouTube uploads. Uploads are disabled when unset.
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,

    #[serde(default = "default_oauth_redirect_url")]
    pub oauth_redirect_url: String,

    /// Maximum number of tasks one worker process runs at once
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Wall-clock limit for one job's pipeline
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Prometheus listener of the worker process
    #[serde(default = "default_worker_metrics_addr")]
    pub worker_metrics_addr: String,

    /// URL pinged periodically to keep free-tier hosts awake
    pub keep_alive_url: Option<String>,

    #[serde(default = "default_keep_alive_interval_secs")]
    pub keep_alive_interval_secs: u64,

    /// "production" hides internal error details from rendered pages
    pub environment: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_gemini_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_oauth_redirect_url() -> String {
    "http://localhost:5000/youtube/callback".to_string()
}

fn default_worker_concurrency() -> usize {
    2
}

fn default_job_timeout_secs() -> u64 {
    3600
}

fn default_worker_metrics_addr() -> String {
    "0.0.0.0:9100".to_string()
}

fn default_keep_alive_interval_secs() -> u64 {
    300
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Gemini keys in rotation order: the primary key, then backups 1-4.
    pub fn gemini_keys(&self) -> Vec<String> {
        [
            &self.gemini_api_key,
            &self.gemini_api_key_1,
            &self.gemini_api_key_2,
            &self.gemini_api_key_3,
            &self.gemini_api_key_4,
        ]
        .into_iter()
        .flatten()
        .filter(|key| !key.trim().is_empty())
        .cloned()
        .collect()
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment.as_deref() == Some("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env() -> Vec<(String, String)> {
        [
            ("DATABASE_URL", "postgres://localhost/shorts"),
            ("REDIS_URL", "redis://localhost"),
            ("SESSION_SECRET", "secret"),
            ("ENCRYPTION_KEY", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = envy::from_iter(base_env()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.worker_concurrency, 2);
        assert_eq!(config.job_timeout(), Duration::from_secs(3600));
        assert!(config.gemini_keys().is_empty());
        assert!(!config.is_production());
    }

    #[test]
    fn test_gemini_keys_keep_rotation_order() {
        let mut env = base_env();
        env.push(("GEMINI_API_KEY_2".into(), "second".into()));
        env.push(("GEMINI_API_KEY".into(), "primary".into()));
        env.push(("GEMINI_API_KEY_1".into(), " ".into()));
        let config: AppConfig = envy::from_iter(env).unwrap();
        assert_eq!(config.gemini_keys(), vec!["primary", "second"]);
    }
}
