//! Encrypted YouTube credentials: storing grants and handing out live access tokens.

use chrono::Utc;
use sqlx::PgPool;

use crate::db::credential_queries::{self, StoredCredentials};
use crate::models::credentials::YoutubeCredentials;
use crate::services::encryption::{EncryptionError, TokenCipher};
use crate::services::youtube::{TokenGrant, YoutubeClient, YoutubeError};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Youtube(#[from] YoutubeError),

    #[error("no YouTube account connected for {0}")]
    NotConnected(String),

    #[error("access token expired and no refresh token is stored")]
    NoRefreshToken,
}

/// Seal and store the tokens of a completed consent flow.
pub async fn save_grant(
    db: &PgPool,
    cipher: &TokenCipher,
    account_email: &str,
    channel_title: Option<&str>,
    grant: &TokenGrant,
) -> Result<(), CredentialError> {
    let stored = StoredCredentials {
        account_email: account_email.to_string(),
        channel_title: channel_title.map(str::to_string),
        access_token: cipher.seal(&grant.access_token)?,
        refresh_token: grant
            .refresh_token
            .as_deref()
            .map(|t| cipher.seal(t))
            .transpose()?,
        token_expires_at: grant.expires_at(Utc::now()),
    };
    credential_queries::upsert_credentials(db, &stored).await?;
    Ok(())
}

pub async fn load(
    db: &PgPool,
    cipher: &TokenCipher,
    account_email: &str,
) -> Result<Option<YoutubeCredentials>, CredentialError> {
    let Some(stored) = credential_queries::get_credentials(db, account_email).await? else {
        return Ok(None);
    };
    Ok(Some(YoutubeCredentials {
        account_email: stored.account_email,
        channel_title: stored.channel_title,
        access_token: cipher.open(&stored.access_token)?,
        refresh_token: stored.refresh_token.as_deref().map(|t| cipher.open(t)).transpose()?,
        token_expires_at: stored.token_expires_at,
    }))
}

/// An access token that is valid for at least another minute, refreshing it if needed.
pub async fn fresh_access_token(
    db: &PgPool,
    cipher: &TokenCipher,
    youtube: &YoutubeClient,
    account_email: &str,
) -> Result<String, CredentialError> {
    let creds = load(db, cipher, account_email)
        .await?
        .ok_or_else(|| CredentialError::NotConnected(account_email.to_string()))?;

    let now = Utc::now();
    if !creds.is_expired(now) {
        return Ok(creds.access_token);
    }

    let refresh_token = creds.refresh_token.ok_or(CredentialError::NoRefreshToken)?;
    let grant = youtube.refresh(&refresh_token).await?;
    credential_queries::update_access_token(
        db,
        account_email,
        &cipher.seal(&grant.access_token)?,
        grant.expires_at(now),
    )
    .await?;
    tracing::info!(account = account_email, "Refreshed YouTube access token");

    Ok(grant.access_token)
}
