use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// Credentials row as stored: tokens are still sealed.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub account_email: String,
    pub channel_title: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Insert or replace the token set of an account.
///
/// Google only returns a refresh token on first consent, so an absent one
/// keeps whatever is already stored.
pub async fn upsert_credentials(pool: &PgPool, creds: &StoredCredentials) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO youtube_credentials (account_email, channel_title, access_token,
                                         refresh_token, token_expires_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (account_email) DO UPDATE
        SET channel_title = COALESCE(EXCLUDED.channel_title, youtube_credentials.channel_title),
            access_token = EXCLUDED.access_token,
            refresh_token = COALESCE(EXCLUDED.refresh_token, youtube_credentials.refresh_token),
            token_expires_at = EXCLUDED.token_expires_at,
            updated_at = NOW()
        "#,
    )
    .bind(&creds.account_email)
    .bind(&creds.channel_title)
    .bind(&creds.access_token)
    .bind(&creds.refresh_token)
    .bind(creds.token_expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_credentials(
    pool: &PgPool,
    account_email: &str,
) -> Result<Option<StoredCredentials>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT account_email, channel_title, access_token, refresh_token, token_expires_at
        FROM youtube_credentials
        WHERE account_email = $1
        "#,
    )
    .bind(account_email)
    .fetch_optional(pool)
    .await?;

    row.map(|r| {
        Ok(StoredCredentials {
            account_email: r.try_get("account_email")?,
            channel_title: r.try_get("channel_title")?,
            access_token: r.try_get("access_token")?,
            refresh_token: r.try_get("refresh_token")?,
            token_expires_at: r.try_get("token_expires_at")?,
        })
    })
    .transpose()
}

/// Store a refreshed access token.
pub async fn update_access_token(
    pool: &PgPool,
    account_email: &str,
    sealed_access_token: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE youtube_credentials
        SET access_token = $1, token_expires_at = $2, updated_at = NOW()
        WHERE account_email = $3
        "#,
    )
    .bind(sealed_access_token)
    .bind(expires_at)
    .bind(account_email)
    .execute(pool)
    .await?;
    Ok(())
}
