//! Signed cookies: the connected YouTube account and one-shot flash notices.

use jsonwebtoken::{decode, encode, get_current_timestamp, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "shorts_session";
pub const FLASH_COOKIE: &str = "shorts_flash";
pub const OAUTH_STATE_COOKIE: &str = "shorts_oauth_state";

const SESSION_TTL_SECS: u64 = 30 * 24 * 3600;
const OAUTH_STATE_TTL_SECS: u64 = 600;

const SESSION_PURPOSE: &str = "session";
const OAUTH_PURPOSE: &str = "oauth_state";

/// The YouTube account a browser is connected as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub channel: Option<String>,
    purpose: String,
    exp: u64,
}

impl SessionClaims {
    pub fn account_email(&self) -> &str {
        &self.sub
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OAuthStateClaims {
    nonce: String,
    purpose: String,
    exp: u64,
}

/// HS256 keys for session cookies and OAuth `state` values.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    secure_cookies: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, secure_cookies: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            secure_cookies,
        }
    }

    pub fn issue_session(&self, email: &str, channel: Option<&str>) -> Result<String, SessionError> {
        let claims = SessionClaims {
            sub: email.to_string(),
            channel: channel.map(str::to_string),
            purpose: SESSION_PURPOSE.to_string(),
            exp: get_current_timestamp() + SESSION_TTL_SECS,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let claims = decode::<SessionClaims>(token, &self.decoding, &Validation::default())?.claims;
        if claims.purpose != SESSION_PURPOSE {
            return Err(SessionError::WrongPurpose);
        }
        Ok(claims)
    }

    /// A short-lived signed value round-tripped through Google's consent screen.
    pub fn issue_oauth_state(&self) -> Result<String, SessionError> {
        let claims = OAuthStateClaims {
            nonce: Uuid::new_v4().to_string(),
            purpose: OAUTH_PURPOSE.to_string(),
            exp: get_current_timestamp() + OAUTH_STATE_TTL_SECS,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_oauth_state(&self, state: &str) -> Result<(), SessionError> {
        let claims = decode::<OAuthStateClaims>(state, &self.decoding, &Validation::default())?.claims;
        if claims.purpose != OAUTH_PURPOSE {
            return Err(SessionError::WrongPurpose);
        }
        Ok(())
    }

    /// Issue an OAuth `state` and pin it to this browser with a short-lived cookie.
    pub fn begin_oauth(&self, cookies: &Cookies) -> Result<String, SessionError> {
        let state = self.issue_oauth_state()?;
        let mut cookie = Cookie::new(OAUTH_STATE_COOKIE, state.clone());
        cookie.set_http_only(true);
        cookie.set_path("/youtube");
        // Lax still sends it on the top-level redirect back from Google.
        cookie.set_same_site(SameSite::Lax);
        cookie.set_secure(self.secure_cookies);
        cookie.set_max_age(Some(time::Duration::seconds(OAUTH_STATE_TTL_SECS as i64)));
        cookies.add(cookie);
        Ok(state)
    }

    /// Accept a callback `state` only if this browser started the flow. The
    /// cookie is consumed either way.
    pub fn finish_oauth(&self, cookies: &Cookies, state: &str) -> Result<(), SessionError> {
        let pinned = cookies.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
        let mut removal = Cookie::new(OAUTH_STATE_COOKIE, "");
        removal.set_path("/youtube");
        cookies.remove(removal);

        if pinned.as_deref() != Some(state) {
            return Err(SessionError::StateMismatch);
        }
        self.verify_oauth_state(state)
    }

    /// The connected account, if the cookie is present and valid.
    pub fn current(&self, cookies: &Cookies) -> Option<SessionClaims> {
        let cookie = cookies.get(SESSION_COOKIE)?;
        match self.verify_session(cookie.value()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid session cookie");
                None
            }
        }
    }

    pub fn start(&self, cookies: &Cookies, email: &str, channel: Option<&str>) -> Result<(), SessionError> {
        let token = self.issue_session(email, channel)?;
        let mut cookie = Cookie::new(SESSION_COOKIE, token);
        cookie.set_http_only(true);
        cookie.set_path("/");
        cookie.set_same_site(SameSite::Lax);
        cookie.set_secure(self.secure_cookies);
        cookie.set_max_age(Some(time::Duration::seconds(SESSION_TTL_SECS as i64)));
        cookies.add(cookie);
        Ok(())
    }

    pub fn end(&self, cookies: &Cookies) {
        let mut cookie = Cookie::new(SESSION_COOKIE, "");
        cookie.set_path("/");
        cookies.remove(cookie);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token was issued for a different purpose")]
    WrongPurpose,

    #[error("state was not issued to this browser")]
    StateMismatch,
}

/// Notices carried to the next rendered page in a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Flash {
    MissingUrl,
    InvalidOptions,
    QueueUnavailable,
    JobDeleted,
    CleanupDone,
    CleanupNotConfirmed,
    CleanupFailed,
    UploadQueued,
    NothingToUpload,
    UploadUnavailable,
    JobNotCompleted,
    ShortFileMissing,
    YoutubeConnected,
    YoutubeDisconnected,
    YoutubeNotConfigured,
    YoutubeNotConnected,
    YoutubeAuthFailed,
}

/// Bootstrap-style alert level of a flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

impl FlashLevel {
    pub fn css_class(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Warning => "warning",
            FlashLevel::Danger => "danger",
        }
    }
}

impl Flash {
    pub fn message(self) -> &'static str {
        match self {
            Flash::MissingUrl => "Please enter a YouTube URL.",
            Flash::InvalidOptions => "One of the selected options is not supported.",
            Flash::QueueUnavailable => "The job queue is unavailable right now. Please try again.",
            Flash::JobDeleted => "Job deleted.",
            Flash::CleanupDone => "All jobs and generated files were deleted.",
            Flash::CleanupNotConfirmed => "Cleanup not confirmed. Type DELETE to confirm.",
            Flash::CleanupFailed => "Cleanup did not finish. Some files may remain.",
            Flash::UploadQueued => "Upload queued. Refresh the results page to follow it.",
            Flash::NothingToUpload => "There is nothing left to upload for this job.",
            Flash::UploadUnavailable => "This short cannot be uploaded in its current state.",
            Flash::JobNotCompleted => "Shorts can be uploaded once the job has completed.",
            Flash::ShortFileMissing => "The video file for this short no longer exists.",
            Flash::YoutubeConnected => "YouTube account connected.",
            Flash::YoutubeDisconnected => "YouTube account disconnected.",
            Flash::YoutubeNotConfigured => "YouTube uploads are not configured on this server.",
            Flash::YoutubeNotConnected => "Connect a YouTube account first.",
            Flash::YoutubeAuthFailed => "YouTube authorization failed. Please try again.",
        }
    }

    pub fn level(self) -> FlashLevel {
        match self {
            Flash::JobDeleted
            | Flash::CleanupDone
            | Flash::UploadQueued
            | Flash::YoutubeConnected => FlashLevel::Success,
            Flash::YoutubeDisconnected | Flash::NothingToUpload => FlashLevel::Info,
            Flash::CleanupNotConfirmed
            | Flash::YoutubeNotConnected
            | Flash::UploadUnavailable
            | Flash::JobNotCompleted
            | Flash::ShortFileMissing => FlashLevel::Warning,
            Flash::MissingUrl
            | Flash::InvalidOptions
            | Flash::QueueUnavailable
            | Flash::CleanupFailed
            | Flash::YoutubeNotConfigured
            | Flash::YoutubeAuthFailed => FlashLevel::Danger,
        }
    }

    pub fn set(self, cookies: &Cookies) {
        let mut cookie = Cookie::new(FLASH_COOKIE, self.as_ref().to_string());
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookies.add(cookie);
    }

    /// Read and clear the pending flash. Unknown codes are dropped.
    pub fn take(cookies: &Cookies) -> Option<Flash> {
        let cookie = cookies.get(FLASH_COOKIE)?;
        let flash = cookie.value().parse().ok();
        let mut removal = Cookie::new(FLASH_COOKIE, "");
        removal.set_path("/");
        cookies.remove(removal);
        flash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret", false)
    }

    #[test]
    fn test_session_round_trip() {
        let keys = keys();
        let token = keys.issue_session("creator@example.com", Some("My Channel")).unwrap();
        let claims = keys.verify_session(&token).unwrap();
        assert_eq!(claims.account_email(), "creator@example.com");
        assert_eq!(claims.channel.as_deref(), Some("My Channel"));
    }

    #[test]
    fn test_tampered_session_is_rejected() {
        let keys = keys();
        let token = keys.issue_session("creator@example.com", None).unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;
        let replacement = if &token[sig_start..sig_start + 1] == "A" { "B" } else { "A" };
        let mut tampered = token.clone();
        tampered.replace_range(sig_start..sig_start + 1, replacement);
        assert!(keys.verify_session(&tampered).is_err());

        let other = SessionKeys::new("another-secret", false);
        assert!(other.verify_session(&token).is_err());
    }

    #[test]
    fn test_oauth_state_is_not_a_session() {
        let keys = keys();
        let state = keys.issue_oauth_state().unwrap();
        assert!(keys.verify_oauth_state(&state).is_ok());
        assert!(keys.verify_session(&state).is_err());

        let session = keys.issue_session("creator@example.com", None).unwrap();
        assert!(keys.verify_oauth_state(&session).is_err());
    }

    #[test]
    fn test_flash_codes_round_trip() {
        for flash in Flash::iter() {
            assert_eq!(flash.as_ref().parse::<Flash>().unwrap(), flash);
            assert!(!flash.message().is_empty());
        }
        assert!("bogus".parse::<Flash>().is_err());
    }
}
