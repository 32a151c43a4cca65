use chrono::{DateTime, Duration, Utc};

/// Decrypted YouTube OAuth token set for one connected account.
#[derive(Debug, Clone)]
pub struct YoutubeCredentials {
    pub account_email: String,
    pub channel_title: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl YoutubeCredentials {
    /// Treats tokens within a minute of expiry as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.token_expires_at {
            Some(expires) => expires - Duration::seconds(60) <= now,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(expires: Option<DateTime<Utc>>) -> YoutubeCredentials {
        YoutubeCredentials {
            account_email: "creator@example.com".to_string(),
            channel_title: None,
            access_token: "token".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_expires_at: expires,
        }
    }

    #[test]
    fn test_expiry_has_a_minute_of_slack() {
        let now = Utc::now();
        assert!(creds(Some(now + Duration::seconds(30))).is_expired(now));
        assert!(!creds(Some(now + Duration::minutes(10))).is_expired(now));
        assert!(!creds(None).is_expired(now));
    }
}
