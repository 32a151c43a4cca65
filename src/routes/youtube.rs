use axum::extract::{Query, State};
use axum::response::Redirect;
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::app_state::AppState;
use crate::services::credentials;
use crate::services::session::Flash;
use crate::services::youtube::YoutubeClient;

/// GET /youtube/auth: send the browser to Google's consent screen.
pub async fn auth(State(state): State<AppState>, cookies: Cookies) -> Redirect {
    let Some(youtube) = state.youtube.as_deref() else {
        Flash::YoutubeNotConfigured.set(&cookies);
        return Redirect::to("/");
    };

    let url = state
        .sessions
        .begin_oauth(&cookies)
        .map_err(|e| e.to_string())
        .and_then(|oauth_state| youtube.authorize_url(&oauth_state).map_err(|e| e.to_string()));
    match url {
        Ok(url) => Redirect::to(url.as_str()),
        Err(e) => {
            tracing::error!(error = %e, "Could not build OAuth consent URL");
            Flash::YoutubeAuthFailed.set(&cookies);
            Redirect::to("/")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /youtube/callback: finish the consent flow and remember the account.
pub async fn callback(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let Some(youtube) = state.youtube.as_deref() else {
        Flash::YoutubeNotConfigured.set(&cookies);
        return Redirect::to("/");
    };

    match connect(&state, youtube, &cookies, params).await {
        Ok(email) => {
            tracing::info!(account = %email, "YouTube account connected");
            Flash::YoutubeConnected.set(&cookies);
        }
        Err(reason) => {
            tracing::warn!(%reason, "YouTube authorization failed");
            Flash::YoutubeAuthFailed.set(&cookies);
        }
    }
    Redirect::to("/")
}

async fn connect(
    state: &AppState,
    youtube: &YoutubeClient,
    cookies: &Cookies,
    params: CallbackParams,
) -> Result<String, String> {
    if let Some(error) = params.error {
        return Err(format!("consent denied: {error}"));
    }
    let oauth_state = params.state.ok_or("missing state")?;
    state
        .sessions
        .finish_oauth(cookies, &oauth_state)
        .map_err(|e| format!("bad state: {e}"))?;
    let code = params.code.ok_or("missing code")?;

    let grant = youtube.exchange_code(&code).await.map_err(|e| e.to_string())?;
    let email = youtube
        .user_email(&grant.access_token)
        .await
        .map_err(|e| e.to_string())?;
    let channel = match youtube.channel_title(&grant.access_token).await {
        Ok(channel) => channel,
        Err(e) => {
            tracing::warn!(account = %email, error = %e, "Could not read channel title");
            None
        }
    };

    credentials::save_grant(&state.db, &state.cipher, &email, channel.as_deref(), &grant)
        .await
        .map_err(|e| e.to_string())?;
    state
        .sessions
        .start(cookies, &email, channel.as_deref())
        .map_err(|e| e.to_string())?;
    Ok(email)
}

/// POST /youtube/disconnect: forget the connection in this browser.
pub async fn disconnect(State(state): State<AppState>, cookies: Cookies) -> Redirect {
    state.sessions.end(&cookies);
    Flash::YoutubeDisconnected.set(&cookies);
    Redirect::to("/")
}
