use reqwest::Client;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "KeepAlive/1.0";

/// Ping `url` forever on a fixed interval so free-tier hosts do not idle out.
pub async fn run(url: String, interval: Duration) {
    let client = match Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Keep-alive disabled: cannot build HTTP client");
            return;
        }
    };

    tracing::info!(%url, interval_secs = interval.as_secs(), "Keep-alive started");
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it while the server is still booting.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        ping(&client, &url).await;
    }
}

async fn ping(client: &Client, url: &str) {
    match client.get(url).send().await {
        Ok(response) if response.status().is_success() => {
            tracing::info!(%url, status = response.status().as_u16(), "Keep-alive ping ok");
        }
        Ok(response) => {
            tracing::warn!(%url, status = response.status().as_u16(), "Keep-alive ping returned an error status");
        }
        Err(e) => tracing::warn!(%url, error = %e, "Keep-alive ping failed"),
    }
}
