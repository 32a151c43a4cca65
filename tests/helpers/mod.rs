//! Test helper utilities for E2E testing

use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

/// Response from GET /api/jobs/{job_id}
#[derive(Debug, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: String,
    pub progress: u8,
    pub is_error: bool,
    pub error: Option<String>,
    pub title: Option<String>,
    pub shorts_count: i64,
}

/// A client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .expect("Failed to build HTTP client")
}

/// Submit the home page form and return the new job's ID from the redirect.
pub async fn submit_video(
    client: &reqwest::Client,
    base_url: &str,
    youtube_url: &str,
    extra: &[(&str, &str)],
) -> Result<Uuid, Box<dyn std::error::Error>> {
    let mut form = vec![("youtube_url", youtube_url)];
    form.extend_from_slice(extra);

    let response = client
        .post(format!("{}/submit", base_url))
        .form(&form)
        .send()
        .await?;

    if response.status() != StatusCode::SEE_OTHER {
        return Err(format!("Submit returned {}", response.status()).into());
    }
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .ok_or("Submit response has no Location header")?
        .to_str()?;
    let id = location
        .strip_prefix("/process/")
        .ok_or_else(|| format!("Unexpected redirect target: {location}"))?;
    Ok(id.parse()?)
}

pub async fn job_status(
    client: &reqwest::Client,
    base_url: &str,
    job_id: Uuid,
) -> Result<JobStatusResponse, Box<dyn std::error::Error>> {
    let response = client
        .get(format!("{}/api/jobs/{}", base_url, job_id))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(format!("Status check failed: {}", response.status()).into());
    }
    Ok(response.json::<JobStatusResponse>().await?)
}

/// Poll job status until completed or failed (with timeout).
///
/// Progress must never go backwards while polling.
pub async fn poll_job_status(
    client: &reqwest::Client,
    base_url: &str,
    job_id: Uuid,
    timeout_secs: u64,
) -> Result<JobStatusResponse, Box<dyn std::error::Error>> {
    let max_attempts = timeout_secs / 2;
    let mut last_progress = 0;

    for attempt in 0..max_attempts {
        let status = job_status(client, base_url, job_id).await?;
        if status.progress < last_progress {
            return Err(format!(
                "Progress went backwards: {} -> {} ({})",
                last_progress, status.progress, status.status
            )
            .into());
        }
        last_progress = status.progress;

        match status.status.as_str() {
            "completed" | "failed" => return Ok(status),
            _ => {
                if attempt % 15 == 0 && attempt > 0 {
                    println!("  ... {} at {}% (attempt {}/{})", status.status, status.progress, attempt, max_attempts);
                }
                sleep(Duration::from_secs(2)).await;
            }
        }
    }

    Err(format!("Job did not finish within {} seconds", timeout_secs).into())
}
