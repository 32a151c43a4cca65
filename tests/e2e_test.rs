//! End-to-end tests against a running deployment
//!
//! These tests require:
//! 1. PostgreSQL and Redis running
//! 2. The server running (default http://localhost:5000)
//! 3. A worker running with yt-dlp and ffmpeg on its PATH
//! 4. Network access to YouTube
//!
//! Run with: cargo test --test e2e_test -- --ignored --nocapture
//!
//! Set API_BASE_URL to override the server address and E2E_VIDEO_URL to pick
//! the video used for the full pipeline run.

mod helpers;

use helpers::*;
use reqwest::StatusCode;

/// Get base URL from env or default to localhost
fn get_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

fn video_url() -> String {
    std::env::var("E2E_VIDEO_URL").unwrap_or_else(|_| "https://www.youtube.com/watch?v=8S0FDjFBj8o".to_string())
}

#[tokio::test]
#[ignore] // Requires running server, worker, and all infrastructure
async fn test_e2e_health_check() {
    let base_url = get_base_url();
    let response = client()
        .get(format!("{}/health", base_url))
        .send()
        .await
        .expect("Health check failed");

    assert!(
        response.status().is_success(),
        "Health check returned non-success status: {}",
        response.status()
    );
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["checks"]["database"]["status"], "ok");
    assert_eq!(body["checks"]["redis"]["status"], "ok");

    println!("✓ Health check passed");
}

#[tokio::test]
#[ignore]
async fn test_e2e_submission_creates_pending_job() {
    let base_url = get_base_url();
    let client = client();

    let job_id = submit_video(
        &client,
        &base_url,
        "https://www.youtube.com/watch?v=abc123",
        &[("max_shorts", "5"), ("aspect_ratio", "9:16")],
    )
    .await
    .expect("Submit failed");

    let status = job_status(&client, &base_url, job_id).await.expect("Status failed");
    assert_eq!(status.job_id, job_id);
    assert!(status.progress >= 10);

    let page = client
        .get(format!("{}/process/{}", base_url, job_id))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::OK);

    client
        .post(format!("{}/jobs/{}/delete", base_url, job_id))
        .send()
        .await
        .unwrap();
    println!("✓ Submission created job {job_id}");
}

#[tokio::test]
#[ignore]
async fn test_e2e_unknown_job_is_not_found() {
    let base_url = get_base_url();
    let client = client();
    let missing = uuid::Uuid::new_v4();

    let api = client
        .get(format!("{}/api/jobs/{}", base_url, missing))
        .send()
        .await
        .unwrap();
    assert_eq!(api.status(), StatusCode::NOT_FOUND);

    let page = client
        .get(format!("{}/results/{}", base_url, missing))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::NOT_FOUND);
    assert!(page.text().await.unwrap().contains("not found"));
}

#[tokio::test]
#[ignore] // Downloads and renders a real video; takes minutes
async fn test_e2e_full_pipeline() {
    let base_url = get_base_url();
    let client = client();

    let job_id = submit_video(
        &client,
        &base_url,
        &video_url(),
        &[
            ("max_shorts", "2"),
            ("short_duration", "15-30"),
            ("video_quality", "480p"),
            ("content_language", "english"),
        ],
    )
    .await
    .expect("Submit failed");
    println!("Submitted job {job_id}");

    let finished = poll_job_status(&client, &base_url, job_id, 900)
        .await
        .expect("Job did not finish");

    assert_eq!(
        finished.status, "completed",
        "job failed: {:?}",
        finished.error
    );
    assert!(!finished.is_error);
    assert_eq!(finished.progress, 100);
    assert!(finished.title.is_some());
    assert!((1..=2).contains(&finished.shorts_count));

    let results = client
        .get(format!("{}/results/{}", base_url, job_id))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(results.contains("/download"));

    println!("✓ Pipeline produced {} shorts", finished.shorts_count);
}

#[tokio::test]
#[ignore]
async fn test_e2e_concurrent_submissions_get_distinct_jobs() {
    let base_url = get_base_url();
    let client = client();

    let submissions = (0..3).map(|i| {
        let url = format!("https://www.youtube.com/watch?v=concurrent{i}");
        let client = &client;
        let base_url = &base_url;
        async move { submit_video(client, base_url, &url, &[("max_shorts", "1")]).await }
    });
    let results = futures::future::join_all(submissions).await;

    let mut ids = Vec::new();
    for result in results {
        match result {
            Ok(id) => ids.push(id),
            Err(e) => panic!("Concurrent submit failed: {}", e),
        }
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3, "every submission gets its own job");

    for id in &ids {
        client
            .post(format!("{}/jobs/{}/delete", base_url, id))
            .send()
            .await
            .unwrap();
    }
    println!("✓ {} concurrent submissions queued", ids.len());
}
