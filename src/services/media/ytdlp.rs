use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{run_tool, MediaError};
use crate::models::job::VideoQuality;

/// Metadata yt-dlp reports for a video.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub duration: Option<f64>,
}

pub fn info_args(url: &str) -> Vec<String> {
    ["--dump-single-json", "--no-playlist", "--skip-download", "--no-warnings", url]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn download_args(url: &str, quality: VideoQuality, dest_dir: &Path) -> Vec<String> {
    let template = dest_dir.join("source.%(ext)s");
    vec![
        "--no-playlist".into(),
        "--no-warnings".into(),
        "-f".into(),
        quality.ytdlp_format(),
        "--merge-output-format".into(),
        "mp4".into(),
        "-o".into(),
        template.to_string_lossy().into_owned(),
        url.into(),
    ]
}

pub fn subtitle_args(url: &str, langs: &str, dest_dir: &Path) -> Vec<String> {
    let template = dest_dir.join("subs.%(ext)s");
    vec![
        "--no-playlist".into(),
        "--no-warnings".into(),
        "--skip-download".into(),
        "--write-sub".into(),
        "--write-auto-sub".into(),
        "--sub-langs".into(),
        langs.into(),
        "--sub-format".into(),
        "vtt".into(),
        "-o".into(),
        template.to_string_lossy().into_owned(),
        url.into(),
    ]
}

pub async fn fetch_info(url: &str) -> Result<VideoInfo, MediaError> {
    let output = run_tool("yt-dlp", &info_args(url)).await?;
    Ok(serde_json::from_slice(&output.stdout)?)
}

/// Download the video into `dest_dir` and return the merged file.
pub async fn download(url: &str, quality: VideoQuality, dest_dir: &Path) -> Result<PathBuf, MediaError> {
    tokio::fs::create_dir_all(dest_dir).await?;
    run_tool("yt-dlp", &download_args(url, quality, dest_dir)).await?;

    let expected = dest_dir.join("source.mp4");
    if expected.exists() {
        return Ok(expected);
    }
    // Some formats refuse to merge into mp4 and keep their own container.
    find_file(dest_dir, |name| name.starts_with("source.") && !name.ends_with(".part"))
        .await?
        .ok_or(MediaError::MissingOutput(expected))
}

/// Fetch subtitles for the first available language of `langs` (comma separated).
pub async fn fetch_subtitles(url: &str, langs: &str, dest_dir: &Path) -> Result<PathBuf, MediaError> {
    tokio::fs::create_dir_all(dest_dir).await?;
    run_tool("yt-dlp", &subtitle_args(url, langs, dest_dir)).await?;

    for lang in langs.split(',').map(str::trim) {
        let candidate = dest_dir.join(format!("subs.{lang}.vtt"));
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    find_file(dest_dir, |name| name.starts_with("subs.") && name.ends_with(".vtt"))
        .await?
        .ok_or(MediaError::NoSubtitles)
}

async fn find_file(dir: &Path, matches: impl Fn(&str) -> bool) -> Result<Option<PathBuf>, MediaError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_str().is_some_and(&matches) {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_args_cap_quality() {
        let args = download_args("https://youtu.be/abc123", VideoQuality::P720, Path::new("/tmp/job"));
        let f = args.iter().position(|a| a == "-f").unwrap();
        assert!(args[f + 1].starts_with("bestvideo[height<=720]"));
        assert!(args.contains(&"/tmp/job/source.%(ext)s".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/abc123");
    }

    #[test]
    fn test_subtitle_args_request_vtt() {
        let args = subtitle_args("https://youtu.be/abc123", "hi,en", Path::new("/tmp/job"));
        assert!(args.contains(&"--write-auto-sub".to_string()));
        assert!(args.contains(&"--skip-download".to_string()));
        let langs = args.iter().position(|a| a == "--sub-langs").unwrap();
        assert_eq!(args[langs + 1], "hi,en");
    }

    #[test]
    fn test_video_info_tolerates_missing_fields() {
        let info: VideoInfo = serde_json::from_str(r#"{"id":"abc123","title":"Talk"}"#).unwrap();
        assert_eq!(info.title.as_deref(), Some("Talk"));
        assert!(info.duration.is_none());
    }

    #[tokio::test]
    async fn test_find_file_matches_by_name() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("subs.en.vtt"), "WEBVTT").await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "").await.unwrap();
        let found = find_file(dir.path(), |n| n.ends_with(".vtt")).await.unwrap();
        assert_eq!(found, Some(dir.path().join("subs.en.vtt")));
    }
}
