//! External media tools: yt-dlp for fetching, FFmpeg for cutting.

pub mod ffmpeg;
pub mod ytdlp;

use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Characters of stderr kept in error messages.
const STDERR_TAIL: usize = 600;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolNotFound(&'static str),

    #[error("{tool} exited with status {exit_code:?}: {stderr}")]
    Failed {
        tool: &'static str,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("no subtitles available for this video")]
    NoSubtitles,

    #[error("expected output file missing: {0}")]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Check that a tool is installed, returning its resolved path.
pub fn locate(tool: &'static str) -> Result<PathBuf, MediaError> {
    which::which(tool).map_err(|_| MediaError::ToolNotFound(tool))
}

/// Run a tool to completion and fail on a non-zero exit.
///
/// The child is killed if the future is dropped, so a job timeout does not
/// leave orphaned processes behind.
pub(crate) async fn run_tool(tool: &'static str, args: &[String]) -> Result<Output, MediaError> {
    let program = locate(tool)?;
    tracing::debug!("Running {} {}", tool, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::Failed {
            tool,
            exit_code: output.status.code(),
            stderr: stderr_tail(&output.stderr),
        });
    }
    Ok(output)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL {
        return text.to_string();
    }
    text.chars().skip(count - STDERR_TAIL).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_keeps_the_end() {
        let long = format!("{}ERROR: video unavailable", "x".repeat(2000));
        let tail = stderr_tail(long.as_bytes());
        assert_eq!(tail.chars().count(), STDERR_TAIL);
        assert!(tail.ends_with("ERROR: video unavailable"));
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let err = locate("definitely-not-a-real-tool-name").unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound(_)));
    }
}
