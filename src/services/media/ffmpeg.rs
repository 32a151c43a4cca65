use std::path::{Path, PathBuf};

use super::{run_tool, MediaError};
use crate::models::job::{AspectRatio, VideoQuality};

/// Builder for FFmpeg invocations.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments placed before `-i`
    input_args: Vec<String>,
    /// Arguments placed after `-i`
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Input seek, fast and frame-accurate since FFmpeg 2.1.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{seconds:.3}"))
    }

    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{seconds:.3}"))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn video_codec(self, codec: &str) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: &str) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn preset(self, preset: &str) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    pub fn audio_bitrate(self, bitrate: &str) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), "error".to_string()];
        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    pub async fn run(&self) -> Result<(), MediaError> {
        run_tool("ffmpeg", &self.build_args()).await?;
        if !self.output.exists() {
            return Err(MediaError::MissingOutput(self.output.clone()));
        }
        Ok(())
    }
}

/// Centre crop to the target ratio, then scale to the quality's frame size.
///
/// The crop box is the largest centred rectangle of the requested ratio that
/// fits the source, rounded down to even dimensions.
pub fn centre_crop_filter(ratio: AspectRatio, quality: VideoQuality) -> String {
    let (w, h) = ratio.terms();
    let (out_w, out_h) = ratio.frame_size(quality);
    format!(
        "crop=trunc(min(iw\\,ih*{w}/{h})/2)*2:trunc(min(ih\\,iw*{h}/{w})/2)*2,\
         scale={out_w}:{out_h},setsar=1"
    )
}

/// Cut `[start, end)` out of `source` into a cropped H.264/AAC clip.
pub async fn cut_short(
    source: &Path,
    output: &Path,
    start: f64,
    end: f64,
    ratio: AspectRatio,
    quality: VideoQuality,
) -> Result<(), MediaError> {
    short_command(source, output, start, end, ratio, quality).run().await
}

fn short_command(
    source: &Path,
    output: &Path,
    start: f64,
    end: f64,
    ratio: AspectRatio,
    quality: VideoQuality,
) -> FfmpegCommand {
    FfmpegCommand::new(source, output)
        .seek(start)
        .duration((end - start).max(0.0))
        .video_filter(centre_crop_filter(ratio, quality))
        .video_codec("libx264")
        .preset("veryfast")
        .crf(23)
        .audio_codec("aac")
        .audio_bitrate("128k")
        .output_arg("-movflags")
        .output_arg("+faststart")
}

/// Grab one JPEG frame `at` seconds into the clip.
pub async fn thumbnail(video: &Path, output: &Path, at: f64) -> Result<(), MediaError> {
    FfmpegCommand::new(video, output)
        .seek(at)
        .single_frame()
        .output_arg("-q:v")
        .output_arg("3")
        .run()
        .await
}
