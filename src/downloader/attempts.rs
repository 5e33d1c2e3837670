//! Attempt policies and yt-dlp argument assembly
//!
//! The retry ladder is plain data: an ordered list of [`AttemptPolicy`]
//! values, each a progressively more conservative encoder configuration.

use crate::downloader::job::DownloadJob;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output template inside the scratch directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Postprocessor that receives the attempt's ffmpeg output arguments.
///
/// The merger runs for every `video+audio` selection. yt-dlp's video
/// convertor skips files already in the target container, so encoder flags
/// handed to it would never reach ffmpeg for an mp4 merge.
pub const ENCODER_TARGET: &str = "Merger+ffmpeg_o";

/// Encoder settings for one download attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptPolicy {
    pub label: String,
    /// ffmpeg output arguments applied when the streams are merged
    pub postprocessor_args: Vec<String>,
}

impl AttemptPolicy {
    pub fn new(label: &str, args: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            postprocessor_args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Whether this policy re-encodes the video stream
    pub fn touches_video(&self) -> bool {
        self.postprocessor_args
            .iter()
            .any(|a| a.starts_with("-c:v") || a.starts_with("-profile:v") || a == "-pix_fmt")
    }
}

/// Video ladder: maximally compatible, then simpler, then audio codec only
pub fn default_ladder() -> Vec<AttemptPolicy> {
    vec![
        AttemptPolicy::new(
            "compatible",
            &[
                "-c:v", "libx264", "-profile:v", "baseline", "-level", "3.0", "-pix_fmt",
                "yuv420p", "-c:a", "aac", "-ac", "2", "-ar", "44100", "-b:a", "192k",
                "-movflags", "+faststart",
            ],
        ),
        AttemptPolicy::new(
            "simple",
            &["-c:v", "libx264", "-profile:v", "main", "-c:a", "aac"],
        ),
        AttemptPolicy::new("audio-only-aac", &["-c:a", "aac"]),
    ]
}

/// The mp3 path: a single extract-audio attempt
pub fn audio_attempt() -> AttemptPolicy {
    AttemptPolicy::new("extract-audio", &[])
}

/// Build the complete yt-dlp argument list for one attempt
pub fn build_args(
    job: &DownloadJob,
    policy: &AttemptPolicy,
    scratch_dir: &Path,
    ffmpeg: Option<&Path>,
) -> Vec<String> {
    let output = scratch_dir.join(OUTPUT_TEMPLATE).to_string_lossy().into_owned();
    let selector = job.format_selector();
    let ffmpeg = ffmpeg.map(|p| p.to_string_lossy().into_owned());

    let mut args: Vec<String> = Vec::new();
    let mut push = |items: &[&str]| args.extend(items.iter().map(|s| s.to_string()));

    push(&["-o", output.as_str()]);
    push(&[
        "--windows-filenames",
        "--restrict-filenames",
        "--no-check-certificates",
        "--prefer-free-formats",
        "--no-playlist",
        "--no-part",
        "--force-overwrites",
        "--no-mtime",
        "--newline",
        "--add-metadata",
    ]);
    push(&["-f", selector.as_str()]);

    if let Some(ffmpeg) = &ffmpeg {
        push(&["--ffmpeg-location", ffmpeg.as_str()]);
    }

    if job.container.is_audio() {
        push(&[
            "--extract-audio",
            "--audio-format",
            job.container.extension(),
            "--audio-quality",
            "0",
        ]);
    } else {
        let ext = job.container.extension();
        push(&["--merge-output-format", ext, "--remux-video", ext]);
        if !policy.postprocessor_args.is_empty() {
            let pp_args = format!("{}:{}", ENCODER_TARGET, policy.postprocessor_args.join(" "));
            push(&["--postprocessor-args", pp_args.as_str()]);
        }
    }

    push(&[job.source_url.trim()]);
    args
}
