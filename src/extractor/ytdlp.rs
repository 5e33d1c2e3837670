//! yt-dlp wrapper for metadata probing
//!
//! Runs `yt-dlp --dump-single-json` and converts its output into
//! [`VideoDetails`]. The binary is located through [`BinaryLocator::ytdlp`],
//! which covers bundled copies as well as system installs.

use crate::extractor::models::{RawVideoInfo, VideoDetails};
use crate::extractor::traits::Extractor;
use crate::utils::bundle_paths::BinaryLocator;
use crate::utils::error::AspError;
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info};

/// Metadata extractor backed by yt-dlp
pub struct YtDlpExtractor {
    ytdlp_path: PathBuf,
}

impl YtDlpExtractor {
    /// Locate yt-dlp and build an extractor around it
    pub fn new() -> Result<Self> {
        let ytdlp_path = match BinaryLocator::ytdlp().locate() {
            Some(path) => {
                info!("Found yt-dlp at: {}", path.display());
                path
            }
            None => {
                error!("yt-dlp not found anywhere!");
                return Err(AspError::YtDlpNotFound.into());
            }
        };

        Ok(Self { ytdlp_path })
    }

    /// Use an explicit yt-dlp binary
    pub fn with_path(ytdlp_path: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
        }
    }

    /// Get the path to yt-dlp being used
    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp_path
    }

    /// Arguments for a metadata-only lookup
    pub fn metadata_args(url: &str) -> Vec<String> {
        [
            "--dump-single-json",
            "--no-check-certificates",
            "--no-warnings",
            "--prefer-free-formats",
            "--no-playlist",
            url,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn id(&self) -> &'static str {
        "ytdlp"
    }

    async fn extract_info(&self, url: &str) -> Result<VideoDetails> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AspError::InvalidUrl("URL is empty".to_string()).into());
        }
        debug!("Extracting video info for URL: {}", url);

        let output = AsyncCommand::new(&self.ytdlp_path)
            .args(Self::metadata_args(url))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => AspError::YtDlpNotFound,
                _ => AspError::Spawn {
                    program: self.ytdlp_path.display().to_string(),
                    source,
                },
            })?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp extraction failed: {}", error_msg);
            return Err(AspError::ExtractionError(error_msg.trim().to_string()).into());
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        parse_video_details(&json_str)
    }
}

/// Parse a `--dump-single-json` document
pub fn parse_video_details(json: &str) -> Result<VideoDetails> {
    let raw: RawVideoInfo = serde_json::from_str(json).map_err(AspError::from)?;
    Ok(VideoDetails::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::resolve_formats;

    const SAMPLE: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "title": "Sample Video",
        "description": "desc",
        "upload_date": "20091025",
        "uploader": "Channel",
        "uploader_url": "https://www.youtube.com/@channel",
        "thumbnail": "https://i.ytimg.com/fallback.jpg",
        "thumbnails": [
            {"url": "https://i.ytimg.com/small.jpg", "width": 120, "height": 90},
            {"url": "https://i.ytimg.com/max.jpg", "width": 1280, "height": 720},
            {"url": "https://i.ytimg.com/nosize.jpg"}
        ],
        "view_count": 1000,
        "like_count": 10,
        "duration": 212.4,
        "formats": [
            {"format_id": "sb0", "ext": "mhtml", "height": 90, "vcodec": "none", "acodec": "none"},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "tbr": 129.5, "format_note": "medium", "filesize": 3400000},
            {"format_id": "137", "ext": "mp4", "height": 1080, "vcodec": "avc1.640028", "acodec": "none", "tbr": 4400.1, "vbr": 4400.1, "filesize_approx": 90000000},
            {"format_id": "22", "ext": "mp4", "height": 720, "vcodec": "avc1.64001F", "acodec": "mp4a.40.2", "tbr": 1200, "vbr": null},
            {"format_id": "136", "ext": "mp4", "height": 720, "vcodec": "avc1.4d401f", "acodec": "none", "tbr": 2300}
        ]
    }"#;

    #[test]
    fn test_parse_video_details() {
        let details = parse_video_details(SAMPLE).unwrap();
        assert_eq!(details.title, "Sample Video");
        assert_eq!(details.published_at.as_deref(), Some("20091025"));
        assert_eq!(details.channel_title.as_deref(), Some("Channel"));
        assert_eq!(details.thumbnail.as_deref(), Some("https://i.ytimg.com/max.jpg"));
        assert_eq!(details.duration, Some(212));
        assert_eq!(details.variants.len(), 5);

        let audio = &details.variants[1];
        assert_eq!(audio.video_codec, None, "\"none\" normalizes to absent");
        assert_eq!(audio.file_size_bytes, 3_400_000);
        assert_eq!(details.variants[2].file_size_bytes, 90_000_000);
        assert_eq!(details.variants[3].video_bitrate_kbps, 0.0);
    }

    #[test]
    fn test_parsed_variants_resolve() {
        let details = parse_video_details(SAMPLE).unwrap();
        let resolved = resolve_formats(&details.variants);
        let ids: Vec<_> = resolved.iter().map(|f| f.format_id.as_str()).collect();
        // 720p: combined stream 22 beats higher-bitrate video-only 136
        assert_eq!(ids, vec!["137", "22", "140"]);
        assert_eq!(resolved[2].quality_label, "medium");
    }

    #[test]
    fn test_thumbnail_fallback() {
        let details =
            parse_video_details(r#"{"title": "t", "thumbnail": "https://x/t.jpg"}"#).unwrap();
        assert_eq!(details.thumbnail.as_deref(), Some("https://x/t.jpg"));
        assert!(details.variants.is_empty());
    }

    #[test]
    fn test_invalid_json_is_error() {
        let err = parse_video_details("not json").unwrap_err();
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_metadata_args() {
        let args = YtDlpExtractor::metadata_args("https://youtu.be/x");
        assert_eq!(args.first().map(String::as_str), Some("--dump-single-json"));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/x"));
        assert!(args.contains(&"--no-check-certificates".to_string()));
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let extractor = YtDlpExtractor::with_path("/nonexistent/yt-dlp");
        let err = extractor.extract_info("   ").await.unwrap_err();
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[tokio::test]
    async fn test_missing_binary_reports_not_found() {
        let extractor = YtDlpExtractor::with_path("/nonexistent/yt-dlp");
        let err = extractor.extract_info("https://youtu.be/x").await.unwrap_err();
        assert!(err.to_string().contains("yt-dlp not found"));
    }
}
