//! Stream variants and resolved formats

use serde::{Deserialize, Serialize};

/// One downloadable stream option returned by the metadata lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StreamVariant {
    pub format_id: String,
    /// None for audio-only variants
    pub height_px: Option<u32>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub total_bitrate_kbps: f64,
    pub video_bitrate_kbps: f64,
    pub container_ext: String,
    /// 0 when unknown
    pub file_size_bytes: u64,
    pub format_note: Option<String>,
}

impl StreamVariant {
    pub fn has_audio(&self) -> bool {
        codec_present(self.audio_codec.as_deref())
    }

    pub fn has_video(&self) -> bool {
        codec_present(self.video_codec.as_deref())
    }

    /// No resolution and no video stream
    pub fn is_audio_only(&self) -> bool {
        self.height_px.is_none() && !self.has_video()
    }

    /// Storyboard image tracks are not downloadable media
    pub fn is_storyboard(&self) -> bool {
        self.format_id.starts_with("sb") || self.container_ext == "mhtml"
    }
}

/// The single best variant chosen per resolution bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFormat {
    pub format_id: String,
    pub height_px: Option<u32>,
    /// "720p" for video, the audio bucket label otherwise
    pub quality_label: String,
    pub container_ext: String,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub has_audio: bool,
    pub file_size_bytes: u64,
}

impl ResolvedFormat {
    pub fn is_audio_only(&self) -> bool {
        self.height_px.is_none()
    }

    /// yt-dlp selector for this choice.
    ///
    /// Video-only variants get the best audio track merged in.
    pub fn selector(&self) -> String {
        selector_for(&self.format_id, self.has_audio)
    }
}

/// Selector for an explicitly chosen format id.
///
/// Streams that already carry audio are taken as they are; anything else has
/// the best audio track merged in, falling back to the bare id.
pub fn selector_for(format_id: &str, has_audio: bool) -> String {
    if has_audio {
        format_id.to_string()
    } else {
        format!("{id}+bestaudio/{id}", id = format_id)
    }
}

pub(crate) fn codec_present(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if !c.is_empty() && !c.eq_ignore_ascii_case("none"))
}
