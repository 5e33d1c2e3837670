//! Data structures for video information

use crate::formats::StreamVariant;
use serde::{Deserialize, Serialize};

/// Raw `yt-dlp --dump-single-json` document (only the fields we read)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawVideoInfo {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub upload_date: Option<String>,
    pub uploader: Option<String>,
    pub uploader_url: Option<String>,
    pub channel_url: Option<String>,
    pub thumbnail: Option<String>,
    pub thumbnails: Vec<RawThumbnail>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub duration: Option<f64>,
    pub formats: Vec<RawFormat>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawThumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Raw format entry; every field may be missing or null
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawFormat {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub height: Option<u32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub tbr: Option<f64>,
    pub vbr: Option<f64>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    pub format_note: Option<String>,
}

impl From<&RawFormat> for StreamVariant {
    fn from(raw: &RawFormat) -> Self {
        let normalize = |codec: &Option<String>| {
            codec
                .as_deref()
                .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("none"))
                .map(str::to_string)
        };
        StreamVariant {
            format_id: raw.format_id.clone().unwrap_or_default(),
            height_px: raw.height,
            video_codec: normalize(&raw.vcodec),
            audio_codec: normalize(&raw.acodec),
            total_bitrate_kbps: raw.tbr.unwrap_or(0.0),
            video_bitrate_kbps: raw.vbr.unwrap_or(0.0),
            container_ext: raw.ext.clone().unwrap_or_default(),
            file_size_bytes: raw.filesize.or(raw.filesize_approx).unwrap_or(0),
            format_note: raw.format_note.clone(),
        }
    }
}

/// Metadata shown before downloading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VideoDetails {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<String>,
    pub channel_title: Option<String>,
    pub channel_url: Option<String>,
    pub thumbnail: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    /// Seconds
    pub duration: Option<u64>,
    pub variants: Vec<StreamVariant>,
}

impl From<RawVideoInfo> for VideoDetails {
    fn from(raw: RawVideoInfo) -> Self {
        // Largest thumbnail by area; the first one wins a tie
        let best_thumbnail = raw
            .thumbnails
            .iter()
            .filter(|t| !t.url.is_empty())
            .fold(None::<&RawThumbnail>, |best, current| {
                let area = |t: &RawThumbnail| {
                    u64::from(t.width.unwrap_or(0)) * u64::from(t.height.unwrap_or(0))
                };
                match best {
                    Some(b) if area(current) <= area(b) => Some(b),
                    _ => Some(current),
                }
            })
            .map(|t| t.url.clone());

        VideoDetails {
            variants: raw.formats.iter().map(StreamVariant::from).collect(),
            id: raw.id,
            title: raw.title,
            description: raw.description,
            published_at: raw.upload_date,
            channel_title: raw.uploader,
            channel_url: raw.uploader_url.or(raw.channel_url),
            thumbnail: best_thumbnail.or(raw.thumbnail),
            view_count: raw.view_count,
            like_count: raw.like_count,
            duration: raw.duration.map(|d| d.max(0.0).round() as u64),
        }
    }
}
