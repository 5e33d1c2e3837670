//! Format resolution
//!
//! Turns the noisy, duplicated variant list of a video into one selectable
//! option per resolution (plus one per audio-only quality label).

use crate::formats::models::{codec_present, ResolvedFormat, StreamVariant};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

const DEFAULT_AUDIO_LABEL: &str = "audio";

/// Audio codec preference: AAC > MP3 > Opus > anything else > nothing
pub fn audio_codec_score(codec: Option<&str>) -> u8 {
    if !codec_present(codec) {
        return 0;
    }
    let codec = codec.unwrap_or_default().to_ascii_lowercase();
    if codec.starts_with("mp4a") || codec.starts_with("aac") {
        4
    } else if codec.starts_with("mp3") {
        3
    } else if codec.starts_with("opus") {
        2
    } else {
        1
    }
}

/// Ranking tuple, compared lexicographically (higher is better)
#[derive(Debug, Clone, Copy)]
struct RankKey {
    audio_score: u8,
    has_audio: bool,
    total_bitrate: f64,
    video_bitrate: f64,
    file_size: u64,
}

impl RankKey {
    fn of(variant: &StreamVariant) -> Self {
        Self {
            audio_score: audio_codec_score(variant.audio_codec.as_deref()),
            has_audio: variant.has_audio(),
            total_bitrate: variant.total_bitrate_kbps,
            video_bitrate: variant.video_bitrate_kbps,
            file_size: variant.file_size_bytes,
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        self.audio_score
            .cmp(&other.audio_score)
            .then(self.has_audio.cmp(&other.has_audio))
            .then(self.total_bitrate.total_cmp(&other.total_bitrate))
            .then(self.video_bitrate.total_cmp(&other.video_bitrate))
            .then(self.file_size.cmp(&other.file_size))
    }
}

/// Pick the best variant of a bucket; on a full tie the earliest one wins
fn pick_best<'a>(bucket: &[&'a StreamVariant]) -> Option<&'a StreamVariant> {
    let mut best: Option<(&StreamVariant, RankKey)> = None;
    for &variant in bucket {
        let key = RankKey::of(variant);
        match best {
            Some((_, best_key)) if key.cmp(&best_key) != Ordering::Greater => {}
            _ => best = Some((variant, key)),
        }
    }
    best.map(|(variant, _)| variant)
}

fn audio_label(variant: &StreamVariant) -> String {
    variant
        .format_note
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .unwrap_or(DEFAULT_AUDIO_LABEL)
        .to_string()
}

fn to_resolved(variant: &StreamVariant, quality_label: String) -> ResolvedFormat {
    ResolvedFormat {
        format_id: variant.format_id.clone(),
        height_px: variant.height_px,
        quality_label,
        container_ext: variant.container_ext.clone(),
        video_codec: variant.video_codec.clone(),
        audio_codec: variant.audio_codec.clone(),
        has_audio: variant.has_audio(),
        file_size_bytes: variant.file_size_bytes,
    }
}

/// Resolve a video's variants into one format per height bucket.
///
/// Video entries come first, sorted by height descending; audio-only entries
/// follow in the order their label first appeared.
pub fn resolve_formats(variants: &[StreamVariant]) -> Vec<ResolvedFormat> {
    let mut video_buckets: BTreeMap<u32, Vec<&StreamVariant>> = BTreeMap::new();
    let mut audio_buckets: Vec<(String, Vec<&StreamVariant>)> = Vec::new();

    for variant in variants {
        if variant.is_storyboard() {
            continue;
        }
        if let Some(height) = variant.height_px {
            video_buckets.entry(height).or_default().push(variant);
        } else if variant.is_audio_only() {
            let label = audio_label(variant);
            match audio_buckets.iter_mut().find(|(l, _)| *l == label) {
                Some((_, bucket)) => bucket.push(variant),
                None => audio_buckets.push((label, vec![variant])),
            }
        } else {
            debug!(
                "Skipping variant {} with video but no height",
                variant.format_id
            );
        }
    }

    let mut resolved = Vec::with_capacity(video_buckets.len() + audio_buckets.len());

    for (height, bucket) in video_buckets.iter().rev() {
        if let Some(best) = pick_best(bucket) {
            resolved.push(to_resolved(best, format!("{}p", height)));
        }
    }

    for (label, bucket) in audio_buckets {
        if let Some(best) = pick_best(&bucket) {
            resolved.push(to_resolved(best, label));
        }
    }

    debug!(
        "Resolved {} variants into {} formats",
        variants.len(),
        resolved.len()
    );
    resolved
}
