//! Progress tracking for yt-dlp downloads

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Progress snapshot parsed from one yt-dlp `[download]` line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DownloadProgress {
    /// 0.0 to 100.0
    pub percent: f64,
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    /// bytes per second
    pub speed_bps: f64,
    pub eta: Option<Duration>,
}

impl DownloadProgress {
    /// Get progress fraction (0.0 to 1.0)
    pub fn fraction(&self) -> f64 {
        (self.percent / 100.0).clamp(0.0, 1.0)
    }

    /// Parse a yt-dlp progress line.
    ///
    /// Expected format: `[download]  42.5% of ~ 150.00MiB at  5.20MiB/s ETA 00:15`
    pub fn parse_line(line: &str) -> Option<Self> {
        if !line.contains('%') || !line.trim_start().starts_with("[download]") {
            return None;
        }

        // 1. Percentage: the number right before '%'
        let pct_pos = line.find('%')?;
        let before = &line[..pct_pos];
        let num_start = before
            .char_indices()
            .rev()
            .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        let percent = before[num_start..].parse::<f64>().ok()?;

        // 2. Total size after "of" (may be approximate: "of ~ 10.5MiB")
        let total_bytes = line
            .find(" of ")
            .map(|idx| {
                let after = line[idx + 4..].trim_start().trim_start_matches('~').trim_start();
                let end = after.find(char::is_whitespace).unwrap_or(after.len());
                parse_size(&after[..end]).unwrap_or(0.0) as u64
            })
            .unwrap_or(0);

        // 3. Speed after "at", ending in "/s"
        let speed_bps = line
            .find(" at ")
            .and_then(|idx| {
                let after = line[idx + 4..].trim_start();
                let slash = after.find("/s")?;
                parse_size(after[..slash].trim())
            })
            .unwrap_or(0.0);

        // 4. ETA as [hh:]mm:ss
        let eta = line
            .find("ETA ")
            .and_then(|idx| parse_clock(line[idx + 4..].split_whitespace().next()?));

        Some(Self {
            percent,
            total_bytes,
            downloaded_bytes: (percent / 100.0 * total_bytes as f64) as u64,
            speed_bps,
            eta,
        })
    }
}

/// Parse "10.50MiB", "512KiB", "1.2GiB", "900B"
fn parse_size(token: &str) -> Option<f64> {
    let idx = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(token.len());
    if idx == 0 {
        return None;
    }
    let num = token[..idx].parse::<f64>().ok()?;
    let multiplier = match token[idx..].trim() {
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "KB" => 1000.0,
        "MB" => 1000.0 * 1000.0,
        "GB" => 1000.0 * 1000.0 * 1000.0,
        _ => 1.0,
    };
    Some(num * multiplier)
}

fn parse_clock(token: &str) -> Option<Duration> {
    let mut secs = 0u64;
    for part in token.split(':') {
        secs = secs * 60 + part.parse::<u64>().ok()?;
    }
    Some(Duration::from_secs(secs))
}
