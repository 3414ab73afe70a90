//! Shared media domain types.

use serde::{Deserialize, Serialize};

/// One independently downloadable rendition of the current media asset.
///
/// Identity is the URL (exact string match). A resolution pass always builds a
/// fresh set; streams are never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub url: String,
    /// Human-readable quality label ("1080p", "720kbps", "Default", ...).
    pub quality: String,
    /// Declared bandwidth in bits per second, 0 when unknown.
    pub bandwidth: u64,
}

/// What kind of payload a dispatch targets; decides the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Video,
    Subtitle,
}

/// A subtitle track advertised by the host's playback metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    pub url: String,
    pub label: String,
    pub lang: String,
}

/// Whether a URL denotes an adaptive (HLS) playlist rather than a single
/// media file. Such URLs are never size-probed and download as `.m3u8`.
pub fn is_manifest_url(url: &str) -> bool {
    url.contains(".m3u8")
}

/// Subtitle extension sniffed from the track URL.
pub fn subtitle_extension(url: &str) -> &'static str {
    if url.contains(".srt") {
        ".srt"
    } else if url.contains(".ass") {
        ".ass"
    } else {
        ".vtt"
    }
}

/// Human-readable base-1024 size, one decimal ("1.5 MB").
/// Empty for 0, the "unknown size" sentinel.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return String::new();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let exponent = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    format!(
        "{:.1} {}",
        bytes as f64 / 1024_f64.powi(exponent as i32),
        UNITS[exponent]
    )
}
