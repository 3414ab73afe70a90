//! Download filename derivation.
//!
//! Filenames combine the card title, an `SxxEyy` episode code and the
//! normalized quality label. Derivation is deterministic for fixed inputs;
//! the queue's duplicate policy and host display both rely on that.

use crate::services::config::EpisodePolicy;
use crate::services::playback::{EpisodeRef, PlaybackContext, PlaybackMetadata};
use crate::services::quality;
use regex::Regex;

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Build the sanitized filename. Never empty; falls back to `"video"`.
pub fn derive_filename(
    quality_label: Option<&str>,
    context: &PlaybackContext,
    episode: Option<&EpisodeRef>,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(title) = context.card_title.as_deref().filter(|t| !t.is_empty()) {
        parts.push(title.to_string());
    }

    if let Some(ep) = episode {
        parts.push(format!("S{:02}E{:02}", ep.season, ep.episode));
        if let Some(ep_title) = ep.title.as_deref().filter(|t| !t.is_empty()) {
            if context.card_title.as_deref() != Some(ep_title) {
                parts.push(ep_title.to_string());
            }
        }
    }

    if let Some(q) = quality::normalize(quality_label) {
        parts.push(q);
    }

    let joined: String = parts
        .join(" - ")
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c))
        .collect();
    let trimmed = joined.trim();

    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Subtitle filename: the base name without a quality label, plus the track
/// label.
pub fn subtitle_filename(
    context: &PlaybackContext,
    episode: Option<&EpisodeRef>,
    label: &str,
) -> String {
    format!("{} - {}", derive_filename(None, context, episode), label)
}

/// Resolve episode info through the ordered fallback chain: explicit override,
/// live playback metadata, the active context when it denotes a multi-episode
/// work, then an `SxxEyy` pattern in the stream URL. When nothing resolves the
/// configured policy decides between omitting the code and `S01E01`.
pub fn resolve_episode(
    explicit: Option<EpisodeRef>,
    metadata: &PlaybackMetadata,
    context: &PlaybackContext,
    context_is_series: bool,
    url: Option<&str>,
    policy: EpisodePolicy,
) -> Option<EpisodeRef> {
    if let Some(ep) = explicit {
        return Some(ep);
    }
    if let Some(ep) = metadata.episode() {
        return Some(ep);
    }
    if context_is_series {
        if let Some(ep) = context.episode.clone() {
            return Some(ep);
        }
    }
    if let Some(ep) = url.and_then(episode_from_url) {
        return Some(ep);
    }
    match policy {
        EpisodePolicy::Omit => None,
        EpisodePolicy::DefaultToFirst => Some(EpisodeRef {
            season: 1,
            episode: 1,
            title: None,
        }),
    }
}

/// Extract `SxxEyy` coordinates from a URL.
pub fn episode_from_url(url: &str) -> Option<EpisodeRef> {
    let re = Regex::new(r"[sS](\d{1,2})[eE](\d{1,2})").unwrap();
    let caps = re.captures(url)?;
    Some(EpisodeRef {
        season: caps[1].parse().ok()?,
        episode: caps[2].parse().ok()?,
        title: None,
    })
}
