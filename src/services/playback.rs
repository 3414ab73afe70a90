//! Host playback metadata access.
//!
//! The host player hands over playback data as loosely typed JSON: fields may
//! be missing, renamed, or hold unexpected shapes depending on which source
//! plugin produced them. Everything here reads tolerantly: absence or a wrong
//! shape yields `None`, never an error.

use crate::services::media::SubtitleTrack;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Season/episode coordinates of the currently playing item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    pub season: u32,
    pub episode: u32,
    #[serde(default)]
    pub title: Option<String>,
}

/// Snapshot of the navigational context a download was initiated from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackContext {
    pub card_title: Option<String>,
    pub episode: Option<EpisodeRef>,
}

/// Read-only view over the host's playback metadata snapshot.
pub struct PlaybackMetadata {
    raw: Value,
}

impl PlaybackMetadata {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn empty() -> Self {
        Self { raw: Value::Null }
    }

    /// Direct playback URL, when the host exposes one.
    pub fn direct_url(&self) -> Option<&str> {
        self.raw["url"].as_str().filter(|u| u.starts_with("http"))
    }

    /// Source URL of the playing media element, when the host mirrors it into
    /// the snapshot. Last-resort fallback for resolution.
    pub fn element_source(&self) -> Option<&str> {
        self.raw["src"].as_str().filter(|u| u.starts_with("http"))
    }

    /// Structured `label → url` quality map.
    pub fn quality_map(&self) -> Option<Vec<(String, String)>> {
        let map = self.raw["quality"].as_object()?;
        let entries: Vec<(String, String)> = map
            .iter()
            .filter_map(|(label, value)| {
                value
                    .as_str()
                    .filter(|u| u.starts_with("http"))
                    .map(|u| (label.clone(), u.to_string()))
            })
            .collect();
        if entries.is_empty() {
            None
        } else {
            Some(entries)
        }
    }

    /// Generic URL list field, each entry a URL string or quality-keyed map.
    pub fn urls(&self) -> Option<&Vec<Value>> {
        self.raw["urls"].as_array()
    }

    /// Playlist entries, when the source exposes one item per quality.
    pub fn playlist(&self) -> Option<&Vec<Value>> {
        self.raw["playlist"].as_array()
    }

    /// Episode info under the field aliases different source plugins use.
    /// When only one of season/episode is present the other defaults to 1.
    pub fn episode(&self) -> Option<EpisodeRef> {
        let season = self.first_u64(&["season", "s", "seas"]);
        let episode = self.first_u64(&["episode", "e", "ep", "seria"]);
        if season.is_none() && episode.is_none() {
            return None;
        }
        let title = self
            .first_str(&["title", "episode_title", "name"])
            .map(|s| s.to_string());
        Some(EpisodeRef {
            season: season.unwrap_or(1) as u32,
            episode: episode.unwrap_or(1) as u32,
            title,
        })
    }

    /// Subtitle tracks, merged from the three shapes hosts are known to use:
    /// a `subtitles` array, a `subtitle` object of `lang → url`, and a
    /// `tracks` array filtered to `kind == "subtitles"`.
    pub fn subtitles(&self) -> Vec<SubtitleTrack> {
        let mut tracks = Vec::new();

        if let Some(subs) = self.raw["subtitles"].as_array() {
            for (i, sub) in subs.iter().enumerate() {
                if let Some(url) = sub["url"].as_str().filter(|u| u.starts_with("http")) {
                    let lang = sub["language"]
                        .as_str()
                        .or_else(|| sub["lang"].as_str())
                        .unwrap_or("");
                    let label = sub["label"]
                        .as_str()
                        .or_else(|| sub["language"].as_str())
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| format!("Subtitle {}", i + 1));
                    tracks.push(SubtitleTrack {
                        url: url.to_string(),
                        label,
                        lang: lang.to_string(),
                    });
                }
            }
        }

        if let Some(map) = self.raw["subtitle"].as_object() {
            for (lang, value) in map {
                if let Some(url) = value.as_str().filter(|u| u.starts_with("http")) {
                    tracks.push(SubtitleTrack {
                        url: url.to_string(),
                        label: lang.clone(),
                        lang: lang.clone(),
                    });
                }
            }
        }

        if let Some(entries) = self.raw["tracks"].as_array() {
            for entry in entries {
                if entry["kind"].as_str() != Some("subtitles") {
                    continue;
                }
                if let Some(url) = entry["url"].as_str().filter(|u| u.starts_with("http")) {
                    let lang = entry["language"].as_str().unwrap_or("");
                    let label = entry["label"]
                        .as_str()
                        .or_else(|| entry["language"].as_str())
                        .unwrap_or("Subtitle");
                    tracks.push(SubtitleTrack {
                        url: url.to_string(),
                        label: label.to_string(),
                        lang: lang.to_string(),
                    });
                }
            }
        }

        tracks
    }

    fn first_u64(&self, keys: &[&str]) -> Option<u64> {
        keys.iter().find_map(|k| self.raw[*k].as_u64())
    }

    fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.raw[*k].as_str())
    }
}

/// Last-write-wins snapshot of the host's navigation context.
///
/// Fed by the host whenever a new card/activity becomes active; no history is
/// kept.
pub struct ContextTracker {
    current: PlaybackContext,
    series: bool,
}

impl ContextTracker {
    pub fn new() -> Self {
        Self {
            current: PlaybackContext::default(),
            series: false,
        }
    }

    /// Host navigation event. Only updates when the new activity actually
    /// carries a card title; `season_count > 1` marks a multi-episode work.
    pub fn on_activity_changed(
        &mut self,
        card_title: Option<String>,
        season_count: Option<u32>,
        episode: Option<EpisodeRef>,
    ) {
        if card_title.is_none() {
            return;
        }
        self.series = season_count.map(|n| n > 1).unwrap_or(false);
        self.current = PlaybackContext {
            card_title,
            episode,
        };
        log::debug!(
            "Context updated: {:?} (series: {})",
            self.current.card_title,
            self.series
        );
    }

    pub fn snapshot(&self) -> PlaybackContext {
        self.current.clone()
    }

    /// Whether the active context denotes a multi-episode work.
    pub fn is_series(&self) -> bool {
        self.series
    }
}

impl Default for ContextTracker {
    fn default() -> Self {
        Self::new()
    }
}
