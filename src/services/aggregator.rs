//! Stream aggregation.
//!
//! Builds the candidate set for the current playback by walking a fixed
//! priority order of extraction strategies over the host's metadata, expanding
//! adaptive manifests, and folding in candidates harvested from host menus.
//! The same physical stream never appears twice: every step appends only URLs
//! not already present, so the first-seen position wins.

use crate::services::manifest::ManifestResolver;
use crate::services::media::Stream;
use crate::services::playback::PlaybackMetadata;
use crate::services::quality;
use serde_json::Value;

// --- Passive candidate observer ---

/// A menu item surfaced by the host that may carry a lazy file resolver.
pub struct MenuCandidate {
    pub title: Option<String>,
    /// Deferred resolution supplied by the source plugin; may return a direct
    /// URL string or a quality-keyed map, and may fail.
    pub resolve: Box<dyn Fn() -> std::result::Result<Value, String> + Send + Sync>,
}

/// Collects download candidates from menus the host builds for unrelated
/// purposes. The host calls [`on_candidate_menu_shown`] whenever it is about
/// to display a selection menu; only the most recent menu's harvest is kept.
///
/// [`on_candidate_menu_shown`]: CandidateObserver::on_candidate_menu_shown
pub struct CandidateObserver {
    captured: Vec<Stream>,
}

impl CandidateObserver {
    pub fn new() -> Self {
        Self {
            captured: Vec::new(),
        }
    }

    /// Harvest streams from a menu. A failing resolver contributes nothing
    /// and is never propagated.
    pub fn on_candidate_menu_shown(&mut self, items: &[MenuCandidate]) {
        self.captured.clear();
        for item in items {
            match (item.resolve)() {
                Ok(value) => {
                    let streams = sniff_stream_value(&value, item.title.as_deref());
                    self.captured.extend(streams);
                }
                Err(e) => {
                    log::debug!("Menu candidate resolver failed: {}", e);
                }
            }
        }
        if !self.captured.is_empty() {
            log::debug!("Captured {} candidate streams from menu", self.captured.len());
        }
    }

    pub fn captured(&self) -> &[Stream] {
        &self.captured
    }
}

impl Default for CandidateObserver {
    fn default() -> Self {
        Self::new()
    }
}

// --- Extraction strategies ---

/// Structured `label → url` quality map, best quality first.
fn extract_quality_map(metadata: &PlaybackMetadata) -> Option<Vec<Stream>> {
    let entries = metadata.quality_map()?;
    let mut streams: Vec<Stream> = entries
        .into_iter()
        .map(|(label, url)| Stream {
            url,
            quality: label,
            bandwidth: 0,
        })
        .collect();
    if streams.len() > 1 {
        streams.sort_by_key(|s| std::cmp::Reverse(leading_number(&s.quality)));
    }
    Some(streams)
}

/// Generic URL-bearing fields: the direct URL, a `urls` list, and playlist
/// entries.
fn extract_url_fields(metadata: &PlaybackMetadata) -> Option<Vec<Stream>> {
    let mut found = Vec::new();

    if let Some(url) = metadata.direct_url() {
        found.extend(sniff_stream_value(&Value::String(url.to_string()), None));
    }

    if let Some(values) = metadata.urls() {
        for value in values {
            found.extend(sniff_stream_value(value, None));
        }
    }

    if let Some(playlist) = metadata.playlist() {
        for (i, item) in playlist.iter().enumerate() {
            let Some(url) = item["url"].as_str().filter(|u| u.starts_with("http")) else {
                continue;
            };
            let quality = item["quality"]
                .as_str()
                .or_else(|| item["title"].as_str())
                .map(|s| s.to_string())
                .or_else(|| quality::quality_from_url(url))
                .unwrap_or_else(|| format!("Quality {}", i + 1));
            found.push(Stream {
                url: url.to_string(),
                quality,
                bandwidth: 0,
            });
        }
    }

    if found.is_empty() {
        None
    } else {
        Some(found)
    }
}

/// Accept either a direct URL string or a quality-keyed object; anything else
/// contributes nothing.
fn sniff_stream_value(value: &Value, label_hint: Option<&str>) -> Vec<Stream> {
    match value {
        Value::String(url) if url.starts_with("http") => {
            let quality = label_hint
                .map(|s| s.to_string())
                .or_else(|| quality::quality_from_url(url))
                .unwrap_or_else(|| "Video".to_string());
            vec![Stream {
                url: url.clone(),
                quality,
                bandwidth: 0,
            }]
        }
        Value::Object(map) => map
            .iter()
            .filter_map(|(label, v)| {
                v.as_str()
                    .filter(|u| u.starts_with("http"))
                    .map(|url| Stream {
                        url: url.to_string(),
                        quality: label.clone(),
                        bandwidth: 0,
                    })
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn leading_number(label: &str) -> u64 {
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

// --- Resolver ---

/// Walks the extraction strategies in priority order and assembles the
/// deduplicated candidate set.
pub struct StreamResolver {
    manifests: ManifestResolver,
}

impl StreamResolver {
    pub fn new(manifests: ManifestResolver) -> Self {
        Self { manifests }
    }

    /// Resolve the candidate streams for the current playback.
    ///
    /// Order: quality map, generic URL fields, adaptive-manifest expansion,
    /// observed menu candidates, then the playing element's source as a last
    /// resort. Labels are normalized on the way out.
    pub async fn resolve_streams(
        &self,
        metadata: &PlaybackMetadata,
        observed: &CandidateObserver,
    ) -> Vec<Stream> {
        let mut streams: Vec<Stream> = Vec::new();

        let strategies: [fn(&PlaybackMetadata) -> Option<Vec<Stream>>; 2] =
            [extract_quality_map, extract_url_fields];
        for strategy in strategies {
            if let Some(found) = strategy(metadata) {
                append_unique(&mut streams, found);
            }
        }

        if let Some(manifest_url) = detect_manifest_url(metadata) {
            let variants = self.manifests.fetch_variants(&manifest_url).await;
            append_unique(&mut streams, variants);
        }

        append_unique(&mut streams, observed.captured().to_vec());

        if streams.is_empty() {
            if let Some(src) = metadata.element_source() {
                let quality = quality::quality_from_url(src)
                    .unwrap_or_else(|| "Video".to_string());
                streams.push(Stream {
                    url: src.to_string(),
                    quality,
                    bandwidth: 0,
                });
            }
        }

        for stream in &mut streams {
            if let Some(q) = quality::normalize(Some(&stream.quality)) {
                stream.quality = q;
            }
        }

        log::debug!("Resolved {} candidate streams", streams.len());
        streams
    }
}

/// The playback URL when it signals an adaptive playlist.
fn detect_manifest_url(metadata: &PlaybackMetadata) -> Option<String> {
    metadata
        .direct_url()
        .or_else(|| metadata.element_source())
        .filter(|u| u.contains("m3u8"))
        .map(str::to_string)
}

fn append_unique(streams: &mut Vec<Stream>, candidates: Vec<Stream>) {
    for candidate in candidates {
        if !streams.iter().any(|s| s.url == candidate.url) {
            streams.push(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver() -> StreamResolver {
        StreamResolver::new(ManifestResolver::new(1))
    }

    fn direct_candidate(url: &str) -> MenuCandidate {
        let url = url.to_string();
        MenuCandidate {
            title: None,
            resolve: Box::new(move || Ok(Value::String(url.clone()))),
        }
    }

    #[tokio::test]
    async fn test_quality_map_best_first_and_normalized() {
        let metadata = PlaybackMetadata::new(json!({
            "quality": {
                "720": "http://host/sd.mp4",
                "1080": "http://host/hd.mp4"
            }
        }));
        let streams = resolver()
            .resolve_streams(&metadata, &CandidateObserver::new())
            .await;
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].url, "http://host/hd.mp4");
        assert_eq!(streams[0].quality, "1080p");
        assert_eq!(streams[1].quality, "720p");
    }

    #[tokio::test]
    async fn test_dedup_keeps_first_occurrence() {
        let metadata = PlaybackMetadata::new(json!({
            "quality": { "1080p": "http://host/hd.mp4" }
        }));
        let mut observer = CandidateObserver::new();
        observer.on_candidate_menu_shown(&[
            direct_candidate("http://host/hd.mp4"),
            direct_candidate("http://host/extra.mp4"),
        ]);

        let streams = resolver().resolve_streams(&metadata, &observer).await;
        let hd_count = streams
            .iter()
            .filter(|s| s.url == "http://host/hd.mp4")
            .count();
        assert_eq!(hd_count, 1);
        // First occurrence (the quality map) decides the position and label.
        assert_eq!(streams[0].url, "http://host/hd.mp4");
        assert_eq!(streams[0].quality, "1080p");
        assert!(streams.iter().any(|s| s.url == "http://host/extra.mp4"));
    }

    #[tokio::test]
    async fn test_playlist_entries_with_label_fallbacks() {
        let metadata = PlaybackMetadata::new(json!({
            "playlist": [
                { "url": "http://host/one.mp4", "quality": "1080" },
                { "url": "http://host/two_720p_.mp4" },
                { "url": "http://host/three.mp4" },
                { "title": "no url, skipped" }
            ]
        }));
        let streams = resolver()
            .resolve_streams(&metadata, &CandidateObserver::new())
            .await;
        assert_eq!(streams.len(), 3);
        assert_eq!(streams[0].quality, "1080p");
        assert_eq!(streams[1].quality, "720p");
        assert_eq!(streams[2].quality, "Quality 3");
    }

    #[test]
    fn test_failing_resolver_contributes_nothing() {
        let mut observer = CandidateObserver::new();
        observer.on_candidate_menu_shown(&[
            MenuCandidate {
                title: Some("Broken".to_string()),
                resolve: Box::new(|| Err("source plugin exploded".to_string())),
            },
            direct_candidate("http://host/ok.mp4"),
        ]);
        assert_eq!(observer.captured().len(), 1);
        assert_eq!(observer.captured()[0].url, "http://host/ok.mp4");
    }

    #[test]
    fn test_resolver_returning_quality_map() {
        let mut observer = CandidateObserver::new();
        observer.on_candidate_menu_shown(&[MenuCandidate {
            title: Some("Источник".to_string()),
            resolve: Box::new(|| {
                Ok(json!({
                    "1080p": "http://host/hd.mp4",
                    "480p": "http://host/ld.mp4"
                }))
            }),
        }]);
        assert_eq!(observer.captured().len(), 2);
    }

    #[tokio::test]
    async fn test_element_source_fallback() {
        let metadata = PlaybackMetadata::new(json!({ "src": "http://host/raw_480_.mp4" }));
        let streams = resolver()
            .resolve_streams(&metadata, &CandidateObserver::new())
            .await;
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].url, "http://host/raw_480_.mp4");
        assert_eq!(streams[0].quality, "480p");
    }

    #[tokio::test]
    async fn test_no_sources_yields_empty() {
        let streams = resolver()
            .resolve_streams(&PlaybackMetadata::empty(), &CandidateObserver::new())
            .await;
        assert!(streams.is_empty());
    }

    #[tokio::test]
    async fn test_manifest_expansion_appends_variants() {
        let server = MockServer::start().await;
        let master = format!(
            "#EXTM3U\n\
             #EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1920x1080\n\
             {}/high.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=1280x720\n\
             {}/low.m3u8\n",
            server.uri(),
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/master.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(master))
            .mount(&server)
            .await;

        let url = format!("{}/master.m3u8", server.uri());
        let metadata = PlaybackMetadata::new(json!({ "url": url }));
        let streams = StreamResolver::new(ManifestResolver::new(10))
            .resolve_streams(&metadata, &CandidateObserver::new())
            .await;

        // The master URL itself plus both variants, best variant first.
        assert_eq!(streams.len(), 3);
        assert_eq!(streams[0].url, url);
        assert_eq!(streams[1].url, format!("{}/high.m3u8", server.uri()));
        assert_eq!(streams[1].quality, "1080p");
        assert_eq!(streams[2].quality, "720p");
    }

    #[tokio::test]
    async fn test_manifest_fetch_failure_keeps_master_only() {
        // Unreachable manifest: the fail-open fallback carries the same URL,
        // so dedup collapses it into the already-present candidate.
        let metadata =
            PlaybackMetadata::new(json!({ "url": "http://127.0.0.1:9/master.m3u8" }));
        let streams = resolver()
            .resolve_streams(&metadata, &CandidateObserver::new())
            .await;
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].url, "http://127.0.0.1:9/master.m3u8");
    }
}
