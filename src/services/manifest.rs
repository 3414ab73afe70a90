//! Adaptive manifest resolution.
//!
//! Parses HLS master playlists into ranked variant streams and fetches them
//! over the network. Fetching fails open: callers always get at least one
//! stream back, never an error, so a download menu can always be shown.

use crate::services::media::Stream;
use regex::Regex;
use url::Url;

/// Parse an HLS master playlist into variant streams. Pure, no I/O.
///
/// A `#EXT-X-STREAM-INF:` line carries the attributes; the next non-comment,
/// non-blank line is the variant URL, resolved against the base URL's
/// directory when relative. Output is sorted by bandwidth descending (stable
/// on ties).
pub fn parse_master(text: &str, base_url: &str) -> Vec<Stream> {
    let bandwidth_re = Regex::new(r"BANDWIDTH=(\d+)").unwrap();
    let resolution_re = Regex::new(r"RESOLUTION=(\d+x\d+)").unwrap();

    let mut streams = Vec::new();
    let mut pending: Option<(u64, Option<String>)> = None;

    for line in text.lines() {
        let line = line.trim();

        if line.starts_with("#EXT-X-STREAM-INF:") {
            let bandwidth = bandwidth_re
                .captures(line)
                .and_then(|c| c[1].parse().ok())
                .unwrap_or(0);
            let resolution = resolution_re.captures(line).map(|c| c[1].to_string());
            pending = Some((bandwidth, resolution));
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some((bandwidth, resolution)) = pending.take() {
                let quality = match resolution {
                    Some(res) => res,
                    None if bandwidth > 0 => {
                        format!("{}kbps", ((bandwidth as f64) / 1000.0).round() as u64)
                    }
                    None => "Stream".to_string(),
                };
                streams.push(Stream {
                    url: resolve_variant_url(base_url, line),
                    quality,
                    bandwidth,
                });
            }
        }
    }

    streams.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));
    streams
}

/// Resolve a variant URL against the master playlist's directory.
fn resolve_variant_url(base: &str, candidate: &str) -> String {
    if candidate.starts_with("http") {
        return candidate.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(candidate)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => {
            // Base is not an absolute URL; splice the directory by hand.
            let mut parts: Vec<&str> = base.split('/').collect();
            parts.pop();
            format!("{}/{}", parts.join("/"), candidate)
        }
    }
}

/// Fetches master manifests and expands them into variant streams.
pub struct ManifestResolver {
    http_client: reqwest::Client,
}

impl ManifestResolver {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fetch a manifest URL and parse its variants.
    ///
    /// Any failure (network error, non-2xx status, timeout, or content that
    /// is not a master playlist) yields a single synthetic default stream
    /// for the original URL.
    pub async fn fetch_variants(&self, url: &str) -> Vec<Stream> {
        let response = match self.http_client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Manifest fetch failed for {}: {}", url, e);
                return vec![fallback_stream(url)];
            }
        };

        if !response.status().is_success() {
            log::warn!("Manifest fetch for {} returned {}", url, response.status());
            return vec![fallback_stream(url)];
        }

        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Manifest read failed for {}: {}", url, e);
                return vec![fallback_stream(url)];
            }
        };

        if !text.contains("#EXT-X-STREAM-INF") {
            // Media playlist or arbitrary content; treat the URL itself as
            // the only variant.
            return vec![fallback_stream(url)];
        }

        let streams = parse_master(&text, url);
        if streams.is_empty() {
            vec![fallback_stream(url)]
        } else {
            streams
        }
    }
}

fn fallback_stream(url: &str) -> Stream {
    Stream {
        url: url.to_string(),
        quality: "Default".to_string(),
        bandwidth: 0,
    }
}
