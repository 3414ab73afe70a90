//! Byte-size probing with a session cache.
//!
//! One HEAD request per distinct URL for the lifetime of the session; results
//! are memoized, including failures. `0` is the canonical "unknown size"
//! sentinel; callers never see an error.

use crate::services::media::{is_manifest_url, Stream};
use std::collections::HashMap;

pub struct SizeProber {
    cache: HashMap<String, u64>,
    http_client: reqwest::Client,
}

impl SizeProber {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            cache: HashMap::new(),
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Probe the byte size of a URL. A cached entry resolves without touching
    /// the network. Failures, non-2xx responses, missing length headers and
    /// timeouts all cache and return 0. Never retries.
    pub async fn probe(&mut self, url: &str) -> u64 {
        if let Some(&size) = self.cache.get(url) {
            return size;
        }
        let size = head_content_length(&self.http_client, url).await;
        self.cache.insert(url.to_string(), size);
        size
    }

    /// Probe every stream; cache misses are fired concurrently and results
    /// preserve input order. Resolves only after every probe has settled.
    /// Manifest URLs are assigned 0 without a network call.
    pub async fn probe_all(&mut self, streams: &[Stream]) -> Vec<u64> {
        if streams.is_empty() {
            return Vec::new();
        }

        let lookups: Vec<Option<u64>> = streams
            .iter()
            .map(|s| {
                if is_manifest_url(&s.url) {
                    Some(0)
                } else {
                    self.cache.get(&s.url).copied()
                }
            })
            .collect();

        let probes: Vec<_> = streams
            .iter()
            .zip(lookups)
            .map(|(stream, cached)| {
                let client = self.http_client.clone();
                let url = stream.url.clone();
                async move {
                    match cached {
                        Some(size) => size,
                        None => head_content_length(&client, &url).await,
                    }
                }
            })
            .collect();

        let sizes = futures::future::join_all(probes).await;

        for (stream, &size) in streams.iter().zip(sizes.iter()) {
            if !is_manifest_url(&stream.url) {
                self.cache.insert(stream.url.clone(), size);
            }
        }

        sizes
    }

    #[allow(dead_code)]
    pub fn cached(&self, url: &str) -> Option<u64> {
        self.cache.get(url).copied()
    }
}

async fn head_content_length(client: &reqwest::Client, url: &str) -> u64 {
    match client.head(url).send().await {
        Ok(response) if response.status().is_success() => response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0),
        Ok(response) => {
            log::debug!("Size probe for {} returned {}", url, response.status());
            0
        }
        Err(e) => {
            log::debug!("Size probe for {} failed: {}", url, e);
            0
        }
    }
}
