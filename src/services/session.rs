//! Session operations.
//!
//! The host-facing surface: each function locks the services it needs from
//! the shared [`SessionState`], mirrors one user-visible operation, and
//! returns plain data the host can render.

use crate::error::{Result, StreamgrabError};
use crate::services::dispatch::{download_url, DispatchGateway};
use crate::services::filename;
use crate::services::media::{MediaKind, Stream, SubtitleTrack};
use crate::services::playback::PlaybackMetadata;
use crate::services::queue::QueueItem;
use crate::state::SessionState;
use serde::{Deserialize, Serialize};

/// A resolved stream annotated with its probed byte size (0 = unknown).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadCandidate {
    pub stream: Stream,
    pub size_bytes: u64,
}

/// Resolve the downloadable variants for the current playback and annotate
/// each with its byte size.
pub async fn resolve_download_candidates(
    state: &SessionState,
    metadata: &PlaybackMetadata,
) -> Result<Vec<DownloadCandidate>> {
    if metadata.direct_url().is_none() && metadata.element_source().is_none() {
        return Err(StreamgrabError::NoPlaybackUrl);
    }

    let observer = state.observer.read().await;
    let streams = state.resolver.resolve_streams(metadata, &observer).await;
    drop(observer);

    if streams.is_empty() {
        return Err(StreamgrabError::NoStreams);
    }

    let mut prober = state.prober.write().await;
    let sizes = prober.probe_all(&streams).await;

    Ok(streams
        .into_iter()
        .zip(sizes)
        .map(|(stream, size_bytes)| DownloadCandidate { stream, size_bytes })
        .collect())
}

/// Hand one stream to the external download handler immediately.
/// Returns the derived filename.
pub async fn download_now(
    state: &SessionState,
    gateway: &dyn DispatchGateway,
    metadata: &PlaybackMetadata,
    url: &str,
    quality: Option<&str>,
) -> Result<String> {
    let name = filename_for(state, metadata, Some(url), quality).await;
    let dl_url = download_url(url, &name, MediaKind::Video);
    log::info!("Dispatching download: {}", name);
    if gateway.open_externally(&dl_url, &name) {
        Ok(name)
    } else {
        Err(StreamgrabError::DispatchRejected(name))
    }
}

/// Open a stream in an external player. The URL is passed unmodified.
pub async fn open_external(
    state: &SessionState,
    gateway: &dyn DispatchGateway,
    metadata: &PlaybackMetadata,
    url: &str,
    quality: Option<&str>,
) -> Result<String> {
    let name = filename_for(state, metadata, Some(url), quality).await;
    log::info!("Opening external player: {}", name);
    if gateway.open_externally(url, &name) {
        Ok(name)
    } else {
        Err(StreamgrabError::DispatchRejected(name))
    }
}

/// Subtitle tracks advertised by the current playback metadata.
pub fn list_subtitles(metadata: &PlaybackMetadata) -> Vec<SubtitleTrack> {
    metadata.subtitles()
}

/// Hand a subtitle track to the external download handler.
pub async fn download_subtitle(
    state: &SessionState,
    gateway: &dyn DispatchGateway,
    metadata: &PlaybackMetadata,
    track: &SubtitleTrack,
) -> Result<String> {
    let context = state.context.read().await;
    let snapshot = context.snapshot();
    let episode = filename::resolve_episode(
        None,
        metadata,
        &snapshot,
        context.is_series(),
        None,
        state.config().episode_policy,
    );
    drop(context);

    let name = filename::subtitle_filename(&snapshot, episode.as_ref(), &track.label);
    let dl_url = download_url(&track.url, &name, MediaKind::Subtitle);
    log::info!("Dispatching subtitle download: {}", name);
    if gateway.open_externally(&dl_url, &name) {
        Ok(name)
    } else {
        Err(StreamgrabError::DispatchRejected(name))
    }
}

/// Enqueue a download for later batch dispatch. Returns the new queue length;
/// a URL already queued is rejected.
pub async fn enqueue_download(
    state: &SessionState,
    metadata: &PlaybackMetadata,
    url: &str,
    quality: Option<&str>,
    size_bytes: u64,
) -> Result<usize> {
    let name = filename_for(state, metadata, Some(url), quality).await;
    let snapshot = state.context.read().await.snapshot();

    let item = QueueItem::new(
        url.to_string(),
        quality.unwrap_or("Video").to_string(),
        size_bytes,
        name,
        Some(snapshot),
    );
    state.queue.write().await.enqueue(item)
}

/// Dispatch the whole queue to the external handler, paced, then clear it.
pub async fn dispatch_queue(
    state: &SessionState,
    gateway: &dyn DispatchGateway,
) -> Result<usize> {
    state.queue.write().await.dispatch_all(gateway).await
}

async fn filename_for(
    state: &SessionState,
    metadata: &PlaybackMetadata,
    url: Option<&str>,
    quality: Option<&str>,
) -> String {
    let context = state.context.read().await;
    let snapshot = context.snapshot();
    let episode = filename::resolve_episode(
        None,
        metadata,
        &snapshot,
        context.is_series(),
        url,
        state.config().episode_policy,
    );
    filename::derive_filename(quality, &snapshot, episode.as_ref())
}
