use std::sync::Arc;
use tokio::sync::RwLock;

use crate::services::aggregator::{CandidateObserver, StreamResolver};
use crate::services::config::SessionConfig;
use crate::services::manifest::ManifestResolver;
use crate::services::playback::ContextTracker;
use crate::services::queue::DownloadQueue;
use crate::services::size_probe::SizeProber;

/// Session-scoped state owned by the host for the lifetime of one player
/// session. Replaces the ambient globals a plugin runtime would use: the size
/// cache, the download queue and the navigation context all live here and die
/// with the session.
pub struct SessionState {
    pub context: Arc<RwLock<ContextTracker>>,
    pub observer: Arc<RwLock<CandidateObserver>>,
    pub prober: Arc<RwLock<SizeProber>>,
    pub queue: Arc<RwLock<DownloadQueue>>,
    pub resolver: StreamResolver,
    config: SessionConfig,
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        log::info!(
            "Initializing download session: probe_timeout={}s, manifest_timeout={}s, dispatch_delay={}ms",
            config.probe_timeout_secs,
            config.manifest_timeout_secs,
            config.dispatch_delay_ms
        );

        let resolver = StreamResolver::new(ManifestResolver::new(config.manifest_timeout_secs));

        Self {
            context: Arc::new(RwLock::new(ContextTracker::new())),
            observer: Arc::new(RwLock::new(CandidateObserver::new())),
            prober: Arc::new(RwLock::new(SizeProber::new(config.probe_timeout_secs))),
            queue: Arc::new(RwLock::new(DownloadQueue::new(config.dispatch_delay_ms))),
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
