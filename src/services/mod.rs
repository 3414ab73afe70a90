// Service layer - one module per resolution/queueing concern

pub mod aggregator;
pub mod config;
pub mod dispatch;
pub mod filename;
pub mod manifest;
pub mod media;
pub mod playback;
pub mod quality;
pub mod queue;
pub mod session;
pub mod size_probe;

pub use aggregator::{CandidateObserver, MenuCandidate, StreamResolver};
pub use config::{EpisodePolicy, SessionConfig};
pub use dispatch::DispatchGateway;
pub use manifest::ManifestResolver;
pub use media::{MediaKind, Stream, SubtitleTrack};
pub use playback::{ContextTracker, EpisodeRef, PlaybackContext, PlaybackMetadata};
pub use queue::{DownloadQueue, QueueItem};
pub use session::DownloadCandidate;
pub use size_probe::SizeProber;
