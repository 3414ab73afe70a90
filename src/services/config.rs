//! Session configuration.
//!
//! Nothing here is persisted; hosts build a config (or take the defaults) when
//! they open a session and all state dies with the session.

use serde::{Deserialize, Serialize};

/// What to do when no episode information can be resolved for a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EpisodePolicy {
    /// Leave the episode code out of the filename.
    Omit,
    /// Fall back to `S01E01`.
    DefaultToFirst,
}

impl Default for EpisodePolicy {
    fn default() -> Self {
        EpisodePolicy::Omit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Timeout for byte-size HEAD probes.
    pub probe_timeout_secs: u64,
    /// Timeout for adaptive manifest fetches.
    pub manifest_timeout_secs: u64,
    /// Pacing delay between consecutive batch-dispatch items.
    pub dispatch_delay_ms: u64,
    pub episode_policy: EpisodePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 5,
            manifest_timeout_secs: 10,
            dispatch_delay_ms: 500,
            episode_policy: EpisodePolicy::default(),
        }
    }
}
