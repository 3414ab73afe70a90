//! Stream variant resolution and download queueing for embedded media
//! players.
//!
//! The host player feeds this crate its loosely typed playback metadata and
//! navigation events; the crate resolves the downloadable quality variants,
//! derives stable filenames, annotates byte sizes, and manages a paced
//! download queue dispatched to an external handler through the
//! [`DispatchGateway`](services::DispatchGateway) boundary. No bytes are
//! transferred and nothing is persisted; all state is session memory.

pub mod error;
pub mod services;
pub mod state;

pub use error::{Result, StreamgrabError};
pub use state::SessionState;

/// Initialize env_logger for binaries and examples. Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();
}
