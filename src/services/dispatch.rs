//! External dispatch boundary.
//!
//! The crate never transfers bytes itself. A resolved (url, filename, kind)
//! triple is handed to the host's external-open primitive: the download
//! handler reads the desired filename from a URL fragment, an external player
//! gets the URL unmodified.

use crate::services::media::{is_manifest_url, subtitle_extension, MediaKind};

/// Boundary to the external application that performs the actual transfer or
/// playback.
#[cfg_attr(test, mockall::automock)]
pub trait DispatchGateway: Send + Sync {
    /// Hand a URL to the external handler. `false` means the handler refused
    /// or is unavailable.
    fn open_externally(&self, url: &str, display_title: &str) -> bool;
}

/// File extension the external download handler should persist under.
pub fn extension_for(url: &str, kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Video => {
            if is_manifest_url(url) {
                ".m3u8"
            } else {
                ".mp4"
            }
        }
        MediaKind::Subtitle => subtitle_extension(url),
    }
}

/// Download URL understood by the external handler: the target with the
/// desired filename (extension included) in the fragment.
pub fn download_url(url: &str, filename: &str, kind: MediaKind) -> String {
    let ext = extension_for(url, kind);
    format!(
        "{}#filename={}",
        url,
        urlencoding::encode(&format!("{}{}", filename, ext))
    )
}
