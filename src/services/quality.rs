//! Quality label normalization.
//!
//! Host players report quality in whatever shape the source happened to use:
//! a resolution pair, a bare height, a proper "1080p", or free text. Everything
//! funnels through [`normalize`] so menus, filenames and dedup all see one
//! canonical label.

use regex::Regex;

/// Canonicalize a raw quality token.
///
/// `"1920x1080"` → `"1080p"`, `"1080"` → `"1080p"`, `"1080P"` → `"1080p"`;
/// free text ("Stream", "720kbps") passes through unchanged. Idempotent.
pub fn normalize(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    let resolution_re = Regex::new(r"(\d+)x(\d+)").unwrap();
    if let Some(caps) = resolution_re.captures(raw) {
        return Some(format!("{}p", &caps[2]));
    }

    let height_re = Regex::new(r"(?i)^\d{3,4}p$").unwrap();
    if height_re.is_match(raw) {
        return Some(raw.to_lowercase());
    }

    let digits_re = Regex::new(r"^\d{3,4}$").unwrap();
    if digits_re.is_match(raw) {
        return Some(format!("{}p", raw));
    }

    Some(raw.to_string())
}

/// Recover a quality token from URL path conventions
/// (`.../movie_1080p_x264.mp4`, `...?quality=720`, `.../720/seg.ts`).
pub fn quality_from_url(url: &str) -> Option<String> {
    let patterns = [
        r"(?i)[_/\-](\d{3,4}p)[_/.]",
        r"(?i)quality[=_]?(\d{3,4})",
        r"[_/\-](\d{3,4})[_/.]",
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).unwrap();
        if let Some(caps) = re.captures(url) {
            let token = caps[1].to_lowercase();
            return if token.ends_with('p') {
                Some(token)
            } else {
                Some(format!("{}p", token))
            };
        }
    }
    None
}
