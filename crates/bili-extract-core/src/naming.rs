use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

use crate::media::MediaItem;

/// Characters Windows and most filesystems refuse in a file name
static INVALID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1f\x7f]"#).unwrap());

const FALLBACK_NAME: &str = "untitled";

/// Produces the output file stem for an item.
pub type NameFn = dyn Fn(&MediaItem) -> String + Send + Sync;

/// Default naming: the item's own title, unchanged.
pub fn default_name(item: &MediaItem) -> String {
    item.title().to_string()
}

/// The item's title made safe to use as a file name.
pub fn sanitized_name(item: &MediaItem) -> String {
    sanitize_file_name(item.title())
}

/// Prefix a name with its 1-based position, padded to the width of `total`.
pub fn indexed_name(index: usize, total: usize, name: &str) -> String {
    let width = total.max(1).to_string().len();
    format!("{:0width$} - {}", index + 1, name, width = width)
}

/// NFC-normalize `name` and replace characters that cannot appear in a file name.
pub fn sanitize_file_name(name: &str) -> String {
    let normalized: String = name.nfc().collect();
    let replaced = INVALID_RE.replace_all(&normalized, "_");
    let trimmed = replaced.trim().trim_end_matches(&['.', ' '][..]);
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
