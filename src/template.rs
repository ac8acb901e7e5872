//! Template expansion and filename sanitization.

use crate::models::MetadataRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_ARTIST: &str = "Unknown Artist";

static ILLEGAL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x00-\x1f\x7f]").unwrap());
static SEPARATOR_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_]{2,}").unwrap());

/// Expand a rename template against one file's metadata and return the
/// sanitized base name (no extension), or None when nothing usable remains.
///
/// Title and artist substitute a fallback when absent so a name is never
/// empty solely because those two are missing; the other placeholders
/// substitute nothing. Unrecognized `%...%` tokens are left verbatim.
pub fn generate(
    metadata: &MetadataRecord,
    template: &str,
    max_len: Option<usize>,
) -> Option<String> {
    let expanded = template
        .replace("%title%", non_empty_or(&metadata.title, UNKNOWN_TITLE))
        .replace("%artist%", non_empty_or(&metadata.artist, UNKNOWN_ARTIST))
        .replace("%album%", &metadata.album)
        .replace("%track%", &metadata.track)
        .replace("%year%", &metadata.year)
        .replace("%genre%", &metadata.genre);

    // Sanitize the whole expansion, not per field, so separators smuggled in
    // by tag values are caught too.
    let cleaned = sanitize(&expanded);
    let collapsed = SEPARATOR_RUNS.replace_all(&cleaned, "-");
    let trimmed = collapsed.trim_matches(|c: char| c == '-' || c == '_' || c.is_whitespace());

    if trimmed.is_empty() {
        return None;
    }

    if let Some(cap) = max_len {
        if trimmed.chars().count() > cap {
            let truncated: String = trimmed.chars().take(cap).collect();
            warn!("generated name too long, truncated to {:?}", truncated);
            return Some(truncated);
        }
    }

    Some(trimmed.to_string())
}

/// Replace filesystem-hostile characters with `_` and trim surrounding
/// whitespace. Idempotent.
pub fn sanitize(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let cleaned = ILLEGAL_CHARS.replace_all(name, "_");
    let cleaned = CONTROL_CHARS.replace_all(&cleaned, "_");
    let cleaned = cleaned.replace('\u{2028}', "_").replace('\u{2029}', "_");
    cleaned.trim().to_string()
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}
