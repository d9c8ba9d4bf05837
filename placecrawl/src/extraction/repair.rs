//! Salvage of truncated JSON array replies.
//!
//! A reply is either complete (`[]`, or ending in `}]`) or assumed cut off
//! inside an object. Cut-off replies keep everything up to the last `}` and
//! close the array there; the partial trailing record is dropped, never
//! completed.

use tracing::warn;

/// Whether `content` needs repair before it can be parsed.
#[must_use]
pub fn needs_repair(content: &str) -> bool {
    !(content == "[]" || content.ends_with("}]"))
}

/// Returns a best-effort well-formed JSON array string.
///
/// Pure apart from a warning log when repair was needed.
#[must_use]
pub fn repair_json(content: &str) -> String {
    if !needs_repair(content) {
        return content.to_string();
    }

    warn!(reply_len = content.len(), "Repairing truncated JSON reply");
    match content.rfind('}') {
        Some(idx) => format!("{}]", &content[..=idx]),
        None => "[]".to_string(),
    }
}
