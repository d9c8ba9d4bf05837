//! Instruction template for the extraction service.

/// Opening sentinel around the page text.
pub const INPUT_START: &str = ">>>";
/// Closing sentinel around the page text.
pub const INPUT_END: &str = "<<<";

const PREAMBLE: &str = r#"Extract all addresses from the text between >>> and <<<
and return them as a comma-separated JSON list without line breaks:
[{"title": "Place Name", "address": "Streetname 12, City"}]
The title should be descriptive of the address.
Keep going until you have found all addresses.
If no addresses are found, return [].
The output must be valid JSON."#;

const REMINDER: &str =
    "Remember: you must find all addresses and the output must be valid JSON!";

/// Cuts `text` to at most `max_chars` characters.
///
/// A hard cutoff on character boundaries, not sentence-aware.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Builds the single-turn extraction prompt for `text`.
#[must_use]
pub fn build_prompt(text: &str, max_chars: usize) -> String {
    format!(
        "{PREAMBLE}\n{INPUT_START}\n{}\n{INPUT_END}\n{REMINDER}\n",
        truncate_chars(text, max_chars)
    )
}
