//! JSON extraction from raw model output.
//!
//! Models wrap JSON in markdown fences or stray prose despite instructions.
//! Extraction is an ordered list of strategies, tried in a fixed priority
//! order with the first match winning:
//!
//! 1. A fenced ```json block
//! 2. A single top-level object spanning the whole trimmed content
//! 3. The trimmed content itself, with any fence remnants stripped

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCED: Regex =
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced-block pattern");
    static ref WHOLE_OBJECT: Regex = Regex::new(r"(?s)^\{.*\}$").expect("whole-object pattern");
}

/// Extract the most plausible JSON text from model content.
pub fn extract_json(content: &str) -> String {
    let trimmed = content.trim();
    if let Some(block) = fenced_block(trimmed) {
        return block;
    }
    if let Some(whole) = whole_object(trimmed) {
        return whole;
    }
    raw_fallback(trimmed)
}

fn fenced_block(content: &str) -> Option<String> {
    FENCED
        .captures(content)
        .map(|captures| captures[1].trim().to_string())
}

fn whole_object(content: &str) -> Option<String> {
    WHOLE_OBJECT
        .is_match(content)
        .then(|| content.to_string())
}

fn raw_fallback(content: &str) -> String {
    let mut text = content;
    text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text = text.strip_suffix("```").unwrap_or(text);
    text.trim().to_string()
}
