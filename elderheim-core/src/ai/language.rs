//! Language codes for the reply-language prompt suffix.

use std::collections::HashMap;

use lazy_static::lazy_static;
use tracing::warn;

lazy_static! {
    static ref LANGUAGE_NAMES: HashMap<&'static str, &'static str> = HashMap::from([
        ("en", "English"),
        ("ru", "Russian"),
        ("es", "Spanish"),
        ("fr", "French"),
        ("de", "German"),
        ("zh", "Chinese"),
        ("ja", "Japanese"),
        ("ko", "Korean"),
        ("it", "Italian"),
        ("pt", "Portuguese"),
        ("ar", "Arabic"),
        ("hi", "Hindi"),
        ("tr", "Turkish"),
        ("nl", "Dutch"),
        ("pl", "Polish"),
        ("id", "Indonesian"),
    ]);
}

/// Full language name for an ISO 639-1 code, if known.
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGE_NAMES.get(code).copied()
}

/// Suffix the prompt with a reply-language instruction. An unknown code
/// yields no suffix; nothing undefined is ever embedded in the prompt.
pub fn apply_language_suffix(prompt: &str, code: Option<&str>) -> String {
    match code {
        Some(code) => match language_name(code) {
            Some(name) => format!("{prompt} (Respond in {name})"),
            None => {
                warn!(code, "unknown language code, omitting reply-language instruction");
                prompt.to_string()
            }
        },
        None => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(language_name("en"), Some("English"));
        assert_eq!(language_name("ja"), Some("Japanese"));
        assert_eq!(language_name("id"), Some("Indonesian"));
    }

    #[test]
    fn test_suffix_applied_for_known_code() {
        assert_eq!(
            apply_language_suffix("Describe the scene", Some("de")),
            "Describe the scene (Respond in German)"
        );
    }

    #[test]
    fn test_unknown_code_leaves_prompt_untouched() {
        assert_eq!(
            apply_language_suffix("Describe the scene", Some("xx")),
            "Describe the scene"
        );
        assert_eq!(apply_language_suffix("Describe the scene", None), "Describe the scene");
    }
}
