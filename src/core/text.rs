//! Text tokenization helpers.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

/// Lowercased whitespace-separated terms of a query.
///
/// Used by keyword boosting, which matches terms as literal substrings.
#[must_use]
pub fn query_terms(query: &str) -> HashSet<String> {
    query.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Lowercased words, split on Unicode word boundaries.
///
/// Punctuation and whitespace never form a token.
#[must_use]
pub fn word_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .unicode_words()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_terms_dedupes_and_lowercases() {
        let terms = query_terms("GenAI  productivity genai");
        assert_eq!(terms.len(), 2);
        assert!(terms.contains("genai"));
        assert!(terms.contains("productivity"));
    }

    #[test]
    fn test_word_tokens_strip_punctuation() {
        let tokens = word_tokens("OpenAI releases new model!");
        assert!(tokens.contains("openai"));
        assert!(tokens.contains("model"));
        assert!(!tokens.contains("model!"));
    }

    #[test]
    fn test_word_tokens_unicode() {
        let tokens = word_tokens("Café-Politik: «Régulation» 2026");
        assert!(tokens.contains("café"));
        assert!(tokens.contains("politik"));
        assert!(tokens.contains("régulation"));
        assert!(tokens.contains("2026"));
    }

    #[test]
    fn test_word_tokens_empty() {
        assert!(word_tokens("  ... ").is_empty());
    }
}
