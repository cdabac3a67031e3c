//! Per-language tokenization (§4.5's "per-language analyzers").
//!
//! Korean, Japanese and Chinese are not space-delimited, so a plain word
//! tokenizer under-segments them badly; we analyze those three with
//! character bigrams instead, a standard cheap substitute for a real
//! segmenter in a BM25 index. English plus the four European languages
//! and anything outside the eight supported codes get a casefolded
//! Unicode word tokenizer, which doubles as the "default analyzer".

use unicode_segmentation::UnicodeSegmentation;

const BIGRAM_LANGUAGES: [&str; 3] = ["ko", "ja", "zh"];

/// Tokenize `text` with the analyzer appropriate for `lang`.
#[must_use]
pub fn analyze(lang: &str, text: &str) -> Vec<String> {
    if BIGRAM_LANGUAGES.contains(&lang) {
        char_bigrams(text)
    } else {
        default_tokenize(text)
    }
}

/// The default analyzer: casefolded Unicode words. Used both for
/// non-CJK languages and as the corpus-wide fallback field.
#[must_use]
pub fn default_tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

fn char_bigrams(text: &str) -> Vec<String> {
    let chars: Vec<char> = text
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_punctuation())
        .collect();

    if chars.len() < 2 {
        return chars.iter().map(|c| c.to_string()).collect();
    }

    chars.windows(2).map(|w| w.iter().collect()).collect()
}
