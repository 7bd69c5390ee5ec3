//! Word tokenization shared by the hashing embedder and keyword stats

use unicode_segmentation::UnicodeSegmentation;

use crate::lexicon::normalize;

/// Lower-cased Unicode words, punctuation dropped
pub fn words(text: &str) -> Vec<String> {
    normalize(text)
        .unicode_words()
        .map(str::to_string)
        .collect()
}

/// Adjacent word pairs, joined with a space
pub fn bigrams(tokens: &[String]) -> Vec<String> {
    tokens
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect()
}
