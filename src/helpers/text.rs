//! Word counting and reading time

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A non-whitespace run that starts and ends on a word boundary
    static ref WORD: Regex = Regex::new(r"\b\S+\b").unwrap();
}

/// Count words in plain text.
///
/// Punctuation-only tokens count zero, hyphenated words and numerals count
/// once each.
pub fn count_words(text: &str) -> usize {
    WORD.find_iter(text).count()
}

/// Minutes needed to read `words` at `words_per_minute`, rounded up
pub fn minutes_for(words: usize, words_per_minute: usize) -> usize {
    words.div_ceil(words_per_minute.max(1))
}
