//! Text normalization for lexicon matching
//!
//! Provides normalization for gazetteer phrases and input tokens:
//! - Unicode NFKC normalization
//! - ASCII lowercase conversion
//! - Punctuation stripping
//! - Whitespace collapsing

use unicode_normalization::UnicodeNormalization;

/// Normalize text for phrase-index matching.
///
/// Performs:
/// - Unicode NFKC fold
/// - ASCII lowercase conversion
/// - Strip punctuation (replace with space)
/// - Collapse whitespace
///
/// # Examples
///
/// ```
/// use linker_ner::normalize::normalize_text;
///
/// assert_eq!(normalize_text("Genesis 1:1"), "genesis 1 1");
/// assert_eq!(normalize_text("  Rashi,  on Genesis "), "rashi on genesis");
/// ```
pub fn normalize_text(s: &str) -> String {
    // Unicode NFKC normalization
    let folded: String = s.nfkc().collect();

    // Replace non-alphanumeric with space, lowercase
    let stripped: String = folded
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    // Collapse whitespace
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A token in the original text, with *character* positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Start character position in original text
    pub start: usize,
    /// End character position in original text (exclusive)
    pub end: usize,
    /// Normalized form for matching
    pub norm: String,
}

/// Tokenize with character positions.
///
/// Splits on non-alphanumeric characters. Positions index characters of the
/// original string, matching the span model's offset convention.
pub fn tokenize_with_positions(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut word_start = 0;
    let mut char_idx = 0;

    for c in s.chars() {
        if c.is_alphanumeric() {
            if current.is_empty() {
                word_start = char_idx;
            }
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(Token {
                start: word_start,
                end: char_idx,
                norm: normalize_text(&current),
            });
            current.clear();
        }
        char_idx += 1;
    }

    // Handle trailing word
    if !current.is_empty() {
        tokens.push(Token {
            start: word_start,
            end: char_idx,
            norm: normalize_text(&current),
        });
    }

    tokens
}
