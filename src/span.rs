//! Span data model for named entity output
//!
//! Model backends report entities as *character* offsets into the source
//! text (the texts are frequently Hebrew, so byte offsets would be wrong).
//! `NeDoc` owns the source text and resolves character ranges; `NeSpan` is a
//! labeled character span with its text resolved at construction.

use serde::{Deserialize, Serialize};

/// A source document that spans index into by character offset
#[derive(Debug, Clone)]
pub struct NeDoc {
    text: String,
}

impl NeDoc {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of characters (not bytes) in the document
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Slice the document by character offsets.
    ///
    /// Returns `None` when the range is out of bounds or inverted, so a
    /// misbehaving model backend can never cause a panic here.
    pub fn char_slice(&self, start: usize, end: usize) -> Option<&str> {
        if start > end {
            return None;
        }
        let mut byte_start = None;
        let mut byte_end = None;
        for (char_idx, (byte_idx, _)) in self.text.char_indices().enumerate() {
            if char_idx == start {
                byte_start = Some(byte_idx);
            }
            if char_idx == end {
                byte_end = Some(byte_idx);
                break;
            }
        }
        let char_len = self.char_len();
        if start == char_len {
            byte_start = Some(self.text.len());
        }
        if end == char_len {
            byte_end = Some(self.text.len());
        }
        Some(&self.text[byte_start?..byte_end?])
    }
}

/// A labeled character span over an `NeDoc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeSpan {
    /// Start character position in the source text
    pub start: usize,
    /// End character position in the source text (exclusive)
    pub end: usize,
    /// Model label for this span (e.g. "Citation", "מקור")
    pub label: String,
    text: String,
}

impl NeSpan {
    pub fn new(doc: &NeDoc, start: usize, end: usize, label: impl Into<String>) -> Self {
        let text = doc.char_slice(start, end).unwrap_or_default().to_string();
        Self {
            start,
            end,
            label: label.into(),
            text,
        }
    }

    /// The span's text as resolved from its document
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Serialize for the wire, optionally including the span text
    pub fn serialize(&self, with_span_text: bool) -> SerializedSpan {
        SerializedSpan {
            start_char: self.start,
            end_char: self.end,
            label: self.label.clone(),
            text: with_span_text.then(|| self.text.clone()),
            parts: None,
        }
    }
}

/// Wire DTO for a span.
///
/// `text` is present only when the caller asked for it; `parts` is present
/// only on citation spans, holding the nested reference-part spans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializedSpan {
    pub start_char: usize,
    pub end_char: usize,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<SerializedSpan>>,
}
