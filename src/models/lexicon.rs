//! Lexicon (gazetteer) NER backend
//!
//! Matches normalized n-grams of the input against a phrase index loaded
//! from a JSON artifact, then keeps the best non-overlapping spans. This is
//! the in-process backend for vocabularies that are closed enough to
//! enumerate (e.g. canonical source titles).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::artifact;
use crate::error::NerError;
use crate::normalize::{normalize_text, tokenize_with_positions};
use crate::span::{NeDoc, NeSpan};

use super::NerModel;

fn default_max_ngram() -> usize {
    5
}

/// JSON schema of a lexicon artifact.
///
/// Maps labels to the phrases that should be tagged with them. Phrases
/// longer than `max_ngram` tokens are never matched.
#[derive(Debug, Clone, Deserialize)]
pub struct LexiconArtifact {
    /// Maximum n-gram size to consider while scanning
    #[serde(default = "default_max_ngram")]
    pub max_ngram: usize,

    /// Label -> phrases tagged with that label
    pub labels: HashMap<String, Vec<String>>,
}

/// A candidate match before non-overlap selection
#[derive(Debug, Clone)]
struct Candidate {
    start: usize,
    end: usize,
    label: String,
    ngram_len: usize,
}

/// Gazetteer-backed NER model
#[derive(Debug)]
pub struct LexiconNer {
    max_ngram: usize,
    /// Normalized phrase -> label
    phrase_index: HashMap<String, String>,
}

impl LexiconNer {
    /// Load the artifact from a local path, `http(s)://`, or `gs://` location
    pub async fn load(location: &str) -> Result<Self, NerError> {
        let bytes = artifact::fetch_bytes(location).await?;
        let parsed: LexiconArtifact = serde_json::from_slice(&bytes)?;
        Ok(Self::from_artifact(parsed))
    }

    pub fn from_artifact(artifact: LexiconArtifact) -> Self {
        let mut phrase_index = HashMap::new();
        for (label, phrases) in &artifact.labels {
            for phrase in phrases {
                let normalized = normalize_text(phrase);
                if normalized.is_empty() {
                    continue;
                }
                phrase_index.insert(normalized, label.clone());
            }
        }
        debug!(phrases = phrase_index.len(), "Lexicon phrase index built");
        Self {
            max_ngram: artifact.max_ngram,
            phrase_index,
        }
    }

    fn scan(&self, text: &str) -> Vec<NeSpan> {
        let doc = NeDoc::new(text);
        let tokens = tokenize_with_positions(text);
        if tokens.is_empty() {
            return vec![];
        }

        let mut candidates: Vec<Candidate> = Vec::new();

        // Generate n-gram spans
        for start_idx in 0..tokens.len() {
            for ngram_len in 1..=self.max_ngram.min(tokens.len() - start_idx) {
                let end_idx = start_idx + ngram_len;

                let window = &tokens[start_idx..end_idx];
                let normalized = window
                    .iter()
                    .map(|t| t.norm.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");

                if let Some(label) = self.phrase_index.get(&normalized) {
                    candidates.push(Candidate {
                        start: window[0].start,
                        end: window[ngram_len - 1].end,
                        label: label.clone(),
                        ngram_len,
                    });
                }
            }
        }

        let selected = select_non_overlapping(candidates);
        selected
            .into_iter()
            .map(|c| NeSpan::new(&doc, c.start, c.end, c.label))
            .collect()
    }
}

/// Greedy non-overlapping selection, preferring longer matches
fn select_non_overlapping(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    // Sort by n-gram length descending, then by position
    candidates.sort_by(|a, b| {
        b.ngram_len
            .cmp(&a.ngram_len)
            .then_with(|| a.start.cmp(&b.start))
    });

    let mut selected: Vec<Candidate> = Vec::new();

    for candidate in candidates {
        let overlaps = selected
            .iter()
            .any(|s| !(candidate.end <= s.start || candidate.start >= s.end));

        if !overlaps {
            selected.push(candidate);
        }
    }

    // Sort by position for output
    selected.sort_by_key(|s| s.start);
    selected
}

#[async_trait]
impl NerModel for LexiconNer {
    async fn predict(&self, text: &str) -> Result<Vec<NeSpan>, NerError> {
        Ok(self.scan(text))
    }

    async fn bulk_predict(
        &self,
        texts: &[String],
        _batch_size: usize,
    ) -> Result<Vec<Vec<NeSpan>>, NerError> {
        // In-process matching has no batching cost to amortize
        Ok(texts.iter().map(|t| self.scan(t)).collect())
    }
}
