//! Span decoding: start/end activation grids to character-level entity spans.
//!
//! Decoding is greedy: every start candidate binds to the FIRST end
//! candidate at or after it in the same category, then stops scanning.
//! A start therefore yields at most one span per decode. This matches the
//! trained decoding scheme exactly and must not be "improved" to collect
//! all compatible ends.

use std::collections::{HashMap, HashSet};

use burn::prelude::*;
use dataset::{rematch, OffsetMapping, SentenceTokenizer};

use crate::model::bridge::score_grid;
use crate::model::scoring::ScoringModel;

/// Decodes entity spans from scoring-model output.
pub struct SpanDecoder<T> {
    tokenizer: T,
    threshold: f32,
}

impl<T: SentenceTokenizer> SpanDecoder<T> {
    /// Create a decoder with the given decision threshold in `[0, 1]`.
    pub fn new(tokenizer: T, threshold: f32) -> Self {
        Self {
            tokenizer,
            threshold,
        }
    }

    /// The decoder's tokenizer, shared with the training data pipeline.
    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// Extract entities from `text`: category id → set of span texts.
    ///
    /// Only categories with at least one decoded span appear in the map.
    pub fn extract_entities<B: Backend>(
        &self,
        text: &str,
        model: &ScoringModel<'_, B>,
    ) -> anyhow::Result<HashMap<usize, HashSet<String>>> {
        let encoding = self.tokenizer.encode(text)?;
        let mapping = rematch(text, &encoding.tokens);
        let scores = model.score(
            std::slice::from_ref(&encoding.token_ids),
            std::slice::from_ref(&encoding.attention_mask),
        )?;
        let grid = score_grid(scores);
        Ok(decode_grid(&grid, &mapping, text, self.threshold))
    }
}

/// Decode a score grid against an offset mapping.
///
/// `grid[pos][category] = [start_activation, end_activation]`. Candidates
/// are positions whose activation strictly exceeds `threshold`, collected
/// in position-major order. Each start binds greedily to its first
/// compatible end (same category, `end >= start`); pairs touching a token
/// with no character coverage are skipped silently, but the scan for that
/// start still stops.
pub fn decode_grid(
    grid: &[Vec<[f32; 2]>],
    mapping: &OffsetMapping,
    text: &str,
    threshold: f32,
) -> HashMap<usize, HashSet<String>> {
    let chars: Vec<char> = text.chars().collect();

    let mut starts = Vec::new();
    let mut ends = Vec::new();
    for (pos, row) in grid.iter().enumerate() {
        for (cat, activations) in row.iter().enumerate() {
            if activations[0] > threshold {
                starts.push((pos, cat));
            }
            if activations[1] > threshold {
                ends.push((pos, cat));
            }
        }
    }

    let mut results: HashMap<usize, HashSet<String>> = HashMap::new();
    for &(start, start_cat) in &starts {
        for &(end, end_cat) in &ends {
            if start <= end && start_cat == end_cat {
                let span = mapping
                    .get(start)
                    .and_then(|m| m.first())
                    .zip(mapping.get(end).and_then(|m| m.last()));
                if let Some((&first_char, &last_char)) = span {
                    if last_char < chars.len() {
                        let entity: String = chars[first_char..=last_char].iter().collect();
                        results.entry(start_cat).or_default().insert(entity);
                    }
                }
                break;
            }
        }
    }
    results
}
