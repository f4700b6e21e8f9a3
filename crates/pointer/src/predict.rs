//! Single-sentence prediction façade.

use std::collections::HashMap;

use burn::prelude::*;
use dataset::{CategoryVocab, SentenceTokenizer};

use crate::decode::SpanDecoder;
use crate::model::scoring::ScoringModel;

/// Thin wrapper over the span decoder for serving single sentences,
/// mapping category ids back to display names.
pub struct Predictor<'a, T, B: Backend> {
    decoder: &'a SpanDecoder<T>,
    vocab: &'a CategoryVocab,
    model: ScoringModel<'a, B>,
}

impl<'a, T: SentenceTokenizer, B: Backend> Predictor<'a, T, B> {
    pub fn new(
        decoder: &'a SpanDecoder<T>,
        vocab: &'a CategoryVocab,
        model: ScoringModel<'a, B>,
    ) -> Self {
        Self {
            decoder,
            vocab,
            model,
        }
    }

    /// Predict entities in one sentence: category name → span texts.
    ///
    /// Span lists are sorted for stable output.
    pub fn predict_one(&self, sentence: &str) -> anyhow::Result<HashMap<String, Vec<String>>> {
        let by_id = self.decoder.extract_entities(sentence, &self.model)?;
        let mut results = HashMap::with_capacity(by_id.len());
        for (cat, spans) in by_id {
            if let Some(name) = self.vocab.name(cat) {
                let mut spans: Vec<String> = spans.into_iter().collect();
                spans.sort();
                results.insert(name.to_string(), spans);
            }
        }
        Ok(results)
    }
}
