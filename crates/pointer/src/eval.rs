//! Per-category precision/recall/F1 evaluation over a labeled dataset.
//!
//! Counts use ε-smoothed denominators so categories that never appear in
//! gold or predictions score ~0 instead of dividing by zero. Such
//! categories stay in the mean-F1 average at ~0 (preserved behavior of
//! the trained system; see DESIGN.md).

use std::collections::{HashMap, HashSet};

use burn::prelude::*;
use dataset::{CategoryVocab, LabeledSample, SentenceTokenizer};

use crate::decode::SpanDecoder;
use crate::model::scoring::ScoringModel;

/// Smoothing constant for predicted/gold denominators.
pub const SMOOTHING_EPS: f64 = 1e-10;

/// Precision, recall and F1 for one category.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CategoryMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Running counts for one category: true positives, predicted, gold.
#[derive(Debug, Clone)]
pub struct Counts {
    a: f64,
    b: f64,
    c: f64,
}

impl Counts {
    fn new() -> Self {
        Self {
            a: 0.0,
            b: SMOOTHING_EPS,
            c: SMOOTHING_EPS,
        }
    }

    fn metrics(&self) -> CategoryMetrics {
        CategoryMetrics {
            precision: self.a / self.b,
            recall: self.a / self.c,
            f1: 2.0 * self.a / (self.b + self.c),
        }
    }
}

/// Evaluates a scoring model over labeled samples.
pub struct Evaluator<'a, T> {
    decoder: &'a SpanDecoder<T>,
    vocab: &'a CategoryVocab,
}

impl<'a, T: SentenceTokenizer> Evaluator<'a, T> {
    pub fn new(decoder: &'a SpanDecoder<T>, vocab: &'a CategoryVocab) -> Self {
        Self { decoder, vocab }
    }

    /// Evaluate `model` on `samples`: category display name → metrics.
    pub fn evaluate<B: Backend>(
        &self,
        model: &ScoringModel<'_, B>,
        samples: &[LabeledSample],
    ) -> anyhow::Result<HashMap<String, CategoryMetrics>> {
        self.evaluate_with(samples, |text| self.decoder.extract_entities(text, model))
    }

    /// Evaluate with an arbitrary prediction function. The seam used by
    /// `evaluate`; also lets tests score canned predictions.
    pub fn evaluate_with(
        &self,
        samples: &[LabeledSample],
        mut predict: impl FnMut(&str) -> anyhow::Result<HashMap<usize, HashSet<String>>>,
    ) -> anyhow::Result<HashMap<String, CategoryMetrics>> {
        let mut counts = vec![Counts::new(); self.vocab.len()];
        for sample in samples {
            let predicted = predict(&sample.text)?;
            let gold = sample.gold_sets(self.vocab);
            accumulate(&mut counts, &predicted, &gold);
        }

        Ok(self
            .vocab
            .names()
            .iter()
            .zip(&counts)
            .map(|(name, count)| (name.clone(), count.metrics()))
            .collect())
    }
}

/// Fold one sample's predicted and gold sets into the running counts.
///
/// Every gold category (by construction: all of them) contributes; a
/// category absent from the predictions counts as an empty predicted set.
/// True positives use exact string equality.
fn accumulate(
    counts: &mut [Counts],
    predicted: &HashMap<usize, HashSet<String>>,
    gold: &[HashSet<String>],
) {
    for (cat, gold_set) in gold.iter().enumerate() {
        let predicted_set = predicted.get(&cat);
        let hits = predicted_set
            .map(|p| p.intersection(gold_set).count())
            .unwrap_or(0);
        counts[cat].a += hits as f64;
        counts[cat].b += predicted_set.map_or(0, HashSet::len) as f64;
        counts[cat].c += gold_set.len() as f64;
    }
}

/// Arithmetic mean F1 over all categories, equal per-category weight.
pub fn mean_f1(results: &HashMap<String, CategoryMetrics>) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.values().map(|m| m.f1).sum::<f64>() / results.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::SpanDecoder;
    use dataset::CharTokenizer;

    fn vocab() -> CategoryVocab {
        CategoryVocab::new(vec!["PERSON".to_string(), "ORG".to_string()]).unwrap()
    }

    fn sample(json: &str) -> LabeledSample {
        serde_json::from_str(json).unwrap()
    }

    fn eval_one(
        json: &str,
        predictions: HashMap<usize, HashSet<String>>,
    ) -> HashMap<String, CategoryMetrics> {
        let vocab = vocab();
        let tokenizer = CharTokenizer::new(32);
        let decoder = SpanDecoder::new(&tokenizer, 0.5);
        let evaluator = Evaluator::new(&decoder, &vocab);
        evaluator
            .evaluate_with(&[sample(json)], |_| Ok(predictions.clone()))
            .unwrap()
    }

    #[test]
    fn test_identical_sets_score_one() {
        let predictions = HashMap::from([
            (0, HashSet::from(["John".to_string()])),
            (1, HashSet::from(["Acme".to_string()])),
        ]);
        let results = eval_one(
            r#"{"text": "John works at Acme", "PERSON": "John", "ORG": ["Acme"]}"#,
            predictions,
        );
        for name in ["PERSON", "ORG"] {
            let m = &results[name];
            assert!((m.precision - 1.0).abs() < 1e-9, "{name} precision {}", m.precision);
            assert!((m.recall - 1.0).abs() < 1e-9);
            assert!((m.f1 - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_disjoint_sets_score_zero() {
        let predictions = HashMap::from([(0, HashSet::from(["Jane".to_string()]))]);
        let results = eval_one(r#"{"text": "John", "PERSON": "John"}"#, predictions);
        let m = &results["PERSON"];
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn test_absent_category_smoothed_not_divide_error() {
        // ORG never appears in gold and is never predicted.
        let predictions = HashMap::from([(0, HashSet::from(["John".to_string()]))]);
        let results = eval_one(r#"{"text": "John", "PERSON": "John"}"#, predictions);
        let m = &results["ORG"];
        assert!(m.f1.is_finite());
        assert!(m.f1.abs() < 1e-6);
        assert!(m.precision.is_finite() && m.recall.is_finite());
    }

    #[test]
    fn test_partial_overlap() {
        // Gold {John, Mary}, predicted {John, Bob}: A=1, B=2, C=2.
        let predictions = HashMap::from([(
            0,
            HashSet::from(["John".to_string(), "Bob".to_string()]),
        )]);
        let results = eval_one(
            r#"{"text": "John and Mary", "PERSON": ["John", "Mary"]}"#,
            predictions,
        );
        let m = &results["PERSON"];
        assert!((m.precision - 0.5).abs() < 1e-9);
        assert!((m.recall - 0.5).abs() < 1e-9);
        assert!((m.f1 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_mean_f1_includes_zero_categories() {
        let predictions = HashMap::from([(0, HashSet::from(["John".to_string()]))]);
        let results = eval_one(r#"{"text": "John", "PERSON": "John"}"#, predictions);
        // PERSON ≈ 1.0, ORG ≈ 0.0 → mean ≈ 0.5.
        assert!((mean_f1(&results) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_counts_accumulate_across_samples() {
        let vocab = vocab();
        let tokenizer = CharTokenizer::new(32);
        let decoder = SpanDecoder::new(&tokenizer, 0.5);
        let evaluator = Evaluator::new(&decoder, &vocab);

        let samples = vec![
            sample(r#"{"text": "John", "PERSON": "John"}"#),
            sample(r#"{"text": "Mary", "PERSON": "Mary"}"#),
        ];
        // Predict correctly for the first sample only.
        let mut call = 0;
        let results = evaluator
            .evaluate_with(&samples, |_| {
                call += 1;
                Ok(if call == 1 {
                    HashMap::from([(0, HashSet::from(["John".to_string()]))])
                } else {
                    HashMap::new()
                })
            })
            .unwrap();
        let m = &results["PERSON"];
        // A=1, B=1, C=2.
        assert!((m.precision - 1.0).abs() < 1e-9);
        assert!((m.recall - 0.5).abs() < 1e-9);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_f1_empty_results() {
        assert_eq!(mean_f1(&HashMap::new()), 0.0);
    }
}
