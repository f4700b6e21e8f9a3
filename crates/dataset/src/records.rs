//! Labeled-sample records and JSON dataset loading.
//!
//! A dataset file is a JSON array of records. Each record has a `text`
//! field plus zero or more category-named fields holding the gold entities
//! for that category, either as a single string or a list of strings.
//! The string-vs-list shape is captured as a serde union at the loading
//! boundary, so a gold field of any other JSON type fails deserialization
//! instead of being silently dropped.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::categories::CategoryVocab;

/// Gold entities for one category in one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoldField {
    /// A single gold entity string.
    One(String),
    /// Multiple gold entity strings.
    Many(Vec<String>),
}

impl GoldField {
    /// All gold strings in this field.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::One(s) => std::slice::from_ref(s).iter(),
            Self::Many(v) => v.iter(),
        }
        .map(String::as_str)
    }
}

/// One labeled sample: raw text plus gold entities keyed by category name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSample {
    /// The raw input text.
    pub text: String,
    /// Gold entity fields, keyed by category display name.
    #[serde(flatten)]
    pub entities: HashMap<String, GoldField>,
}

impl LabeledSample {
    /// Gold entity sets indexed by category id.
    ///
    /// Every category in the vocabulary gets an entry, empty when the
    /// record has no field for it, so zero-gold categories still
    /// participate in scoring. Fields naming categories outside the
    /// vocabulary are ignored.
    pub fn gold_sets(&self, vocab: &CategoryVocab) -> Vec<HashSet<String>> {
        let mut sets = vec![HashSet::new(); vocab.len()];
        for (name, field) in &self.entities {
            match vocab.id(name) {
                Some(id) => sets[id].extend(field.texts().map(str::to_string)),
                None => {
                    tracing::debug!(field = %name, "ignoring gold field outside category vocabulary");
                }
            }
        }
        sets
    }
}

/// Load a JSON-array dataset file.
///
/// # Errors
/// Fails on I/O errors and on records whose gold fields are neither a
/// string nor a list of strings.
pub fn load_samples(path: &Path) -> anyhow::Result<Vec<LabeledSample>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read dataset {}: {e}", path.display()))?;
    let samples: Vec<LabeledSample> = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse dataset {}: {e}", path.display()))?;
    tracing::info!(samples = samples.len(), path = %path.display(), "loaded dataset");
    Ok(samples)
}
