//! Training data pipeline: labeled samples to binary pointer targets.
//!
//! For every gold entity the builder locates its first character-level
//! occurrence in the text, maps the span endpoints to token positions via
//! the offset mapping, and sets the start/end bits for that category.
//! Entities that cannot be located or whose endpoints fall on uncovered
//! tokens are skipped with a debug log.

use rand::seq::SliceRandom;
use rand::Rng;

use dataset::{rematch, CategoryVocab, LabeledSample, SentenceTokenizer};

/// One prepared training sample: padded ids, mask, and a flat
/// `[seq][categories][2]` target buffer.
#[derive(Debug, Clone)]
pub struct TrainingSample {
    pub token_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub targets: Vec<f32>,
}

/// A fixed-size slice of training samples, columnar for tensor building.
#[derive(Debug, Clone)]
pub struct Batch {
    pub token_ids: Vec<Vec<i64>>,
    pub attention_mask: Vec<Vec<i64>>,
    pub targets: Vec<Vec<f32>>,
}

/// Prepared training data with uniform sequence length.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    samples: Vec<TrainingSample>,
    seq_len: usize,
    num_categories: usize,
}

impl TrainingSet {
    /// Tokenize and build pointer targets for every labeled sample.
    pub fn prepare<T: SentenceTokenizer>(
        samples: &[LabeledSample],
        tokenizer: &T,
        vocab: &CategoryVocab,
    ) -> anyhow::Result<Self> {
        let seq_len = tokenizer.max_len();
        let num_categories = vocab.len();
        let mut prepared = Vec::with_capacity(samples.len());

        for sample in samples {
            let encoding = tokenizer.encode(&sample.text)?;
            let mapping = rematch(&sample.text, &encoding.tokens);
            let mut targets = vec![0.0f32; seq_len * num_categories * 2];

            let chars: Vec<char> = sample.text.chars().collect();
            let char_to_token = invert_mapping(&mapping, chars.len());

            let gold = sample.gold_sets(vocab);
            for (cat, entities) in gold.iter().enumerate() {
                for entity in entities {
                    if !mark_entity(
                        &mut targets,
                        &chars,
                        &char_to_token,
                        entity,
                        cat,
                        num_categories,
                    ) {
                        tracing::debug!(
                            entity = %entity,
                            category = vocab.name(cat).unwrap_or("?"),
                            "gold entity not alignable, skipping"
                        );
                    }
                }
            }

            prepared.push(TrainingSample {
                token_ids: encoding.token_ids,
                attention_mask: encoding.attention_mask,
                targets,
            });
        }

        tracing::info!(samples = prepared.len(), seq_len, "prepared training set");
        Ok(Self {
            samples: prepared,
            seq_len,
            num_categories,
        })
    }

    /// Freshly shuffled batches of up to `batch_size` samples.
    pub fn batches(&self, batch_size: usize, rng: &mut impl Rng) -> Vec<Batch> {
        assert!(batch_size > 0, "batch_size must be > 0");
        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        order.shuffle(rng);

        order
            .chunks(batch_size)
            .map(|chunk| Batch {
                token_ids: chunk.iter().map(|&i| self.samples[i].token_ids.clone()).collect(),
                attention_mask: chunk
                    .iter()
                    .map(|&i| self.samples[i].attention_mask.clone())
                    .collect(),
                targets: chunk.iter().map(|&i| self.samples[i].targets.clone()).collect(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn num_categories(&self) -> usize {
        self.num_categories
    }

    #[cfg(test)]
    pub(crate) fn sample(&self, i: usize) -> &TrainingSample {
        &self.samples[i]
    }
}

/// Char index → covering token position, from the offset mapping.
fn invert_mapping(mapping: &[Vec<usize>], num_chars: usize) -> Vec<Option<usize>> {
    let mut lut = vec![None; num_chars];
    for (token, covered) in mapping.iter().enumerate() {
        for &c in covered {
            if c < num_chars {
                lut[c] = Some(token);
            }
        }
    }
    lut
}

/// Set the start/end target bits for the first occurrence of `entity`.
///
/// Returns false when the entity text is absent or its endpoints are not
/// covered by any token.
fn mark_entity(
    targets: &mut [f32],
    chars: &[char],
    char_to_token: &[Option<usize>],
    entity: &str,
    cat: usize,
    num_categories: usize,
) -> bool {
    let needle: Vec<char> = entity.chars().collect();
    if needle.is_empty() || chars.len() < needle.len() {
        return false;
    }
    let found = (0..=chars.len() - needle.len())
        .find(|&i| chars[i..i + needle.len()] == needle[..]);
    let Some(start_char) = found else {
        return false;
    };
    let end_char = start_char + needle.len() - 1;

    let (Some(start_tok), Some(end_tok)) = (char_to_token[start_char], char_to_token[end_char])
    else {
        return false;
    };

    targets[(start_tok * num_categories + cat) * 2] = 1.0;
    targets[(end_tok * num_categories + cat) * 2 + 1] = 1.0;
    true
}
