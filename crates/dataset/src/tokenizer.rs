//! Tokenizer seam for the span decoder and training data pipeline.
//!
//! Two implementations: [`CharTokenizer`], a character-level tokenizer in
//! the style of Chinese BERT vocabularies (one token per char, `[CLS]` /
//! `[SEP]` wrapping, `[PAD]` fill), and [`WordPieceTokenizer`], backed by
//! a HuggingFace `tokenizers` file for subword models. Both pad to a
//! fixed maximum length so batch tensors have a uniform shape.

use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// A tokenized sentence, padded to the tokenizer's fixed length.
#[derive(Debug, Clone)]
pub struct Encoding {
    /// Token ids, length `max_len`.
    pub token_ids: Vec<i64>,
    /// Attention mask, 1 for real tokens (specials included), 0 for padding.
    pub attention_mask: Vec<i64>,
    /// Token strings, for offset alignment via `rematch`.
    pub tokens: Vec<String>,
}

/// Fixed-length sentence tokenization.
pub trait SentenceTokenizer {
    /// Tokenize `text`, padding (and truncating) to the fixed length.
    fn encode(&self, text: &str) -> anyhow::Result<Encoding>;

    /// The fixed sequence length every encoding is padded to.
    fn max_len(&self) -> usize;
}

impl<T: SentenceTokenizer + ?Sized> SentenceTokenizer for &T {
    fn encode(&self, text: &str) -> anyhow::Result<Encoding> {
        (**self).encode(text)
    }

    fn max_len(&self) -> usize {
        (**self).max_len()
    }
}

/// Character-level tokenizer: one token per char, ids from the char's
/// code point, `[CLS]`/`[SEP]` wrapping.
#[derive(Debug, Clone)]
pub struct CharTokenizer {
    max_len: usize,
}

const CLS_ID: i64 = 101;
const SEP_ID: i64 = 102;
const PAD_ID: i64 = 0;

impl CharTokenizer {
    /// Create a char tokenizer padding to `max_len` positions.
    ///
    /// `max_len` must be at least 2 to fit the `[CLS]`/`[SEP]` wrapping.
    pub fn new(max_len: usize) -> Self {
        assert!(max_len >= 2, "max_len must fit [CLS] and [SEP]");
        Self { max_len }
    }
}

impl SentenceTokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> anyhow::Result<Encoding> {
        let mut tokens = Vec::with_capacity(self.max_len);
        let mut token_ids = Vec::with_capacity(self.max_len);

        tokens.push("[CLS]".to_string());
        token_ids.push(CLS_ID);
        for c in text.chars().take(self.max_len - 2) {
            tokens.push(c.to_lowercase().collect());
            token_ids.push(c as i64);
        }
        tokens.push("[SEP]".to_string());
        token_ids.push(SEP_ID);

        let real = token_ids.len();
        let mut attention_mask = vec![1i64; real];
        while token_ids.len() < self.max_len {
            tokens.push("[PAD]".to_string());
            token_ids.push(PAD_ID);
            attention_mask.push(0);
        }

        Ok(Encoding {
            token_ids,
            attention_mask,
            tokens,
        })
    }

    fn max_len(&self) -> usize {
        self.max_len
    }
}

/// HuggingFace `tokenizers`-backed WordPiece tokenizer.
pub struct WordPieceTokenizer {
    inner: Tokenizer,
    max_len: usize,
}

impl WordPieceTokenizer {
    /// Load a tokenizer file (`tokenizer.json`) and configure fixed-length
    /// padding and truncation.
    pub fn from_file(path: &std::path::Path, max_len: usize) -> anyhow::Result<Self> {
        let mut inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer {}: {e}", path.display()))?;
        inner.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_len),
            ..Default::default()
        }));
        inner
            .with_truncation(Some(TruncationParams {
                max_length: max_len,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to configure truncation: {e}"))?;
        Ok(Self { inner, max_len })
    }
}

impl SentenceTokenizer for WordPieceTokenizer {
    fn encode(&self, text: &str) -> anyhow::Result<Encoding> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;
        Ok(Encoding {
            token_ids: encoding.get_ids().iter().map(|&id| id as i64).collect(),
            attention_mask: encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect(),
            tokens: encoding.get_tokens().to_vec(),
        })
    }

    fn max_len(&self) -> usize {
        self.max_len
    }
}
