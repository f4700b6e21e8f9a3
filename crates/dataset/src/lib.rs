//! Dataset loading and text alignment for pointer-network NER.
//!
//! Provides the category vocabulary, labeled-sample JSON loading,
//! the tokenizer seam, and token-to-character offset alignment used
//! by the span decoder and the training target builder.

pub mod align;
pub mod categories;
pub mod records;
pub mod tokenizer;

pub use align::{rematch, OffsetMapping};
pub use categories::CategoryVocab;
pub use records::{load_samples, GoldField, LabeledSample};
pub use tokenizer::{CharTokenizer, Encoding, SentenceTokenizer, WordPieceTokenizer};
