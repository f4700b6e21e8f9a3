//! Binary-pointer span extraction on top of a frozen transformer encoder.
//!
//! Provides the trainable pointer head (a burn module mapping encoder
//! hidden states to per-category start/end activation grids), the span
//! decoder that turns those grids into character-level entity spans, the
//! per-category precision/recall/F1 evaluator, and the epoch training
//! loop with best-checkpoint selection and early stopping. The encoder
//! itself lives outside this crate and is injected as a closure mapping
//! `(token ids, attention mask)` to per-token hidden states.

pub mod decode;
pub mod eval;
pub mod model;
pub mod predict;
pub mod training;

pub use decode::SpanDecoder;
pub use eval::{mean_f1, CategoryMetrics, Evaluator};
pub use model::head::{PointerHead, PointerHeadConfig};
pub use model::scoring::{EncodeFn, ScoringModel};
pub use predict::Predictor;
pub use training::data::TrainingSet;
pub use training::trainer::{
    load_checkpoint, train, SelectionState, TrainerConfig, TrainingOutcome, TrainingReport,
};
