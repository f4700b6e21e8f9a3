use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

/// Configuration for the binary pointer head.
///
/// Maps encoder hidden states to sigmoid-normalized start/end activation
/// grids, one pair of activations per category per token position:
///
/// ```text
/// (batch, seq, d_encoder)
///   → Dropout
///   → Linear(d_encoder → num_categories * 2)
///   → sigmoid
///   → reshape: (batch, seq, num_categories, 2)
/// ```
#[derive(Config, Debug)]
pub struct PointerHeadConfig {
    /// Encoder output dimension (e.g. 768 for a BERT-base encoder).
    pub d_encoder: usize,
    /// Number of entity categories.
    pub num_categories: usize,
    /// Dropout probability applied to the encoder hidden states.
    #[config(default = 0.1)]
    pub dropout: f64,
}

/// Binary pointer head: the only trainable component — the encoder is frozen.
///
/// Output index 0 is the start activation, index 1 the end activation,
/// both in `[0, 1]` after the sigmoid.
#[derive(Module, Debug)]
pub struct PointerHead<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
    num_categories: usize,
}

impl PointerHeadConfig {
    /// Initialize a PointerHead with the given configuration.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PointerHead<B> {
        PointerHead {
            linear: LinearConfig::new(self.d_encoder, self.num_categories * 2).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            num_categories: self.num_categories,
        }
    }
}

impl<B: Backend> PointerHead<B> {
    /// Forward pass: encoder hidden states to start/end activation grids.
    ///
    /// Input shape: `(batch, seq, d_encoder)`
    /// Output shape: `(batch, seq, num_categories, 2)`
    pub fn forward(&self, hidden: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch, seq, _] = hidden.dims();
        let x = self.dropout.forward(hidden);
        let logits = self.linear.forward(x);
        sigmoid(logits).reshape([batch, seq, self.num_categories, 2])
    }
}
