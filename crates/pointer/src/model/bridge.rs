//! Tensor bridge: conversions between plain numeric buffers and burn tensors.
//!
//! The encoder closure produces `Vec<Vec<Vec<f32>>>` hidden states and the
//! data pipeline produces flat target/mask buffers; burn needs typed
//! tensors. The decoder needs the reverse direction, lowering a single
//! sample's score tensor to a plain grid it can scan.

use burn::prelude::*;
use burn::tensor::TensorData;

/// Convert batched per-token hidden states to a `(batch, seq, dim)` tensor.
///
/// # Panics
/// Panics if the batch is empty or sequence lengths / hidden dims are
/// inconsistent across the batch.
pub fn hidden_to_tensor<B: Backend>(
    hidden: &[Vec<Vec<f32>>],
    device: &B::Device,
) -> Tensor<B, 3> {
    assert!(!hidden.is_empty(), "hidden states must not be empty");
    let seq = hidden[0].len();
    assert!(seq > 0, "sequence length must be > 0");
    let dim = hidden[0][0].len();
    assert!(dim > 0, "hidden dimension must be > 0");
    for (i, sample) in hidden.iter().enumerate() {
        assert_eq!(sample.len(), seq, "sample {i} has sequence length {}, expected {seq}", sample.len());
        for (t, token) in sample.iter().enumerate() {
            assert_eq!(token.len(), dim, "sample {i} token {t} has dim {}, expected {dim}", token.len());
        }
    }

    let batch = hidden.len();
    let flat: Vec<f32> = hidden
        .iter()
        .flat_map(|sample| sample.iter().flat_map(|token| token.iter().copied()))
        .collect();
    Tensor::from_data(TensorData::new(flat, [batch, seq, dim]), device)
}

/// Convert batched attention masks to a float `(batch, seq)` tensor.
pub fn mask_to_tensor<B: Backend>(masks: &[Vec<i64>], device: &B::Device) -> Tensor<B, 2> {
    assert!(!masks.is_empty(), "masks must not be empty");
    let seq = masks[0].len();
    let flat: Vec<f32> = masks
        .iter()
        .flat_map(|m| {
            assert_eq!(m.len(), seq, "inconsistent mask lengths in batch");
            m.iter().map(|&v| v as f32)
        })
        .collect();
    Tensor::from_data(TensorData::new(flat, [masks.len(), seq]), device)
}

/// Convert flat per-sample target buffers to a `(batch, seq, categories, 2)` tensor.
///
/// Each buffer is the row-major flattening of a `[seq][categories][2]` grid.
pub fn targets_to_tensor<B: Backend>(
    targets: &[Vec<f32>],
    seq: usize,
    num_categories: usize,
    device: &B::Device,
) -> Tensor<B, 4> {
    assert!(!targets.is_empty(), "targets must not be empty");
    let expected = seq * num_categories * 2;
    let flat: Vec<f32> = targets
        .iter()
        .flat_map(|t| {
            assert_eq!(t.len(), expected, "target buffer has wrong length");
            t.iter().copied()
        })
        .collect();
    Tensor::from_data(
        TensorData::new(flat, [targets.len(), seq, num_categories, 2]),
        device,
    )
}

/// Lower a single-sample score tensor `(1, seq, categories, 2)` to a plain
/// grid `grid[pos][category] = [start_activation, end_activation]`.
///
/// This is the detach boundary: decoding only ever sees plain floats.
///
/// # Panics
/// Panics if the batch dimension is not exactly 1.
pub fn score_grid<B: Backend>(scores: Tensor<B, 4>) -> Vec<Vec<[f32; 2]>> {
    let [batch, seq, categories, two] = scores.dims();
    assert_eq!(batch, 1, "score_grid expects a single sample, got batch={batch}");
    assert_eq!(two, 2, "last score axis must hold start/end pairs");

    let flat: Vec<f32> = scores.into_data().to_vec().unwrap();
    (0..seq)
        .map(|pos| {
            (0..categories)
                .map(|cat| {
                    let base = (pos * categories + cat) * 2;
                    [flat[base], flat[base + 1]]
                })
                .collect()
        })
        .collect()
}
