//! Scoring model: frozen encoder closure + trainable pointer head.
//!
//! The encoder lives outside this crate (an HTTP hidden-state service in
//! the CLI, a deterministic mock in tests) and is injected as a closure,
//! keeping the core device- and framework-agnostic about how hidden
//! states are produced.

use burn::prelude::*;

use crate::model::bridge::hidden_to_tensor;
use crate::model::head::PointerHead;

/// Encoder closure: batched `(token ids, attention mask)` to per-token
/// hidden states of shape `[batch][seq][d_encoder]`.
pub type EncodeFn = dyn Fn(&[Vec<i64>], &[Vec<i64>]) -> anyhow::Result<Vec<Vec<Vec<f32>>>>
    + Send
    + Sync;

/// A complete scoring model: callable with token ids + attention mask,
/// yields the `(batch, seq, categories, 2)` start/end activation tensor.
pub struct ScoringModel<'a, B: Backend> {
    head: PointerHead<B>,
    encode_fn: &'a EncodeFn,
    device: B::Device,
}

impl<'a, B: Backend> ScoringModel<'a, B> {
    /// Pair a pointer head with an encoder closure.
    pub fn new(head: PointerHead<B>, encode_fn: &'a EncodeFn, device: B::Device) -> Self {
        Self {
            head,
            encode_fn,
            device,
        }
    }

    /// Score a batch of tokenized sentences.
    pub fn score(
        &self,
        token_ids: &[Vec<i64>],
        attention_mask: &[Vec<i64>],
    ) -> anyhow::Result<Tensor<B, 4>> {
        let hidden = (self.encode_fn)(token_ids, attention_mask)?;
        let tensor = hidden_to_tensor::<B>(&hidden, &self.device);
        Ok(self.head.forward(tensor))
    }

    /// The underlying pointer head.
    pub fn head(&self) -> &PointerHead<B> {
        &self.head
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Deterministic mock encoder: hidden states derived from the token id
    /// and position, so scores are reproducible without a real model.
    pub fn mock_encode_fn(
        dim: usize,
    ) -> Box<dyn Fn(&[Vec<i64>], &[Vec<i64>]) -> anyhow::Result<Vec<Vec<Vec<f32>>>> + Send + Sync>
    {
        Box::new(move |ids: &[Vec<i64>], _mask: &[Vec<i64>]| {
            Ok(ids
                .iter()
                .map(|sample| {
                    sample
                        .iter()
                        .enumerate()
                        .map(|(pos, &id)| {
                            (0..dim)
                                .map(|d| {
                                    let seed = id as f32 * 0.013 + pos as f32 * 0.07 + d as f32;
                                    seed.sin() * 0.5
                                })
                                .collect()
                        })
                        .collect()
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::mock_encode_fn;
    use super::*;
    use crate::model::head::PointerHeadConfig;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_score_shape() {
        let device = Default::default();
        let head = PointerHeadConfig::new(8, 3)
            .with_dropout(0.0)
            .init::<TestBackend>(&device);
        let encode = mock_encode_fn(8);
        let model = ScoringModel::new(head, &*encode, device);

        let ids = vec![vec![101i64, 5, 6, 102], vec![101, 7, 0, 0]];
        let mask = vec![vec![1i64, 1, 1, 1], vec![1, 1, 0, 0]];
        let scores = model.score(&ids, &mask).unwrap();
        assert_eq!(scores.dims(), [2, 4, 3, 2]);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let head = PointerHeadConfig::new(8, 2)
            .with_dropout(0.0)
            .init::<TestBackend>(&device);
        let encode = mock_encode_fn(8);
        let model = ScoringModel::new(head, &*encode, device);

        let ids = vec![vec![101i64, 42, 102]];
        let mask = vec![vec![1i64, 1, 1]];
        let a: Vec<f32> = model.score(&ids, &mask).unwrap().into_data().to_vec().unwrap();
        let b: Vec<f32> = model.score(&ids, &mask).unwrap().into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encoder_error_propagates() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let head = PointerHeadConfig::new(8, 2).init::<TestBackend>(&device);
        let failing: Box<
            dyn Fn(&[Vec<i64>], &[Vec<i64>]) -> anyhow::Result<Vec<Vec<Vec<f32>>>> + Send + Sync,
        > = Box::new(|_, _| anyhow::bail!("encoder down"));
        let model = ScoringModel::new(head, &*failing, device);

        let err = model.score(&[vec![1]], &[vec![1]]).unwrap_err();
        assert!(err.to_string().contains("encoder down"));
    }
}
