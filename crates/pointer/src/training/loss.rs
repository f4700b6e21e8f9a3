//! Masked binary cross-entropy over the start/end pointer grid.
//!
//! The loss is generic over `B: Backend` and operates on burn tensors.
//! Reduction order matters: mean over the start/end pair, sum over
//! categories, then a mask-weighted average over batch positions so
//! padding never contributes.

use burn::prelude::*;

/// Probability clamp keeping `log` finite.
const EPS: f32 = 1e-7;

/// Masked pointer BCE.
///
/// # Arguments
/// - `scores`: shape `(batch, seq, categories, 2)` — sigmoid activations
/// - `targets`: shape `(batch, seq, categories, 2)` — 0/1 gold bits
/// - `mask`: shape `(batch, seq)` — 1.0 for real tokens, 0.0 for padding
///
/// # Returns
/// Scalar loss tensor of shape `(1,)`.
pub fn masked_pointer_loss<B: Backend>(
    scores: Tensor<B, 4>,
    targets: Tensor<B, 4>,
    mask: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let p = scores.clamp(EPS, 1.0 - EPS);

    // -(t*ln(p) + (1-t)*ln(1-p)) per grid cell
    let one_minus_p = p.clone().neg().add_scalar(1.0);
    let one_minus_t = targets.clone().neg().add_scalar(1.0);
    let elementwise = (targets * p.log() + one_minus_t * one_minus_p.log()).neg();

    // (batch, seq, categories, 2) → mean over the pair → sum over categories
    let per_position = elementwise
        .mean_dim(3)
        .squeeze::<3>(3)
        .sum_dim(2)
        .squeeze::<2>(2);

    // Mask-weighted average over every real token position.
    let mask_total = mask.clone().sum().clamp_min(1.0);
    (per_position * mask).sum() / mask_total
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::backend::Autodiff;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn tensor4(
        data: Vec<f32>,
        shape: [usize; 4],
        device: &<TestBackend as Backend>::Device,
    ) -> Tensor<TestBackend, 4> {
        Tensor::from_data(TensorData::new(data, shape), device)
    }

    #[test]
    fn test_uniform_half_scores_give_ln2_per_category() {
        let device = Default::default();
        // p = 0.5 everywhere: each cell costs ln 2 regardless of target.
        // Mean over the pair keeps ln 2; sum over 3 categories gives 3 ln 2.
        let shape = [2, 4, 3, 2];
        let n = shape.iter().product();
        let scores = tensor4(vec![0.5; n], shape, &device);
        let targets = tensor4(vec![0.0; n], shape, &device);
        let mask = Tensor::<TestBackend, 2>::ones([2, 4], &device);

        let loss: f32 = masked_pointer_loss(scores, targets, mask)
            .into_scalar()
            .elem();
        let expected = 3.0 * 2.0_f32.ln();
        assert!(
            (loss - expected).abs() < 1e-5,
            "expected {expected}, got {loss}"
        );
    }

    #[test]
    fn test_confident_correct_scores_near_zero_loss() {
        let device = Default::default();
        let shape = [1, 2, 1, 2];
        let targets = tensor4(vec![1.0, 0.0, 0.0, 1.0], shape, &device);
        let scores = tensor4(vec![0.999, 0.001, 0.001, 0.999], shape, &device);
        let mask = Tensor::<TestBackend, 2>::ones([1, 2], &device);

        let loss: f32 = masked_pointer_loss(scores, targets, mask)
            .into_scalar()
            .elem();
        assert!(loss < 0.01, "confident correct predictions, got {loss}");
    }

    #[test]
    fn test_confident_wrong_scores_high_loss() {
        let device = Default::default();
        let shape = [1, 1, 1, 2];
        let targets = tensor4(vec![1.0, 0.0], shape, &device);
        let scores = tensor4(vec![0.001, 0.999], shape, &device);
        let mask = Tensor::<TestBackend, 2>::ones([1, 1], &device);

        let loss: f32 = masked_pointer_loss(scores, targets, mask)
            .into_scalar()
            .elem();
        assert!(loss > 4.0, "confident wrong predictions, got {loss}");
    }

    #[test]
    fn test_padding_positions_excluded() {
        let device = Default::default();
        // Position 1 is wildly wrong but masked out; only position 0 counts.
        let shape = [1, 2, 1, 2];
        let targets = tensor4(vec![0.0, 0.0, 1.0, 1.0], shape, &device);
        let scores = tensor4(vec![0.5, 0.5, 0.001, 0.001], shape, &device);
        let mask = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![1.0f32, 0.0], [1, 2]),
            &device,
        );

        let loss: f32 = masked_pointer_loss(scores, targets, mask)
            .into_scalar()
            .elem();
        let expected = 2.0_f32.ln();
        assert!(
            (loss - expected).abs() < 1e-5,
            "expected {expected} from the unmasked position only, got {loss}"
        );
    }

    #[test]
    fn test_average_weighted_by_mask_count() {
        let device = Default::default();
        // Two real positions out of four: divisor is 2, not 4.
        let shape = [1, 4, 1, 2];
        let n = shape.iter().product();
        let scores = tensor4(vec![0.5; n], shape, &device);
        let targets = tensor4(vec![0.0; n], shape, &device);
        let mask = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![1.0f32, 1.0, 0.0, 0.0], [1, 4]),
            &device,
        );

        let loss: f32 = masked_pointer_loss(scores, targets, mask)
            .into_scalar()
            .elem();
        assert!((loss - 2.0_f32.ln()).abs() < 1e-5, "got {loss}");
    }

    #[test]
    fn test_extreme_scores_stay_finite() {
        let device = Default::default();
        let shape = [1, 1, 1, 2];
        let targets = tensor4(vec![1.0, 0.0], shape, &device);
        let scores = tensor4(vec![0.0, 1.0], shape, &device);
        let mask = Tensor::<TestBackend, 2>::ones([1, 1], &device);

        let loss: f32 = masked_pointer_loss(scores, targets, mask)
            .into_scalar()
            .elem();
        assert!(loss.is_finite(), "clamp must keep the loss finite");
    }

    #[test]
    fn test_gradient_flows_through_scores() {
        let device = Default::default();
        let shape = [1, 2, 2, 2];
        let n: usize = shape.iter().product();
        let scores = Tensor::<TestAutodiffBackend, 4>::from_data(
            TensorData::new(vec![0.3f32; n], shape),
            &device,
        )
        .require_grad();
        let targets = Tensor::<TestAutodiffBackend, 4>::from_data(
            TensorData::new(vec![1.0f32; n], shape),
            &device,
        );
        let mask = Tensor::<TestAutodiffBackend, 2>::ones([1, 2], &device);

        let loss = masked_pointer_loss(scores.clone(), targets, mask);
        let grads = loss.backward();
        let grad = scores.grad(&grads).unwrap();
        let grad_data: Vec<f32> = grad.into_data().to_vec().unwrap();
        // Targets are all 1 and p = 0.3: every gradient pushes p upward.
        for &g in &grad_data {
            assert!(g < 0.0, "expected negative gradient, got {g}");
        }
    }
}
