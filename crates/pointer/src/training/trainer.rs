//! Epoch-based training loop for the pointer head.
//!
//! Each epoch runs AdamW over freshly shuffled batches, then scores the
//! dev set with the non-autodiff copy of the head. Checkpointing keeps the
//! single best model by mean F1 (ties replace, so a later equal model
//! wins), and early stopping fires once the model has gone more than
//! `patience` epochs without matching its best score.

use std::path::Path;
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{AdamWConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::AutodiffBackend;
use rand::SeedableRng;

use dataset::{CategoryVocab, LabeledSample, SentenceTokenizer};

use crate::decode::SpanDecoder;
use crate::eval::{mean_f1, Evaluator};
use crate::model::bridge::{hidden_to_tensor, mask_to_tensor, targets_to_tensor};
use crate::model::head::{PointerHead, PointerHeadConfig};
use crate::model::scoring::{EncodeFn, ScoringModel};
use crate::training::data::TrainingSet;
use crate::training::loss::masked_pointer_loss;

/// Configuration for pointer-head training.
#[derive(Config, Debug)]
pub struct TrainerConfig {
    /// Training batch size.
    #[config(default = 32)]
    pub batch_size: usize,
    /// AdamW learning rate.
    #[config(default = 5e-5)]
    pub learning_rate: f64,
    /// Maximum number of epochs.
    #[config(default = 30)]
    pub epochs: usize,
    /// Whether to stop once dev F1 stops improving.
    #[config(default = true)]
    pub early_stop: bool,
    /// Epochs without a new best F1 tolerated before stopping.
    #[config(default = 2)]
    pub patience: usize,
    /// Directory receiving the best-model checkpoint.
    #[config(default = "String::from(\"checkpoints\")")]
    pub checkpoints_dir: String,
}

/// Best-model bookkeeping across epochs.
///
/// An epoch "improves" when its F1 is greater than OR EQUAL to the best
/// seen, so a tie replaces the stored best and resets the stale counter.
#[derive(Debug, Clone)]
pub struct SelectionState {
    pub best_f1: f64,
    pub best_epoch: usize,
    stale: usize,
}

impl SelectionState {
    pub fn new() -> Self {
        Self {
            best_f1: 0.0,
            best_epoch: 0,
            stale: 0,
        }
    }

    /// Record one epoch's dev F1. Returns true when this epoch becomes
    /// the new best (and its checkpoint should be written).
    pub fn observe(&mut self, f1: f64, epoch: usize) -> bool {
        if f1 >= self.best_f1 {
            self.best_f1 = f1;
            self.best_epoch = epoch;
            self.stale = 0;
            true
        } else {
            self.stale += 1;
            false
        }
    }

    /// True once strictly more than `patience` epochs have passed without
    /// an improvement.
    pub fn should_stop(&self, patience: usize) -> bool {
        self.stale > patience
    }
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// How the training loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TrainingOutcome {
    /// All configured epochs ran.
    Completed,
    /// Patience was exhausted before the epoch budget.
    EarlyStopped,
}

/// Summary of a finished training run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingReport {
    pub outcome: TrainingOutcome,
    pub epochs_run: usize,
    pub best_f1: f64,
    pub best_epoch: usize,
    pub checkpoint: String,
}

/// Run the pointer-head training loop.
///
/// The encoder is frozen behind `encode_fn`; only the head receives
/// gradients. Every epoch evaluates on `dev_samples` and the best head by
/// mean F1 is saved to `{checkpoints_dir}/best_model`.
///
/// # Returns
/// The head in its final (last-epoch) state plus the run report; callers
/// wanting the best head reload it via [`load_checkpoint`].
pub fn train<B: AutodiffBackend, T: SentenceTokenizer>(
    config: &TrainerConfig,
    head: PointerHead<B>,
    encode_fn: &EncodeFn,
    train_set: &TrainingSet,
    dev_samples: &[LabeledSample],
    decoder: &SpanDecoder<T>,
    vocab: &CategoryVocab,
    device: &B::Device,
) -> anyhow::Result<(PointerHead<B>, TrainingReport)> {
    let evaluator = Evaluator::new(decoder, vocab);

    tracing::info!(
        samples = train_set.len(),
        dev_samples = dev_samples.len(),
        batch_size = config.batch_size,
        lr = config.learning_rate,
        epochs = config.epochs,
        "starting training"
    );

    // Dev evaluation runs on the non-autodiff copy (dropout disabled).
    train_with_eval(config, head, encode_fn, train_set, device, |eval_head| {
        let eval_model = ScoringModel::new(eval_head, encode_fn, device.clone());
        let results = evaluator.evaluate(&eval_model, dev_samples)?;
        Ok(mean_f1(&results))
    })
}

/// The epoch loop behind [`train`], with the per-epoch dev evaluation
/// injected as a closure.
fn train_with_eval<B: AutodiffBackend>(
    config: &TrainerConfig,
    mut head: PointerHead<B>,
    encode_fn: &EncodeFn,
    train_set: &TrainingSet,
    device: &B::Device,
    mut evaluate: impl FnMut(PointerHead<B::InnerBackend>) -> anyhow::Result<f64>,
) -> anyhow::Result<(PointerHead<B>, TrainingReport)> {
    if train_set.is_empty() {
        anyhow::bail!("training set is empty");
    }
    std::fs::create_dir_all(&config.checkpoints_dir)?;
    let checkpoint = format!("{}/best_model", config.checkpoints_dir);

    // Epsilon matches the optimizer the head was tuned with.
    let mut optimizer = AdamWConfig::new().with_epsilon(1e-5).init();
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let mut rng = rand::rngs::StdRng::from_entropy();
    let mut selection = SelectionState::new();
    let mut outcome = TrainingOutcome::Completed;
    let mut epochs_run = 0;
    let train_start = Instant::now();

    for epoch in 0..config.epochs {
        let epoch_start = Instant::now();
        let batches = train_set.batches(config.batch_size, &mut rng);
        let num_batches = batches.len();
        let mut loss_sum = 0.0f64;

        for batch in batches {
            let hidden = encode_fn(&batch.token_ids, &batch.attention_mask)?;
            let hidden = hidden_to_tensor::<B>(&hidden, device);
            let scores = head.forward(hidden);
            let targets = targets_to_tensor::<B>(
                &batch.targets,
                train_set.seq_len(),
                train_set.num_categories(),
                device,
            );
            let mask = mask_to_tensor::<B>(&batch.attention_mask, device);

            let loss = masked_pointer_loss(scores, targets, mask);
            let loss_val: f64 = loss.clone().into_scalar().elem();
            loss_sum += loss_val;

            let grads = GradientsParams::from_grads(loss.backward(), &head);
            head = optimizer.step(config.learning_rate.into(), head, grads);
        }

        let aver_loss = loss_sum / num_batches.max(1) as f64;

        let f1 = evaluate(head.valid())?;

        epochs_run = epoch + 1;
        let improved = selection.observe(f1, epoch);
        if improved {
            head.clone()
                .save_file(&checkpoint, &recorder)
                .map_err(|e| anyhow::anyhow!("failed to save checkpoint at epoch {epoch}: {e}"))?;
        }

        tracing::info!(
            epoch,
            aver_loss = format!("{aver_loss:.4}"),
            f1 = format!("{f1:.4}"),
            best_f1 = format!("{:.4}", selection.best_f1),
            best_epoch = selection.best_epoch,
            epoch_mins = format!("{:.1}", epoch_start.elapsed().as_secs_f64() / 60.0),
            saved = improved,
            "epoch finished"
        );

        if config.early_stop && selection.should_stop(config.patience) {
            tracing::info!(
                epoch,
                best_epoch = selection.best_epoch,
                patience = config.patience,
                "early stopping"
            );
            outcome = TrainingOutcome::EarlyStopped;
            break;
        }
    }

    tracing::info!(
        epochs_run,
        best_f1 = format!("{:.4}", selection.best_f1),
        best_epoch = selection.best_epoch,
        total_mins = format!("{:.1}", train_start.elapsed().as_secs_f64() / 60.0),
        "training finished"
    );

    let report = TrainingReport {
        outcome,
        epochs_run,
        best_f1: selection.best_f1,
        best_epoch: selection.best_epoch,
        checkpoint,
    };
    Ok((head, report))
}

/// Load a pointer head from a checkpoint file.
///
/// Creates a fresh head from config, then loads saved weights on top.
pub fn load_checkpoint<B: Backend>(
    path: &Path,
    config: &PointerHeadConfig,
    device: &B::Device,
) -> anyhow::Result<PointerHead<B>> {
    let head = config
        .init::<B>(device)
        .load_file(
            path,
            &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
            device,
        )
        .map_err(|e| anyhow::anyhow!("failed to load checkpoint from {}: {e}", path.display()))?;
    Ok(head)
}
