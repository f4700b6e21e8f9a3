//! NER training, evaluation, and prediction pipelines.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::backend::ndarray::NdArray;
use burn::backend::Autodiff;

use dataset::{
    load_samples, CategoryVocab, CharTokenizer, SentenceTokenizer, WordPieceTokenizer,
};
use pointer::training::data::TrainingSet;
use pointer::{
    load_checkpoint, mean_f1, train, CategoryMetrics, Evaluator, PointerHeadConfig, Predictor,
    ScoringModel, SpanDecoder,
};

use crate::config::{build_trainer_config, load_ner_toml, NerToml};
use crate::encoder::EncoderClient;

type Cpu = NdArray<f32>;
type AutodiffCpu = Autodiff<Cpu>;

/// Arguments for the `train` subcommand.
#[derive(Debug)]
pub struct TrainArgs {
    /// Path to the NER config TOML file.
    pub config: PathBuf,
    /// Optional CLI override for the number of epochs.
    pub epochs: Option<usize>,
    /// Optional CLI override for the checkpoint directory.
    pub checkpoints_dir: Option<String>,
}

/// Arguments for the `evaluate` subcommand.
#[derive(Debug)]
pub struct EvaluateArgs {
    /// Path to the NER config TOML file.
    pub config: PathBuf,
    /// Checkpoint to evaluate; defaults to the configured best model.
    pub checkpoint: Option<PathBuf>,
    /// Dataset to evaluate on; defaults to the configured dev file.
    pub dataset: Option<PathBuf>,
    /// Output as JSON instead of human-readable text.
    pub json: bool,
}

/// Arguments for the `predict` subcommand.
#[derive(Debug)]
pub struct PredictArgs {
    /// Path to the NER config TOML file.
    pub config: PathBuf,
    /// Checkpoint to load; defaults to the configured best model.
    pub checkpoint: Option<PathBuf>,
    /// Sentence to extract entities from.
    pub sentence: String,
}

/// Evaluation output: per-category metrics plus the mean F1.
#[derive(Debug, serde::Serialize)]
struct EvalReport {
    categories: HashMap<String, CategoryMetrics>,
    mean_f1: f64,
}

/// Build the sentence tokenizer from config: WordPiece when a tokenizer
/// file is configured, char-level otherwise.
fn build_tokenizer(config: &NerToml) -> anyhow::Result<Box<dyn SentenceTokenizer>> {
    let max_len = config.model.max_sequence_length;
    match &config.data.tokenizer_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using WordPiece tokenizer");
            Ok(Box::new(WordPieceTokenizer::from_file(path, max_len)?))
        }
        None => {
            tracing::info!("No tokenizer file configured, using char-level tokenizer");
            Ok(Box::new(CharTokenizer::new(max_len)))
        }
    }
}

fn build_vocab(config: &NerToml) -> anyhow::Result<CategoryVocab> {
    CategoryVocab::new(config.data.categories.clone())
}

fn head_config(config: &NerToml, vocab: &CategoryVocab) -> PointerHeadConfig {
    PointerHeadConfig::new(config.model.hidden_size, vocab.len())
        .with_dropout(config.model.dropout)
}

/// Resolve the checkpoint path: CLI value, or `{checkpoints_dir}/best_model`.
fn resolve_checkpoint(config: &NerToml, cli: Option<PathBuf>) -> PathBuf {
    cli.unwrap_or_else(|| {
        let dir = config
            .train
            .checkpoints_dir
            .clone()
            .unwrap_or_else(|| "checkpoints".to_string());
        Path::new(&dir).join("best_model")
    })
}

fn connect_encoder(config: &NerToml) -> anyhow::Result<EncoderClient> {
    let client = EncoderClient::new(&config.model.encoder_url, config.model.hidden_size)?;
    client.health_check()?;
    Ok(client)
}

/// Train the pointer head and report the run.
pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_ner_toml(&args.config)?;
    let vocab = build_vocab(&config)?;
    let tokenizer = build_tokenizer(&config)?;
    let tok: &dyn SentenceTokenizer = tokenizer.as_ref();

    let train_samples = load_samples(&config.data.train_file)?;
    let dev_samples = load_samples(&config.data.dev_file)?;
    tracing::info!(
        train = train_samples.len(),
        dev = dev_samples.len(),
        categories = vocab.len(),
        "Loaded datasets"
    );

    let encode_fn = connect_encoder(&config)?.into_encode_fn();
    let train_set = TrainingSet::prepare(&train_samples, &tok, &vocab)?;
    let decoder = SpanDecoder::new(tok, config.model.decision_threshold);

    let device = Default::default();
    let head = head_config(&config, &vocab).init::<AutodiffCpu>(&device);
    let trainer_config = build_trainer_config(&config.train, args.epochs, args.checkpoints_dir);

    let (_head, report) = train(
        &trainer_config,
        head,
        &*encode_fn,
        &train_set,
        &dev_samples,
        &decoder,
        &vocab,
        &device,
    )?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("Elapsed: {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Evaluate a checkpoint on a labeled dataset.
pub fn run_evaluate(args: EvaluateArgs) -> anyhow::Result<()> {
    let config = load_ner_toml(&args.config)?;
    let vocab = build_vocab(&config)?;
    let tokenizer = build_tokenizer(&config)?;
    let tok: &dyn SentenceTokenizer = tokenizer.as_ref();

    let dataset_path = args
        .dataset
        .unwrap_or_else(|| config.data.dev_file.clone());
    let samples = load_samples(&dataset_path)?;
    tracing::info!(path = %dataset_path.display(), samples = samples.len(), "Loaded evaluation set");

    let device = Default::default();
    let checkpoint = resolve_checkpoint(&config, args.checkpoint);
    let head = load_checkpoint::<Cpu>(&checkpoint, &head_config(&config, &vocab), &device)?;
    let encode_fn = connect_encoder(&config)?.into_encode_fn();
    let model = ScoringModel::new(head, &*encode_fn, device);

    let decoder = SpanDecoder::new(tok, config.model.decision_threshold);
    let evaluator = Evaluator::new(&decoder, &vocab);
    let categories = evaluator.evaluate(&model, &samples)?;
    let report = EvalReport {
        mean_f1: mean_f1(&categories),
        categories,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("--- Evaluation ---");
        // Vocab order, not hash order.
        for name in vocab.names() {
            if let Some(m) = report.categories.get(name) {
                println!(
                    "{name}: precision={:.4} recall={:.4} f1={:.4}",
                    m.precision, m.recall, m.f1
                );
            }
        }
        println!("Mean F1: {:.4}", report.mean_f1);
    }
    Ok(())
}

/// Extract entities from a single sentence using a trained checkpoint.
pub fn run_predict(args: PredictArgs) -> anyhow::Result<()> {
    let config = load_ner_toml(&args.config)?;
    let vocab = build_vocab(&config)?;
    let tokenizer = build_tokenizer(&config)?;
    let tok: &dyn SentenceTokenizer = tokenizer.as_ref();

    let device = Default::default();
    let checkpoint = resolve_checkpoint(&config, args.checkpoint);
    let head = load_checkpoint::<Cpu>(&checkpoint, &head_config(&config, &vocab), &device)?;
    let encode_fn = connect_encoder(&config)?.into_encode_fn();
    let model = ScoringModel::new(head, &*encode_fn, device);

    let decoder = SpanDecoder::new(tok, config.model.decision_threshold);
    let predictor = Predictor::new(&decoder, &vocab, model);
    let entities = predictor.predict_one(&args.sentence)?;

    println!("{}", serde_json::to_string_pretty(&entities)?);
    Ok(())
}
