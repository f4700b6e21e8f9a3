mod config;
mod encoder;
mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pipeline::{EvaluateArgs, PredictArgs, TrainArgs};

/// Pointer-network named entity recognition over a frozen transformer encoder.
#[derive(Parser)]
#[command(name = "ner", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands for training, evaluation, and prediction.
#[derive(Subcommand)]
enum Command {
    /// Train the pointer head against the configured encoder server.
    Train {
        /// Path to the NER config TOML file.
        #[arg(long, default_value = "configs/pointer.toml")]
        config: PathBuf,
        /// Override the number of training epochs.
        #[arg(long)]
        epochs: Option<usize>,
        /// Override the checkpoint directory.
        #[arg(long)]
        checkpoints_dir: Option<String>,
    },
    /// Evaluate a trained checkpoint on a labeled dataset.
    Evaluate {
        /// Path to the NER config TOML file.
        #[arg(long, default_value = "configs/pointer.toml")]
        config: PathBuf,
        /// Checkpoint to evaluate. Default: configured best model.
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        /// Dataset to evaluate on. Default: the configured dev file.
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// Output as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
    /// Extract entities from a single sentence.
    Predict {
        /// Path to the NER config TOML file.
        #[arg(long, default_value = "configs/pointer.toml")]
        config: PathBuf,
        /// Checkpoint to load. Default: configured best model.
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        /// Sentence to extract entities from.
        sentence: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Train {
            config,
            epochs,
            checkpoints_dir,
        } => pipeline::run_train(TrainArgs {
            config,
            epochs,
            checkpoints_dir,
        }),
        Command::Evaluate {
            config,
            checkpoint,
            dataset,
            json,
        } => pipeline::run_evaluate(EvaluateArgs {
            config,
            checkpoint,
            dataset,
            json,
        }),
        Command::Predict {
            config,
            checkpoint,
            sentence,
        } => pipeline::run_predict(PredictArgs {
            config,
            checkpoint,
            sentence,
        }),
    }
}
