//! TOML config loading for the NER CLI.
//!
//! Deserializes `configs/pointer.toml` which has `[data]`, `[model]` and
//! `[train]` sections, then merges with CLI overrides.

use std::path::{Path, PathBuf};

use pointer::TrainerConfig;
use serde::Deserialize;

/// Top-level structure matching `configs/pointer.toml`.
#[derive(Debug, Deserialize)]
pub struct NerToml {
    /// Dataset paths and the entity category list.
    pub data: DataSection,
    /// Encoder and head parameters.
    pub model: ModelSection,
    /// Training loop overrides.
    #[serde(default)]
    pub train: TrainOverrides,
}

/// `[data]` section.
#[derive(Debug, Deserialize)]
pub struct DataSection {
    /// Entity category names; order defines the category ids.
    pub categories: Vec<String>,
    /// Training samples (JSON array of labeled records).
    pub train_file: PathBuf,
    /// Dev samples used for per-epoch evaluation and checkpoint selection.
    pub dev_file: PathBuf,
    /// Optional WordPiece tokenizer file; the char-level tokenizer is used
    /// when absent.
    pub tokenizer_file: Option<PathBuf>,
}

/// `[model]` section.
#[derive(Debug, Deserialize)]
pub struct ModelSection {
    /// Hidden size of the frozen encoder (e.g. 768 for BERT-base).
    pub hidden_size: usize,
    /// Padded sequence length for tokenization.
    pub max_sequence_length: usize,
    /// Decision threshold for span decoding, in [0, 1].
    pub decision_threshold: f32,
    /// Dropout on encoder hidden states during training.
    #[serde(default = "default_dropout")]
    pub dropout: f64,
    /// Base URL of the hidden-state encoder server.
    pub encoder_url: String,
}

fn default_dropout() -> f64 {
    0.1
}

/// Optional overrides for `TrainerConfig` fields.
#[derive(Debug, Default, Deserialize)]
pub struct TrainOverrides {
    pub batch_size: Option<usize>,
    pub learning_rate: Option<f64>,
    pub epochs: Option<usize>,
    pub early_stop: Option<bool>,
    pub patience: Option<usize>,
    pub checkpoints_dir: Option<String>,
}

/// Load and deserialize a `NerToml` from a TOML file.
pub fn load_ner_toml(path: &Path) -> anyhow::Result<NerToml> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {e}", path.display()))?;
    let config: NerToml = toml::from_str(&contents)?;
    tracing::info!(path = %path.display(), "Loaded NER config");
    Ok(config)
}

/// Build a `TrainerConfig` from defaults, TOML overrides, and CLI flags.
///
/// Priority chain: `TrainerConfig::new()` defaults < TOML values < CLI.
pub fn build_trainer_config(
    overrides: &TrainOverrides,
    epochs_cli: Option<usize>,
    checkpoints_dir_cli: Option<String>,
) -> TrainerConfig {
    let mut config = TrainerConfig::new();

    if let Some(n) = overrides.batch_size {
        config.batch_size = n;
    }
    if let Some(lr) = overrides.learning_rate {
        config.learning_rate = lr;
    }
    if let Some(n) = overrides.epochs {
        config.epochs = n;
    }
    if let Some(flag) = overrides.early_stop {
        config.early_stop = flag;
    }
    if let Some(n) = overrides.patience {
        config.patience = n;
    }
    if let Some(dir) = &overrides.checkpoints_dir {
        config.checkpoints_dir = dir.clone();
    }

    // CLI overrides take highest priority
    if let Some(n) = epochs_cli {
        config.epochs = n;
    }
    if let Some(dir) = checkpoints_dir_cli {
        config.checkpoints_dir = dir;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_ner_toml() {
        let toml_str = r#"
[data]
categories = ["PERSON", "ORG", "LOC"]
train_file = "data/train.json"
dev_file = "data/dev.json"
tokenizer_file = "data/tokenizer.json"

[model]
hidden_size = 768
max_sequence_length = 128
decision_threshold = 0.5
dropout = 0.2
encoder_url = "http://localhost:30000"

[train]
batch_size = 16
learning_rate = 1e-4
epochs = 10
early_stop = false
patience = 3
checkpoints_dir = "out/ckpt"
"#;
        let config: NerToml = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data.categories, vec!["PERSON", "ORG", "LOC"]);
        assert_eq!(config.model.hidden_size, 768);
        assert_eq!(config.model.max_sequence_length, 128);
        assert!((config.model.decision_threshold - 0.5).abs() < 1e-9);
        assert!((config.model.dropout - 0.2).abs() < 1e-9);
        assert_eq!(config.train.batch_size, Some(16));
        assert_eq!(config.train.epochs, Some(10));
        assert_eq!(config.train.early_stop, Some(false));
        assert_eq!(config.train.checkpoints_dir.as_deref(), Some("out/ckpt"));
    }

    #[test]
    fn test_deserialize_minimal_ner_toml() {
        // [train] missing and optional fields absent — defaults apply.
        let toml_str = r#"
[data]
categories = ["PERSON"]
train_file = "train.json"
dev_file = "dev.json"

[model]
hidden_size = 256
max_sequence_length = 64
decision_threshold = 0.5
encoder_url = "http://localhost:8000"
"#;
        let config: NerToml = toml::from_str(toml_str).unwrap();
        assert!(config.data.tokenizer_file.is_none());
        assert!((config.model.dropout - 0.1).abs() < 1e-9);
        assert!(config.train.batch_size.is_none());
        assert!(config.train.epochs.is_none());
    }

    #[test]
    fn test_trainer_config_override_priority() {
        let overrides = TrainOverrides {
            batch_size: Some(8),
            learning_rate: Some(1e-3),
            epochs: Some(5),
            early_stop: None,
            patience: None,
            checkpoints_dir: Some("toml_dir".to_string()),
        };

        let config = build_trainer_config(&overrides, Some(7), Some("cli_dir".to_string()));
        assert_eq!(config.batch_size, 8);
        assert!((config.learning_rate - 1e-3).abs() < 1e-12);
        // CLI wins over TOML
        assert_eq!(config.epochs, 7);
        assert_eq!(config.checkpoints_dir, "cli_dir");
        // Untouched fields keep their defaults
        assert!(config.early_stop);
        assert_eq!(config.patience, 2);
    }
}
