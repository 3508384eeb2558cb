// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `predict` and
// `summary`. The model hyperparameters are shared by `train` and
// `summary` through one flattened ModelArgs group.
//
// Names (activation, quantizers) and t_mode are parsed into the
// model's types in TryFrom, so a bad value is reported with the
// same ConfigError the model builder uses.

use anyhow::Result;
use clap::{ArgAction, Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::{
    aggregate::AggregationMode,
    model::DenseEmbeddingConfig,
    numerics::{PrecisionConfig, QuantizationConfig},
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the MET model on synthetic or JSON events
    Train(TrainArgs),

    /// Predict MET for a JSON event file using a trained checkpoint
    Predict(PredictArgs),

    /// Print the layer table of a model configuration
    Summary(SummaryArgs),
}

// ─── Model hyperparameters ────────────────────────────────────────────────────
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Continuous features per candidate; the last two must be (px, py)
    #[arg(long, default_value_t = 6)]
    pub n_features: usize,

    /// Categorical features per candidate
    #[arg(long, default_value_t = 2)]
    pub n_features_cat: usize,

    /// Number of Dense + BatchNorm blocks (widths 8·2^n ... 16)
    #[arg(long, default_value_t = 3)]
    pub n_dense_layers: usize,

    /// Candidates per event; shorter events are zero padded
    #[arg(long, default_value_t = 100)]
    pub number_of_pupcandis: usize,

    /// Vocabulary size of each categorical feature, comma separated
    #[arg(long, value_delimiter = ',', default_value = "13,3")]
    pub embedding_input_dim: Vec<usize>,

    /// Embedding width
    #[arg(long, default_value_t = 8)]
    pub emb_out_dim: usize,

    /// Per-candidate bias in the weighted sum (t_mode 1)
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub with_bias: bool,

    /// 0 = average pool, 1 = learned weighted sum of (px, py)
    #[arg(long, default_value_t = 0)]
    pub t_mode: u8,

    /// relu, tanh, sigmoid or linear
    #[arg(long, default_value = "relu")]
    pub activation: String,

    /// Decay of the batch-norm running statistics
    #[arg(long, default_value_t = 0.95)]
    pub bn_momentum: f64,

    /// Build the fixed-point (quantization-aware) variant
    #[arg(long)]
    pub quantized: bool,

    #[arg(long, default_value_t = 7)]
    pub logit_total_bits: u32,

    #[arg(long, default_value_t = 2)]
    pub logit_int_bits: u32,

    #[arg(long, default_value_t = 7)]
    pub activation_total_bits: u32,

    #[arg(long, default_value_t = 2)]
    pub activation_int_bits: u32,

    #[arg(long, default_value = "quantized_bits")]
    pub logit_quantizer: String,

    /// quantized_relu, quantized_tanh or quantized_bits
    #[arg(long, default_value = "quantized_relu")]
    pub activation_quantizer: String,

    /// Scale of the quantized_bits step
    #[arg(long, default_value_t = 1.0)]
    pub alpha: f64,

    /// Stochastic rounding for kernels and biases
    #[arg(long)]
    pub use_stochastic_rounding: bool,
}

impl TryFrom<&ModelArgs> for DenseEmbeddingConfig {
    type Error = anyhow::Error;

    fn try_from(a: &ModelArgs) -> Result<Self> {
        let precision = if a.quantized {
            PrecisionConfig::Quantized(
                QuantizationConfig::new()
                    .with_logit_total_bits(a.logit_total_bits)
                    .with_logit_int_bits(a.logit_int_bits)
                    .with_activation_total_bits(a.activation_total_bits)
                    .with_activation_int_bits(a.activation_int_bits)
                    .with_logit_quantizer(a.logit_quantizer.parse()?)
                    .with_activation_quantizer(a.activation_quantizer.parse()?)
                    .with_alpha(a.alpha)
                    .with_use_stochastic_rounding(a.use_stochastic_rounding),
            )
        } else {
            PrecisionConfig::Full
        };

        Ok(DenseEmbeddingConfig::new()
            .with_n_features(a.n_features)
            .with_n_features_cat(a.n_features_cat)
            .with_n_dense_layers(a.n_dense_layers)
            .with_number_of_pupcandis(a.number_of_pupcandis)
            .with_embedding_input_dim(a.embedding_input_dim.clone())
            .with_emb_out_dim(a.emb_out_dim)
            .with_with_bias(a.with_bias)
            .with_t_mode(AggregationMode::from_t_mode(a.t_mode)?)
            .with_activation(a.activation.parse()?)
            .with_bn_momentum(a.bn_momentum)
            .with_precision(precision))
    }
}

// ─── train ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON file with labelled events; synthetic events when omitted
    #[arg(long)]
    pub events_file: Option<String>,

    /// Number of synthetic events to generate
    #[arg(long, default_value_t = 2000)]
    pub n_events: usize,

    /// Seed for event generation, the split and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Directory to save checkpoints, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Share of events used for training; the rest validates
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// The application layer never sees clap types.
impl TryFrom<TrainArgs> for TrainConfig {
    type Error = anyhow::Error;

    fn try_from(a: TrainArgs) -> Result<Self> {
        Ok(TrainConfig {
            model:          DenseEmbeddingConfig::try_from(&a.model)?,
            events_file:    a.events_file,
            n_events:       a.n_events,
            seed:           a.seed,
            checkpoint_dir: a.checkpoint_dir,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            train_fraction: a.train_fraction,
        })
    }
}

// ─── predict ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSON file with the events to estimate
    #[arg(long)]
    pub events_file: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Write the predictions here instead of stdout
    #[arg(long)]
    pub output: Option<String>,
}

// ─── summary ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Describe the model saved in this checkpoint directory
    /// instead of the one given by the flags
    #[arg(long)]
    pub checkpoint_dir: Option<String>,

    #[command(flatten)]
    pub model: ModelArgs,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("pupcandi-met").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    fn train_config(args: &[&str]) -> Result<TrainConfig> {
        match parse(args) {
            Commands::Train(a) => TrainConfig::try_from(a),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_match_model_defaults() {
        let cfg = train_config(&["train"]).unwrap();
        let def = DenseEmbeddingConfig::new();
        assert_eq!(cfg.model.embedding_input_dim, def.embedding_input_dim);
        assert_eq!(cfg.model.number_of_pupcandis, def.number_of_pupcandis);
        assert_eq!(cfg.model.t_mode, def.t_mode);
        assert!(cfg.model.with_bias);
        assert!(matches!(cfg.model.precision, PrecisionConfig::Full));
        assert_eq!(cfg.events_file, None);
    }

    #[test]
    fn test_model_flags_are_applied() {
        let cfg = train_config(&[
            "train",
            "--t-mode", "1",
            "--with-bias", "false",
            "--embedding-input-dim", "5,4,3",
            "--n-features-cat", "3",
            "--activation", "tanh",
            "--quantized",
            "--logit-total-bits", "8",
        ])
        .unwrap();
        assert_eq!(cfg.model.t_mode, AggregationMode::WeightedSum);
        assert!(!cfg.model.with_bias);
        assert_eq!(cfg.model.embedding_input_dim, vec![5, 4, 3]);
        match cfg.model.precision {
            PrecisionConfig::Quantized(q) => assert_eq!(q.logit_total_bits, 8),
            PrecisionConfig::Full => panic!("expected quantized precision"),
        }
    }

    #[test]
    fn test_unknown_t_mode_is_rejected() {
        assert!(train_config(&["train", "--t-mode", "2"]).is_err());
    }

    #[test]
    fn test_unknown_quantizer_is_rejected() {
        assert!(train_config(&["train", "--quantized", "--activation-quantizer", "binary"]).is_err());
    }

    #[test]
    fn test_quantizer_names_ignored_without_quantized_flag() {
        assert!(train_config(&["train", "--activation-quantizer", "binary"]).is_ok());
    }

    #[test]
    fn test_predict_requires_events_file() {
        assert!(Cli::try_parse_from(["pupcandi-met", "predict"]).is_err());
    }
}
