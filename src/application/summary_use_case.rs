// ============================================================
// Layer 2 — Summary Use Case
// ============================================================
// Builds a model from a configuration (or the one saved next to
// a checkpoint) and reports its layer table without training.

use anyhow::{Context, Result};
use burn::module::Module;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    default_device,
    model::{DenseEmbedding, DenseEmbeddingConfig, LayerSummary},
    InferBackend,
};

#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub layers:       Vec<LayerSummary>,
    pub total_params: usize,
    pub quantized:    bool,
    pub t_mode:       u8,
}

pub struct SummaryUseCase {
    config: DenseEmbeddingConfig,
}

impl SummaryUseCase {
    pub fn new(config: DenseEmbeddingConfig) -> Self {
        Self { config }
    }

    /// Use the model configuration saved by a training run.
    pub fn from_checkpoint(checkpoint_dir: &str) -> Result<Self> {
        let cfg = CheckpointManager::new(checkpoint_dir).load_config()?;
        Ok(Self::new(cfg.model))
    }

    pub fn describe(&self) -> Result<ModelSummary> {
        let model: DenseEmbedding<InferBackend> = self
            .config
            .init(&default_device())
            .context("Invalid model configuration")?;

        Ok(ModelSummary {
            layers:       model.summary(),
            total_params: model.num_params(),
            quantized:    model.numerics().is_quantized(),
            t_mode:       self.config.t_mode.t_mode(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::ml::aggregate::AggregationMode;

    #[test]
    fn test_layer_params_add_up() {
        let summary = SummaryUseCase::new(DenseEmbeddingConfig::new()).describe().unwrap();
        let sum: usize = summary.layers.iter().map(|l| l.params).sum();
        assert_eq!(sum, summary.total_params);
        assert!(!summary.quantized);
        assert_eq!(summary.t_mode, 0);
    }

    #[test]
    fn test_summary_from_saved_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            model: DenseEmbeddingConfig::new().with_t_mode(AggregationMode::WeightedSum),
            ..TrainConfig::default()
        };
        CheckpointManager::new(dir.path()).save_config(&cfg).unwrap();

        let summary = SummaryUseCase::from_checkpoint(&dir.path().display().to_string())
            .unwrap()
            .describe()
            .unwrap();
        assert_eq!(summary.t_mode, 1);
        assert!(summary.layers.iter().any(|l| l.name == "weighted_sum"));
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let err = SummaryUseCase::new(DenseEmbeddingConfig::new().with_emb_out_dim(0))
            .describe()
            .unwrap_err();
        assert!(format!("{err:#}").contains("emb_out_dim"));
    }
}
