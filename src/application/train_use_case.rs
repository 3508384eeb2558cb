// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the model config             (Layer 5 - ml)
//   Step 2: Load events (JSON file or synthetic)  (Layer 4 - data)
//   Step 3: Pad / validate events into samples    (Layer 4 - data)
//   Step 4: Split train/validation                (Layer 4 - data)
//   Step 5: Build datasets                        (Layer 4 - data)
//   Step 6: Save config                           (Layer 6 - infra)
//   Step 7: Run training loop                     (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{EventDataset, EventSample},
    loader::JsonEventSource,
    preprocessor::EventPreprocessor,
    splitter::split_train_val,
    synthetic::SyntheticEventSource,
};
use crate::domain::traits::EventSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{model::DenseEmbeddingConfig, trainer::run_training};

// ─── Training Configuration ──────────────────────────────────────────────────
// Run settings plus the full model config. Saved next to the
// checkpoints so inference can rebuild the exact same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// JSON event file; synthetic events are generated when absent
    pub events_file:    Option<String>,
    /// Number of synthetic events
    pub n_events:       usize,
    pub seed:           u64,
    pub checkpoint_dir: String,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub train_fraction: f64,
    pub model:          DenseEmbeddingConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            events_file:    None,
            n_events:       2000,
            seed:           42,
            checkpoint_dir: "checkpoints".to_string(),
            batch_size:     64,
            epochs:         10,
            lr:             1e-3,
            train_fraction: 0.8,
            model:          DenseEmbeddingConfig::new(),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let cfg   = &self.config;
        let model = &cfg.model;

        // ── Step 1: Reject a bad model config before touching the data ────────
        model.validate().context("Invalid model configuration")?;

        // ── Step 2: Load events ───────────────────────────────────────────────
        let source: Box<dyn EventSource> = match &cfg.events_file {
            Some(path) => {
                tracing::info!("Loading events from '{}'", path);
                Box::new(JsonEventSource::new(path))
            }
            None => {
                tracing::info!("Generating {} synthetic events (seed {})", cfg.n_events, cfg.seed);
                Box::new(SyntheticEventSource::new(
                    cfg.n_events,
                    model.n_features,
                    model.embedding_input_dim.clone(),
                    model.number_of_pupcandis,
                    cfg.seed,
                ))
            }
        };
        let events = source.load_all()?;
        tracing::info!("Loaded {} events", events.len());

        // ── Step 3: Fixed-shape samples ───────────────────────────────────────
        let preprocessor = EventPreprocessor::new(
            model.n_features,
            model.embedding_input_dim.clone(),
            model.number_of_pupcandis,
        );
        let samples = events
            .iter()
            .enumerate()
            .map(|(i, event)| {
                preprocessor
                    .prepare_labelled(event)
                    .with_context(|| format!("Cannot use event {i} for training"))
            })
            .collect::<Result<Vec<EventSample>>>()?;

        // ── Step 4: Train / validation split ─────────────────────────────────
        let (train_samples, val_samples) = split_train_val(samples, cfg.train_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );
        if train_samples.is_empty() {
            anyhow::bail!("No training events left after the split");
        }

        // ── Step 5: Burn datasets ─────────────────────────────────────────────
        let train_dataset = EventDataset::new(train_samples);
        let val_dataset   = EventDataset::new(val_samples);

        // ── Step 6: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, train_dataset, val_dataset, ckpt_manager, metrics)
    }
}
