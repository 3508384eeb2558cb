// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the trained model from train_config.json, loads the
// latest weights and estimates (px, py) for unlabelled events.
//
// Events go through the same EventPreprocessor as training, so
// oversized events are truncated and short ones zero-padded.
// BatchNorm runs on its running statistics here: the inference
// backend has no autodiff.
use anyhow::{anyhow, Context, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::{batcher::EventBatcher, preprocessor::EventPreprocessor};
use crate::domain::{
    event::{Event, MetPrediction},
    traits::MetEstimator,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{DenseEmbedding, DenseEmbeddingConfig};

const PREDICT_BATCH_SIZE: usize = 256;

pub struct Inferencer<B: Backend> {
    model:        DenseEmbedding<B>,
    preprocessor: EventPreprocessor,
    batcher:      EventBatcher<B>,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg   = ckpt_manager.load_config()?;
        let model = cfg.model.init::<B>(&device)?;
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint '{}'", ckpt_manager.dir().display());
        Ok(Self::new(model, &cfg.model, device))
    }

    /// Wrap an already built model, e.g. one fresh out of training.
    pub fn new(model: DenseEmbedding<B>, cfg: &DenseEmbeddingConfig, device: B::Device) -> Self {
        let preprocessor = EventPreprocessor::new(
            cfg.n_features,
            cfg.embedding_input_dim.clone(),
            cfg.number_of_pupcandis,
        );
        let batcher = EventBatcher::new(
            device,
            preprocessor.candidates(),
            preprocessor.n_features(),
            preprocessor.n_codes(),
        );
        Self { model, preprocessor, batcher }
    }

    pub fn predict(&self, events: &[Event]) -> Result<Vec<MetPrediction>> {
        let mut predictions = Vec::with_capacity(events.len());

        for (chunk_index, chunk) in events.chunks(PREDICT_BATCH_SIZE).enumerate() {
            let samples = chunk
                .iter()
                .enumerate()
                .map(|(i, event)| {
                    self.preprocessor
                        .prepare(event)
                        .with_context(|| format!("event {}", chunk_index * PREDICT_BATCH_SIZE + i))
                })
                .collect::<Result<Vec<_>>>()?;

            let batch  = self.batcher.batch(samples);
            let output = self.model.forward(batch.continuous, batch.codes);
            let values = output
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow!("Cannot read model output: {e:?}"))?;

            predictions.extend(values.chunks_exact(2).map(|v| MetPrediction { px: v[0], py: v[1] }));
        }

        tracing::debug!("Predicted MET for {} events", predictions.len());
        Ok(predictions)
    }
}

impl<B: Backend> MetEstimator for Inferencer<B> {
    fn estimate(&self, events: &[Event]) -> Result<Vec<MetPrediction>> {
        self.predict(events)
    }
}
