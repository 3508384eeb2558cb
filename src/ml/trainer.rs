// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on an Autodiff backend; BatchNorm uses batch
//     statistics and updates its running estimates
//   - model.valid() drops autodiff: validation runs on the inner
//     backend and BatchNorm switches to the running estimates
//   - Loss is the MSE of (px, py); the validation pass also
//     reports the mean absolute error
//   - A checkpoint is written after every epoch
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::EventBatcher, dataset::EventDataset};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{default_device, model::DenseEmbedding, TrainBackend};

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: EventDataset,
    val_dataset:   EventDataset,
    ckpt_manager:  CheckpointManager,
    metrics:       MetricsLogger,
) -> Result<Vec<EpochMetrics>> {
    let device = default_device();
    tracing::info!("Using device: {:?}", device);
    train_loop::<TrainBackend>(cfg, train_dataset, val_dataset, &ckpt_manager, &metrics, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: EventDataset,
    val_dataset:   EventDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<Vec<EpochMetrics>> {
    let model_cfg = &cfg.model;
    let mut model: DenseEmbedding<B> = model_cfg.init(&device)?;
    tracing::info!(
        "Model ready: {} parameters, t_mode={}, quantized={}",
        model.num_params(),
        model_cfg.t_mode.t_mode(),
        model.numerics().is_quantized(),
    );

    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    let shape = (
        model_cfg.number_of_pupcandis,
        model_cfg.n_features,
        model_cfg.n_features_cat,
    );

    let train_batcher = EventBatcher::<B>::new(device.clone(), shape.0, shape.1, shape.2);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    let val_batcher = EventBatcher::<B::InnerBackend>::new(device.clone(), shape.0, shape.1, shape.2);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let mse = MseLoss::new();
    let mut history = Vec::with_capacity(cfg.epochs);
    let mut best_val = f64::INFINITY;

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let pred = model.forward(batch.continuous, batch.codes);
            let loss = mse.forward(pred, batch.targets, Reduction::Mean);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut abs_err_sum  = 0.0f64;
        let mut val_batches  = 0usize;

        for batch in val_loader.iter() {
            let pred = model_valid.forward(batch.continuous, batch.codes);

            val_loss_sum += mse
                .forward(pred.clone(), batch.targets.clone(), Reduction::Mean)
                .into_scalar()
                .elem::<f64>();
            abs_err_sum += (pred - batch.targets).abs().mean().into_scalar().elem::<f64>();
            val_batches += 1;
        }

        let (avg_val_loss, val_mae) = if val_batches > 0 {
            (val_loss_sum / val_batches as f64, abs_err_sum / val_batches as f64)
        } else {
            (f64::NAN, f64::NAN)
        };

        println!(
            "Epoch {:>3}/{} | train_mse={:.4} | val_mse={:.4} | val_mae={:.4}",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss, val_mae,
        );

        let row = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, val_mae);
        if row.is_improvement(best_val) {
            best_val = row.val_loss;
            tracing::debug!("New best validation MSE {:.4} at epoch {}", best_val, epoch);
        }
        metrics.log(&row)?;
        history.push(row);

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    tracing::info!("Training complete!");
    Ok(history)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::data::{
        preprocessor::EventPreprocessor, synthetic::SyntheticEventSource,
    };
    use crate::domain::traits::EventSource;
    use crate::ml::aggregate::AggregationMode;
    use crate::ml::model::DenseEmbeddingConfig;
    use crate::ml::numerics::{PrecisionConfig, QuantizationConfig};

    type TestBackend = Autodiff<NdArray>;

    fn dataset(n: usize, seed: u64) -> EventDataset {
        let events = SyntheticEventSource::new(n, 6, vec![13, 3], 12, seed).load_all().unwrap();
        let prep   = EventPreprocessor::new(6, vec![13, 3], 12);
        EventDataset::new(events.iter().map(|e| prep.prepare_labelled(e).unwrap()).collect())
    }

    fn run(model: DenseEmbeddingConfig) -> (tempfile::TempDir, Vec<EpochMetrics>) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            epochs: 2,
            batch_size: 8,
            model: model.with_number_of_pupcandis(12),
            ..TrainConfig::default()
        };
        let ckpt    = CheckpointManager::new(dir.path());
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let history = train_loop::<TestBackend>(
            &cfg, dataset(32, 1), dataset(8, 2), &ckpt, &metrics, Default::default(),
        )
        .unwrap();
        (dir, history)
    }

    #[test]
    fn test_training_writes_checkpoints_and_metrics() {
        let (dir, history) = run(
            DenseEmbeddingConfig::new().with_t_mode(AggregationMode::WeightedSum),
        );
        assert_eq!(history.len(), 2);
        for row in &history {
            assert!(row.train_loss.is_finite());
            assert!(row.val_loss.is_finite());
            assert!(row.val_mae >= 0.0);
        }
        assert!(dir.path().join("latest_epoch.json").exists());
        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_quantized_average_pool_trains() {
        let (_dir, history) = run(
            DenseEmbeddingConfig::new().with_precision(PrecisionConfig::Quantized(
                QuantizationConfig::new().with_use_stochastic_rounding(true),
            )),
        );
        assert!(history.iter().all(|row| row.train_loss.is_finite()));
    }

    #[test]
    fn test_invalid_model_config_stops_training() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            model: DenseEmbeddingConfig::new().with_n_features(1),
            ..TrainConfig::default()
        };
        let result = train_loop::<TestBackend>(
            &cfg,
            EventDataset::new(vec![]),
            EventDataset::new(vec![]),
            &CheckpointManager::new(dir.path()),
            &MetricsLogger::new(dir.path()).unwrap(),
            Default::default(),
        );
        assert!(result.is_err());
    }
}
