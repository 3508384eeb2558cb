// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
//   1. Rebuild the model from the checkpoint directory
//   2. Load events from a JSON file (targets optional)
//   3. Estimate (px, py) for every event, in file order

use anyhow::Result;

use crate::data::loader::JsonEventSource;
use crate::domain::{
    event::MetPrediction,
    traits::{EventSource, MetEstimator},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{default_device, inferencer::Inferencer, InferBackend};

pub struct PredictUseCase {
    estimator: Box<dyn MetEstimator>,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let ckpt       = CheckpointManager::new(checkpoint_dir);
        let inferencer = Inferencer::<InferBackend>::from_checkpoint(&ckpt, default_device())?;
        Ok(Self::with_estimator(Box::new(inferencer)))
    }

    pub fn with_estimator(estimator: Box<dyn MetEstimator>) -> Self {
        Self { estimator }
    }

    pub fn predict_file(&self, events_file: &str) -> Result<Vec<MetPrediction>> {
        let events = JsonEventSource::new(events_file).load_all()?;
        self.estimator.estimate(&events)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{Candidate, Event};

    /// Predicts the raw MET of each event.
    struct RawMet;

    impl MetEstimator for RawMet {
        fn estimate(&self, events: &[Event]) -> Result<Vec<MetPrediction>> {
            Ok(events
                .iter()
                .map(|e| {
                    let [px, py] = e.raw_met();
                    MetPrediction { px, py }
                })
                .collect())
        }
    }

    #[test]
    fn test_predictions_follow_file_order() {
        let dir  = tempfile::tempdir().unwrap();
        let file = dir.path().join("events.json");
        let events = vec![
            Event::new(vec![Candidate::new(vec![1.0, 2.0], vec![])], None),
            Event::new(vec![Candidate::new(vec![-3.0, 0.5], vec![])], Some([0.0, 0.0])),
        ];
        std::fs::write(&file, serde_json::to_string(&events).unwrap()).unwrap();

        let use_case = PredictUseCase::with_estimator(Box::new(RawMet));
        let preds    = use_case.predict_file(&file.display().to_string()).unwrap();
        let expected: Vec<MetPrediction> = events
            .iter()
            .map(|e| {
                let [px, py] = e.raw_met();
                MetPrediction { px, py }
            })
            .collect();
        assert_eq!(preds, expected);
    }

    #[test]
    fn test_untrained_checkpoint_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PredictUseCase::new(&dir.path().display().to_string()).is_err());
    }
}
