// ============================================================
// Layer 4 — Event Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N padded EventSamples
// into the three tensors one forward/backward pass needs.
//
//   continuous: [N, P, F]   float
//   codes:      [N, P, C]   int
//   targets:    [N, 2]      float
//
// Samples are already flattened row-major by the preprocessor,
// so batching is a concatenation followed by a reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::EventSample;

#[derive(Debug, Clone)]
pub struct EventBatch<B: Backend> {
    pub continuous: Tensor<B, 3>,
    pub codes:      Tensor<B, 3, Int>,
    pub targets:    Tensor<B, 2>,
}

/// Holds the target device and the fixed per-event shape.
#[derive(Clone, Debug)]
pub struct EventBatcher<B: Backend> {
    pub device: B::Device,
    candidates: usize,
    n_features: usize,
    n_codes:    usize,
}

impl<B: Backend> EventBatcher<B> {
    pub fn new(device: B::Device, candidates: usize, n_features: usize, n_codes: usize) -> Self {
        Self { device, candidates, n_features, n_codes }
    }
}

impl<B: Backend> Batcher<EventSample, EventBatch<B>> for EventBatcher<B> {
    fn batch(&self, items: Vec<EventSample>) -> EventBatch<B> {
        let batch_size = items.len();

        let continuous: Vec<f32> = items
            .iter()
            .flat_map(|s| s.continuous.iter().copied())
            .collect();

        // Burn Int tensors are built from i32 here, like token ids
        let codes: Vec<i32> = items
            .iter()
            .flat_map(|s| s.codes.iter().map(|&c| c as i32))
            .collect();

        let targets: Vec<f32> = items
            .iter()
            .flat_map(|s| s.target)
            .collect();

        let continuous = Tensor::<B, 1>::from_floats(continuous.as_slice(), &self.device)
            .reshape([batch_size, self.candidates, self.n_features]);

        let codes = if self.n_codes == 0 {
            Tensor::<B, 3, Int>::zeros([batch_size, self.candidates, 0], &self.device)
        } else {
            Tensor::<B, 1, Int>::from_ints(codes.as_slice(), &self.device)
                .reshape([batch_size, self.candidates, self.n_codes])
        };

        let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), &self.device)
            .reshape([batch_size, 2]);

        EventBatch { continuous, codes, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn sample(offset: f32) -> EventSample {
        EventSample {
            continuous: (0..6).map(|i| offset + i as f32).collect(), // 2 candidates × 3
            codes:      vec![1, 0, 2, 1],                            // 2 candidates × 2
            target:     [offset, -offset],
        }
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = EventBatcher::<TestBackend>::new(Default::default(), 2, 3, 2);
        let batch   = batcher.batch(vec![sample(0.0), sample(10.0), sample(20.0)]);
        assert_eq!(batch.continuous.dims(), [3, 2, 3]);
        assert_eq!(batch.codes.dims(), [3, 2, 2]);
        assert_eq!(batch.targets.dims(), [3, 2]);
    }

    #[test]
    fn test_batch_preserves_order() {
        let batcher = EventBatcher::<TestBackend>::new(Default::default(), 2, 3, 2);
        let batch   = batcher.batch(vec![sample(0.0), sample(10.0)]);
        let targets = batch.targets.into_data().to_vec::<f32>().unwrap();
        assert_eq!(targets, vec![0.0, -0.0, 10.0, -10.0]);

        let second_event = batch
            .continuous
            .slice([1..2, 0..2, 0..3])
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(second_event, vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
    }
}
