use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One padded event, flattened row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSample {
    /// candidates × n_features
    pub continuous: Vec<f32>,
    /// candidates × n_codes
    pub codes:      Vec<i64>,
    pub target:     [f32; 2],
}

pub struct EventDataset {
    samples: Vec<EventSample>,
}

impl EventDataset {
    pub fn new(samples: Vec<EventSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<EventSample> for EventDataset {
    fn get(&self, index: usize) -> Option<EventSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
