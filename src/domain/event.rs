// ============================================================
// Layer 3 — Event Domain Types
// ============================================================
// One collision event = a list of reconstructed particle
// candidates plus (for training) the true missing transverse
// momentum of the event.
//
// Each candidate carries:
//   - F continuous features, the LAST TWO of which are the
//     momentum components (px, py)
//   - C small-integer categorical codes (particle type,
//     charge / pile-up flag, ...)
//
// Events may hold any number of candidates; padding or
// truncation to the model's fixed length happens in the
// data layer (see data::preprocessor).

use serde::{Deserialize, Serialize};

/// A single reconstructed particle candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Continuous features; `features[F-2..]` is (px, py)
    pub features: Vec<f32>,

    /// One code per categorical attribute
    pub codes: Vec<i64>,
}

impl Candidate {
    pub fn new(features: Vec<f32>, codes: Vec<i64>) -> Self {
        Self { features, codes }
    }

    /// The carried momentum components, if the candidate has at least two features.
    pub fn momentum(&self) -> Option<(f32, f32)> {
        match self.features.as_slice() {
            [.., px, py] => Some((*px, *py)),
            _ => None,
        }
    }
}

/// One event: its candidates and, when labelled, the target (px, py).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub candidates: Vec<Candidate>,

    /// Regression target: true missing transverse momentum (x, y)
    #[serde(default)]
    pub target: Option<[f32; 2]>,
}

impl Event {
    pub fn new(candidates: Vec<Candidate>, target: Option<[f32; 2]>) -> Self {
        Self { candidates, target }
    }

    /// Negative vector sum of all candidate momenta ("raw" MET).
    /// Useful as a baseline to compare the learned estimate against.
    pub fn raw_met(&self) -> [f32; 2] {
        let (sx, sy) = self
            .candidates
            .iter()
            .filter_map(Candidate::momentum)
            .fold((0.0f32, 0.0f32), |(ax, ay), (px, py)| (ax + px, ay + py));
        [-sx, -sy]
    }
}

/// A model estimate for one event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetPrediction {
    pub px: f32,
    pub py: f32,
}

impl MetPrediction {
    pub fn magnitude(&self) -> f32 {
        self.px.hypot(self.py)
    }
}
