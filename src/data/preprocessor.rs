// ============================================================
// Layer 4 — Event Preprocessor
// ============================================================
// Turns a variable-length Event into the fixed-shape sample the
// model consumes:
//
//   continuous: P × F floats  (row-major, candidate by candidate)
//   codes:      P × C ints
//   target:     [px, py]
//
// Steps (applied in order):
//   1. Check each candidate's feature width and code count
//   2. Reject codes outside [0, vocab) — the embedding tables
//      have no row for them
//   3. Keep the first P candidates, zero-pad the rest
//
// Padding uses features = 0 and codes = 0, so a padded candidate
// carries (px, py) = (0, 0) into the weighted sum.

use crate::data::dataset::EventSample;
use crate::domain::error::DataError;
use crate::domain::event::Event;

#[derive(Debug, Clone)]
pub struct EventPreprocessor {
    n_features:  usize,
    vocab_sizes: Vec<usize>,
    candidates:  usize,
}

impl EventPreprocessor {
    pub fn new(n_features: usize, vocab_sizes: Vec<usize>, candidates: usize) -> Self {
        Self { n_features, vocab_sizes, candidates }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_codes(&self) -> usize {
        self.vocab_sizes.len()
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    /// Pad/validate one event. Events without a target get (0, 0).
    pub fn prepare(&self, event: &Event) -> Result<EventSample, DataError> {
        let n_codes = self.vocab_sizes.len();
        let mut continuous = vec![0.0f32; self.candidates * self.n_features];
        let mut codes      = vec![0i64; self.candidates * n_codes];

        if event.candidates.len() > self.candidates {
            tracing::debug!(
                "Truncating event from {} to {} candidates",
                event.candidates.len(),
                self.candidates
            );
        }

        for (i, cand) in event.candidates.iter().take(self.candidates).enumerate() {
            if cand.features.len() != self.n_features {
                return Err(DataError::FeatureWidth {
                    candidate: i,
                    expected:  self.n_features,
                    got:       cand.features.len(),
                });
            }
            if cand.codes.len() != n_codes {
                return Err(DataError::CodeCount {
                    candidate: i,
                    expected:  n_codes,
                    got:       cand.codes.len(),
                });
            }
            for (feature, (&code, &vocab)) in cand.codes.iter().zip(&self.vocab_sizes).enumerate() {
                if code < 0 || code as usize >= vocab {
                    return Err(DataError::OutOfVocabulary { candidate: i, feature, code, vocab });
                }
            }

            continuous[i * self.n_features..(i + 1) * self.n_features]
                .copy_from_slice(&cand.features);
            codes[i * n_codes..(i + 1) * n_codes].copy_from_slice(&cand.codes);
        }

        Ok(EventSample {
            continuous,
            codes,
            target: event.target.unwrap_or([0.0, 0.0]),
        })
    }

    /// Like `prepare`, but the event must carry a target.
    pub fn prepare_labelled(&self, event: &Event) -> Result<EventSample, DataError> {
        if event.target.is_none() {
            return Err(DataError::MissingTarget);
        }
        self.prepare(event)
    }
}
