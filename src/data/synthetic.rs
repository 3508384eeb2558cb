// ============================================================
// Layer 4 — Synthetic Event Source
// ============================================================
// Generates labelled toy events so the whole pipeline can run
// end to end without detector simulation files.
//
// Each event mixes two populations:
//
//   hard-scatter candidates  — a few, high pT
//   pile-up candidates       — many, soft
//
// The target is the missing transverse momentum of the hard
// scatter only:  MET = -Σ_hard (px, py)
// so a perfect weighted-sum model learns w ≈ -1 for hard-scatter
// candidates and w ≈ 0 for pile-up.
//
// Candidate features (F = 6):  [pT, η, φ, 0, px, py]
//   - fewer than 5 features keeps the trailing (px, py) and
//     as many of (pT, η, φ) as fit
//   - extra features are zero
//
// Categorical codes:
//   code 0  — particle type in [0, vocab_0)
//   code 1  — origin flag: 1 = hard scatter, 2 = pile-up
//             (0 is left for padding, values wrap at vocab_1)
//   code ≥2 — uniform in [0, vocab_i)

use std::f32::consts::PI;

use anyhow::Result;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::domain::event::{Candidate, Event};
use crate::domain::traits::EventSource;

pub struct SyntheticEventSource {
    n_events:    usize,
    n_features:  usize,
    vocab_sizes: Vec<usize>,
    candidates:  usize,
    seed:        u64,
}

impl SyntheticEventSource {
    pub fn new(
        n_events:    usize,
        n_features:  usize,
        vocab_sizes: Vec<usize>,
        candidates:  usize,
        seed:        u64,
    ) -> Self {
        Self { n_events, n_features, vocab_sizes, candidates, seed }
    }

    fn candidate(&self, rng: &mut StdRng, hard: bool) -> Candidate {
        let pt: f32 = if hard { rng.gen_range(2.0..25.0) } else { rng.gen_range(0.3..4.0) };
        let eta: f32 = rng.gen_range(-2.5..2.5);
        let phi: f32 = rng.gen_range(-PI..PI);

        let mut features = vec![0.0f32; self.n_features];
        let leading = [pt, eta, phi];
        let slots   = self.n_features - 2;
        for (slot, value) in features.iter_mut().zip(leading.iter()).take(slots) {
            *slot = *value;
        }
        features[slots]     = pt * phi.cos();
        features[slots + 1] = pt * phi.sin();

        let codes = self
            .vocab_sizes
            .iter()
            .enumerate()
            .map(|(i, &vocab)| {
                let code = match i {
                    1 => (if hard { 1 } else { 2 }) % vocab,
                    _ => rng.gen_range(0..vocab),
                };
                code as i64
            })
            .collect();

        Candidate::new(features, codes)
    }

    fn event(&self, rng: &mut StdRng) -> Event {
        let max_hard = (self.candidates / 4).clamp(1, 8);
        let n_hard   = rng.gen_range(1..=max_hard);
        let max_pu   = self.candidates - n_hard;
        let n_pu     = if max_pu == 0 { 0 } else { rng.gen_range(max_pu / 2..=max_pu) };

        let mut candidates = Vec::with_capacity(n_hard + n_pu);
        for i in 0..n_hard + n_pu {
            candidates.push(self.candidate(rng, i < n_hard));
        }

        let (sx, sy) = candidates[..n_hard]
            .iter()
            .filter_map(Candidate::momentum)
            .fold((0.0, 0.0), |(ax, ay), (px, py)| (ax + px, ay + py));

        candidates.shuffle(rng);
        Event::new(candidates, Some([-sx, -sy]))
    }
}

impl EventSource for SyntheticEventSource {
    fn load_all(&self) -> Result<Vec<Event>> {
        if self.n_features < 2 {
            anyhow::bail!("synthetic events need at least 2 features, got {}", self.n_features);
        }
        if self.candidates == 0 || self.vocab_sizes.contains(&0) {
            anyhow::bail!("synthetic events need a positive candidate count and vocabulary sizes");
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let events: Vec<Event> = (0..self.n_events).map(|_| self.event(&mut rng)).collect();
        tracing::info!(
            "Generated {} synthetic events (seed={}, up to {} candidates)",
            events.len(),
            self.seed,
            self.candidates
        );
        Ok(events)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn source(seed: u64) -> SyntheticEventSource {
        SyntheticEventSource::new(20, 6, vec![13, 3], 30, seed)
    }

    #[test]
    fn test_events_fit_the_model_contract() {
        for event in source(1).load_all().unwrap() {
            assert!(!event.candidates.is_empty());
            assert!(event.candidates.len() <= 30);
            for c in &event.candidates {
                assert_eq!(c.features.len(), 6);
                assert!(c.codes[0] >= 0 && c.codes[0] < 13);
                assert!(c.codes[1] == 1 || c.codes[1] == 2);
            }
        }
    }

    #[test]
    fn test_target_is_minus_hard_scatter_sum() {
        for event in source(2).load_all().unwrap() {
            let (sx, sy) = event
                .candidates
                .iter()
                .filter(|c| c.codes[1] == 1)
                .filter_map(Candidate::momentum)
                .fold((0.0f32, 0.0f32), |(ax, ay), (px, py)| (ax + px, ay + py));
            let [tx, ty] = event.target.unwrap();
            assert!((tx + sx).abs() < 1e-3);
            assert!((ty + sy).abs() < 1e-3);
        }
    }

    #[test]
    fn test_momentum_matches_pt_and_phi() {
        let events = source(3).load_all().unwrap();
        let c = &events[0].candidates[0];
        let (pt, phi) = (c.features[0], c.features[2]);
        assert!((c.features[4] - pt * phi.cos()).abs() < 1e-5);
        assert!((c.features[5] - pt * phi.sin()).abs() < 1e-5);
    }

    #[test]
    fn test_seed_is_reproducible() {
        assert_eq!(source(9).load_all().unwrap(), source(9).load_all().unwrap());
        assert_ne!(source(9).load_all().unwrap(), source(10).load_all().unwrap());
    }

    #[test]
    fn test_two_feature_events_are_pure_momentum() {
        let src = SyntheticEventSource::new(3, 2, vec![], 5, 0);
        for event in src.load_all().unwrap() {
            for c in &event.candidates {
                assert_eq!(c.features.len(), 2);
                assert!(c.codes.is_empty());
            }
        }
    }

    #[test]
    fn test_rejects_single_feature() {
        assert!(SyntheticEventSource::new(1, 1, vec![], 5, 0).load_all().is_err());
    }

    #[test]
    fn test_rejects_empty_shapes() {
        assert!(SyntheticEventSource::new(1, 6, vec![13, 3], 0, 0).load_all().is_err());
        assert!(SyntheticEventSource::new(1, 6, vec![13, 0], 5, 0).load_all().is_err());
    }
}
