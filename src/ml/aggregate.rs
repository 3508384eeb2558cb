// ============================================================
// Layer 5 — Candidate Aggregation
// ============================================================
// Collapses the candidate axis: [batch, P, D] → [batch, D'].
// Both variants are sums/means over P, so they do not depend
// on candidate order.
//
//   AveragePool  — mean over candidates.
//
//   WeightedSum  — the tower produces K learned values per
//                  candidate which are joined with the candidate's
//                  original (px, py):
//
//                    K = 1:  [w, px, py]
//                            out = Σ_p w_p · (px_p, py_p)
//
//                    K = 3:  [w, bx, by, px, py]
//                            out = Σ_p (w_p·px_p + bx_p, w_p·py_p + by_p)
//
// This is PUPPI-style pile-up weighting learned end to end:
// a weight near 0 removes a pile-up candidate from the sum,
// a weight near -1 counts a hard-scatter candidate towards MET.
// Padded candidates have px = py = 0 and are not masked.
//
// Reference: Bertolini et al. (2014) "Pileup Per Particle
//            Identification", JHEP 10 (2014) 059

use burn::prelude::*;

use crate::domain::error::ConfigError;

/// How the candidate axis is collapsed (`t_mode` 0 / 1).
#[derive(Config, Debug, PartialEq)]
pub enum AggregationMode {
    AveragePool,
    WeightedSum,
}

impl AggregationMode {
    pub fn from_t_mode(t_mode: u8) -> Result<Self, ConfigError> {
        match t_mode {
            0 => Ok(AggregationMode::AveragePool),
            1 => Ok(AggregationMode::WeightedSum),
            other => Err(ConfigError::UnknownMode(other)),
        }
    }

    pub fn t_mode(&self) -> u8 {
        match self {
            AggregationMode::AveragePool => 0,
            AggregationMode::WeightedSum => 1,
        }
    }
}

/// Number of learned values per candidate the weighted sum consumes.
pub fn learned_columns(with_bias: bool) -> usize {
    if with_bias { 3 } else { 1 }
}

/// [batch, P, D] → [batch, D]
pub fn average_pool<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, _, width] = x.dims();
    x.mean_dim(1).reshape([batch, width])
}

/// [batch, P, K + 2] → [batch, 2], K = 3 with bias, 1 without.
pub fn weighted_sum<B: Backend>(x: Tensor<B, 3>, with_bias: bool) -> Tensor<B, 2> {
    let [batch, candidates, columns] = x.dims();
    let k = learned_columns(with_bias);
    debug_assert_eq!(columns, k + 2, "weighted sum expects {} columns", k + 2);

    let weights = x.clone().slice([0..batch, 0..candidates, 0..1]);
    let pxpy    = x.clone().slice([0..batch, 0..candidates, k..k + 2]);

    // [batch, P, 1] broadcasts over the two momentum columns
    let mut contributions = pxpy.mul(weights);
    if with_bias {
        contributions = contributions + x.slice([0..batch, 0..candidates, 1..3]);
    }

    contributions.sum_dim(1).reshape([batch, 2])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    /// rows: one Vec per candidate, single event
    fn event(rows: &[Vec<f32>]) -> Tensor<TestBackend, 3> {
        let width = rows[0].len();
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Tensor::<TestBackend, 1>::from_floats(flat.as_slice(), &Default::default())
            .reshape([1, rows.len(), width])
    }

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_weighted_sum_without_bias() {
        // w = (1, 0.5, 2), x = (1, 2, 3), y = (0, 1, -1)
        let x = event(&[
            vec![1.0, 1.0, 0.0],
            vec![0.5, 2.0, 1.0],
            vec![2.0, 3.0, -1.0],
        ]);
        assert_close(&values(weighted_sum(x, false)), &[8.0, -1.5]);
    }

    #[test]
    fn test_weighted_sum_with_bias() {
        let x = event(&[
            vec![1.0, 0.5, -0.5, 1.0, 0.0],
            vec![0.5, 0.25, 1.0, 2.0, 1.0],
            vec![2.0, -1.0, 0.0, 3.0, -1.0],
        ]);
        // (8 + 0.5 + 0.25 - 1, -1.5 - 0.5 + 1 + 0)
        assert_close(&values(weighted_sum(x, true)), &[7.75, -1.0]);
    }

    #[test]
    fn test_zero_bias_matches_no_bias() {
        let plain = event(&[vec![1.5, 2.0, -3.0], vec![-0.5, 4.0, 1.0]]);
        let biased = event(&[vec![1.5, 0.0, 0.0, 2.0, -3.0], vec![-0.5, 0.0, 0.0, 4.0, 1.0]]);
        assert_close(&values(weighted_sum(plain, false)), &values(weighted_sum(biased, true)));
    }

    #[test]
    fn test_zero_weights_give_zero() {
        let x = event(&[vec![0.0, 10.0, -3.0], vec![0.0, 4.0, 7.0], vec![0.0, 0.0, 0.0]]);
        assert_close(&values(weighted_sum(x, false)), &[0.0, 0.0]);
    }

    #[test]
    fn test_weighted_sum_is_permutation_invariant() {
        let rows = vec![
            vec![0.3, 0.1, -0.2, 1.0, 2.0],
            vec![-1.0, 0.0, 0.5, -4.0, 0.5],
            vec![0.7, 0.2, 0.2, 3.0, -1.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0],
        ];
        let mut shuffled = rows.clone();
        shuffled.swap(0, 3);
        shuffled.swap(1, 2);
        for with_bias in [true, false] {
            let take = |r: &Vec<Vec<f32>>| -> Vec<Vec<f32>> {
                if with_bias { r.clone() } else { r.iter().map(|c| vec![c[0], c[3], c[4]]).collect() }
            };
            assert_close(
                &values(weighted_sum(event(&take(&rows)), with_bias)),
                &values(weighted_sum(event(&take(&shuffled)), with_bias)),
            );
        }
    }

    #[test]
    fn test_batch_events_are_independent() {
        // two events, two candidates each, no bias
        let flat = [1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 1.0, 0.0, 0.0, 5.0, 5.0];
        let x = Tensor::<TestBackend, 1>::from_floats(flat.as_slice(), &Default::default())
            .reshape([2, 2, 3]);
        assert_close(&values(weighted_sum(x, false)), &[3.0, 3.0, 2.0, 0.0]);
    }

    #[test]
    fn test_average_pool_is_mean() {
        let x = event(&[vec![1.0, -2.0], vec![3.0, 4.0], vec![5.0, 1.0]]);
        assert_close(&values(average_pool(x)), &[3.0, 1.0]);
    }

    #[test]
    fn test_average_pool_of_constant_is_constant() {
        let v = vec![0.25, -1.5, 7.0];
        let x = event(&vec![v.clone(); 100]);
        assert_close(&values(average_pool(x)), &v);
    }

    #[test]
    fn test_average_pool_is_permutation_invariant() {
        let rows = vec![vec![1.0, 9.0], vec![-4.0, 2.0], vec![0.5, 0.5]];
        let reversed: Vec<Vec<f32>> = rows.iter().rev().cloned().collect();
        assert_close(&values(average_pool(event(&rows))), &values(average_pool(event(&reversed))));
    }

    #[test]
    fn test_t_mode_parsing() {
        assert_eq!(AggregationMode::from_t_mode(0), Ok(AggregationMode::AveragePool));
        assert_eq!(AggregationMode::from_t_mode(1), Ok(AggregationMode::WeightedSum));
        assert_eq!(AggregationMode::from_t_mode(2), Err(ConfigError::UnknownMode(2)));
    }
}
