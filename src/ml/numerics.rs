// ============================================================
// Layer 5 — Numeric Precision Policy
// ============================================================
// The full-precision and the quantization-aware networks share
// one topology. The only thing that differs is what happens to
// numbers on their way through an affine layer:
//
//   quantize(w)   — applied to every kernel and bias before use
//   activate(x)   — the nonlinearity after a hidden affine layer
//   linear(x)     — the "linear activation" of projection layers
//   pooled(x)     — the output of candidate average pooling
//
// FullPrecision: identity quantizer, float nonlinearity.
// FixedPoint:    simulated fixed-point arithmetic. Values are
//                snapped to a grid of 2^total_bits levels with
//                2^int_bits covering the integer part.
//
// Gradients flow through the rounding with the straight-through
// estimator:  y = x + detach(q(x) - x)
// Stochastic rounding is a training-time option: without autodiff
// every quantizer rounds to nearest.
//
// Reference: Coelho et al. (2021) "Automatic heterogeneous
//            quantization of deep neural networks for low-latency
//            inference on the edge for particle detectors"
//            Bengio et al. (2013) straight-through estimator

use std::str::FromStr;

use burn::{
    prelude::*,
    tensor::{activation, Distribution},
};

use crate::domain::error::ConfigError;

// ─── Activation ───────────────────────────────────────────────────────────────
/// Float nonlinearity used by the full-precision tower.
#[derive(Config, Debug, PartialEq)]
pub enum Activation {
    Relu,
    Tanh,
    Sigmoid,
    Linear,
}

impl Activation {
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Relu => activation::relu(x),
            Activation::Tanh => activation::tanh(x),
            Activation::Sigmoid => activation::sigmoid(x),
            Activation::Linear => x,
        }
    }
}

impl FromStr for Activation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "tanh" => Ok(Activation::Tanh),
            "sigmoid" => Ok(Activation::Sigmoid),
            "linear" => Ok(Activation::Linear),
            _ => Err(ConfigError::UnknownActivation(s.to_string())),
        }
    }
}

// ─── Quantizer kinds ──────────────────────────────────────────────────────────
/// The fixed-point quantizers that can be selected by name.
///
///   quantized_bits — signed, range [-2^int, 2^int - step]
///   quantized_relu — unsigned, relu then range [0, 2^int - step]
///   quantized_tanh — tanh then signed, range (-1, 1)
#[derive(Config, Debug, PartialEq)]
pub enum QuantizerKind {
    QuantizedBits,
    QuantizedRelu,
    QuantizedTanh,
}

impl QuantizerKind {
    pub fn name(&self) -> &'static str {
        match self {
            QuantizerKind::QuantizedBits => "quantized_bits",
            QuantizerKind::QuantizedRelu => "quantized_relu",
            QuantizerKind::QuantizedTanh => "quantized_tanh",
        }
    }
}

impl FromStr for QuantizerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quantized_bits" => Ok(QuantizerKind::QuantizedBits),
            "quantized_relu" => Ok(QuantizerKind::QuantizedRelu),
            "quantized_tanh" => Ok(QuantizerKind::QuantizedTanh),
            _ => Err(ConfigError::UnknownQuantizer(s.to_string())),
        }
    }
}

// ─── FixedPointQuantizer ──────────────────────────────────────────────────────
/// A validated quantizer: kind + bit widths + scale.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedPointQuantizer {
    kind:       QuantizerKind,
    total_bits: u32,
    int_bits:   u32,
    alpha:      f64,
    stochastic: bool,
}

impl FixedPointQuantizer {
    pub fn new(
        kind:       QuantizerKind,
        total_bits: u32,
        int_bits:   u32,
        alpha:      f64,
        stochastic: bool,
    ) -> Result<Self, ConfigError> {
        // Signed kinds spend one bit on the sign.
        let max_int_bits = match kind {
            QuantizerKind::QuantizedBits => total_bits.saturating_sub(1),
            QuantizerKind::QuantizedRelu => total_bits,
            QuantizerKind::QuantizedTanh => 0,
        };
        let min_total = match kind {
            QuantizerKind::QuantizedRelu => 1,
            _ => 2,
        };
        if !(min_total..=32).contains(&total_bits) || int_bits > max_int_bits {
            return Err(ConfigError::BitWidth {
                quantizer: kind.name(),
                total_bits,
                int_bits,
            });
        }
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(ConfigError::Alpha(alpha));
        }
        Ok(Self { kind, total_bits, int_bits, alpha, stochastic })
    }

    pub fn kind(&self) -> &QuantizerKind {
        &self.kind
    }

    /// Same quantizer with round-to-nearest instead of stochastic rounding.
    pub fn deterministic(&self) -> Self {
        Self { stochastic: false, ..self.clone() }
    }

    /// Distance between two adjacent representable values.
    pub fn step(&self) -> f64 {
        let unit = match self.kind {
            QuantizerKind::QuantizedBits => {
                2f64.powi(self.int_bits as i32) / 2f64.powi(self.total_bits as i32 - 1)
            }
            QuantizerKind::QuantizedRelu => {
                2f64.powi(self.int_bits as i32) / 2f64.powi(self.total_bits as i32)
            }
            QuantizerKind::QuantizedTanh => 1.0 / 2f64.powi(self.total_bits as i32 - 1),
        };
        unit * self.alpha
    }

    /// Smallest and largest integer level on the grid.
    fn levels(&self) -> (f64, f64) {
        let half = 2f64.powi(self.total_bits as i32 - 1);
        match self.kind {
            QuantizerKind::QuantizedBits => (-half, half - 1.0),
            QuantizerKind::QuantizedRelu => (0.0, 2f64.powi(self.total_bits as i32) - 1.0),
            QuantizerKind::QuantizedTanh => (-(half - 1.0), half - 1.0),
        }
    }

    /// Closed interval of values this quantizer can produce.
    pub fn range(&self) -> (f64, f64) {
        let (lo, hi) = self.levels();
        let step = self.step();
        (lo * step, hi * step)
    }

    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let base = match self.kind {
            QuantizerKind::QuantizedBits => x,
            QuantizerKind::QuantizedRelu => activation::relu(x),
            QuantizerKind::QuantizedTanh => activation::tanh(x),
        };

        let step   = self.step();
        let scaled = base.clone().div_scalar(step);
        // stochastic rounding only while gradients are tracked; inference
        // (no autodiff) always rounds to nearest
        let rounded = if self.stochastic && B::ad_enabled() {
            // floor(x + u), u ~ U[0, 1): unbiased in expectation
            let noise = Tensor::random(
                scaled.shape(),
                Distribution::Uniform(0.0, 1.0),
                &scaled.device(),
            );
            (scaled + noise).floor()
        } else {
            scaled.round()
        };
        let (lo, hi) = self.levels();
        let quantized = rounded.clamp(lo, hi).mul_scalar(step);

        // straight-through estimator
        base.clone() + (quantized - base).detach()
    }
}

// ─── NumericPolicy ────────────────────────────────────────────────────────────
/// What an affine/activation component does with its numbers.
pub trait NumericPolicy {
    /// Applied to kernels and biases before they are used.
    fn quantize<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D>;

    /// Nonlinearity of a hidden layer.
    fn activate<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D>;

    /// "Linear" activation of a projection layer.
    fn linear<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D>;

    /// Output of candidate pooling.
    fn pooled<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.linear(x)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FullPrecision {
    pub activation: Activation,
}

impl NumericPolicy for FullPrecision {
    fn quantize<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        x
    }

    fn activate<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.activation.apply(x)
    }

    fn linear<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        x
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedPoint {
    /// Kernels, biases and linear outputs
    pub logit: FixedPointQuantizer,
    /// Hidden-layer nonlinearity
    pub activation: FixedPointQuantizer,
}

impl NumericPolicy for FixedPoint {
    fn quantize<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.logit.apply(x)
    }

    fn activate<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.activation.apply(x)
    }

    fn linear<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.logit.apply(x)
    }

    fn pooled<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.logit.deterministic().apply(x)
    }
}

/// The policy a built model carries; dispatches to one of the two strategies.
#[derive(Debug, Clone, PartialEq)]
pub enum Numerics {
    Full(FullPrecision),
    Quantized(FixedPoint),
}

impl Numerics {
    pub fn is_quantized(&self) -> bool {
        matches!(self, Numerics::Quantized(_))
    }

    /// Range of values a linear output can take, if bounded.
    pub fn linear_range(&self) -> Option<(f64, f64)> {
        match self {
            Numerics::Full(_) => None,
            Numerics::Quantized(fp) => Some(fp.logit.range()),
        }
    }
}

impl NumericPolicy for Numerics {
    fn quantize<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Numerics::Full(p) => p.quantize(x),
            Numerics::Quantized(p) => p.quantize(x),
        }
    }

    fn activate<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Numerics::Full(p) => p.activate(x),
            Numerics::Quantized(p) => p.activate(x),
        }
    }

    fn linear<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Numerics::Full(p) => p.linear(x),
            Numerics::Quantized(p) => p.linear(x),
        }
    }

    fn pooled<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Numerics::Full(p) => p.pooled(x),
            Numerics::Quantized(p) => p.pooled(x),
        }
    }
}

// ─── Configuration ────────────────────────────────────────────────────────────
/// Bit widths and quantizer choice for the quantization-aware variant.
#[derive(Config, Debug, PartialEq)]
pub struct QuantizationConfig {
    #[config(default = 7)]
    pub logit_total_bits: u32,
    #[config(default = 2)]
    pub logit_int_bits: u32,
    #[config(default = 7)]
    pub activation_total_bits: u32,
    #[config(default = 2)]
    pub activation_int_bits: u32,
    #[config(default = "QuantizerKind::QuantizedBits")]
    pub logit_quantizer: QuantizerKind,
    #[config(default = "QuantizerKind::QuantizedRelu")]
    pub activation_quantizer: QuantizerKind,
    #[config(default = 1.0)]
    pub alpha: f64,
    #[config(default = false)]
    pub use_stochastic_rounding: bool,
}

impl QuantizationConfig {
    /// Validate bit widths and quantizer roles.
    ///
    /// Kernels and biases are signed, so only `quantized_bits` may be
    /// the logit quantizer. Stochastic rounding applies to the logit
    /// quantizer only, and only on an autodiff backend.
    pub fn build(&self) -> Result<FixedPoint, ConfigError> {
        if self.logit_quantizer != QuantizerKind::QuantizedBits {
            return Err(ConfigError::QuantizerRole {
                quantizer: self.logit_quantizer.name(),
                role: "logit",
            });
        }
        let logit = FixedPointQuantizer::new(
            self.logit_quantizer.clone(),
            self.logit_total_bits,
            self.logit_int_bits,
            self.alpha,
            self.use_stochastic_rounding,
        )?;
        let activation = FixedPointQuantizer::new(
            self.activation_quantizer.clone(),
            self.activation_total_bits,
            self.activation_int_bits,
            1.0,
            false,
        )?;
        Ok(FixedPoint { logit, activation })
    }
}

/// Which numeric policy a model is built with.
#[derive(Config, Debug, PartialEq)]
pub enum PrecisionConfig {
    Full,
    Quantized(QuantizationConfig),
}

impl PrecisionConfig {
    pub fn build(&self, activation: &Activation) -> Result<Numerics, ConfigError> {
        match self {
            PrecisionConfig::Full => Ok(Numerics::Full(FullPrecision {
                activation: activation.clone(),
            })),
            PrecisionConfig::Quantized(q) => Ok(Numerics::Quantized(q.build()?)),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;

    fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    fn tensor(v: &[f32]) -> Tensor<TestBackend, 1> {
        Tensor::from_floats(v, &Default::default())
    }

    fn bits(total: u32, int: u32) -> FixedPointQuantizer {
        FixedPointQuantizer::new(QuantizerKind::QuantizedBits, total, int, 1.0, false).unwrap()
    }

    #[test]
    fn test_quantized_bits_grid() {
        // 7 bits, 2 integer bits: step 1/16, range [-4, 4 - 1/16]
        let q = bits(7, 2);
        assert_eq!(q.step(), 1.0 / 16.0);
        assert_eq!(q.range(), (-4.0, 4.0 - 1.0 / 16.0));
    }

    #[test]
    fn test_quantized_bits_rounds_and_clips() {
        let q   = bits(7, 2);
        let out = values(q.apply(tensor(&[0.03, 0.1, -10.0, 10.0, 1.5])));
        assert_eq!(out, vec![0.0, 0.125, -4.0, 3.9375, 1.5]);
    }

    #[test]
    fn test_quantized_relu_is_unsigned() {
        // 7 bits, 2 integer bits unsigned: step 1/32, range [0, 4 - 1/32]
        let q = FixedPointQuantizer::new(QuantizerKind::QuantizedRelu, 7, 2, 1.0, false).unwrap();
        assert_eq!(q.range(), (0.0, 4.0 - 1.0 / 32.0));
        let out = values(q.apply(tensor(&[-1.0, 0.5, 100.0])));
        assert_eq!(out, vec![0.0, 0.5, 4.0 - 1.0 / 32.0]);
    }

    #[test]
    fn test_quantized_tanh_stays_inside_unit_interval() {
        let q = FixedPointQuantizer::new(QuantizerKind::QuantizedTanh, 4, 0, 1.0, false).unwrap();
        for v in values(q.apply(tensor(&[-50.0, -0.3, 0.0, 0.3, 50.0]))) {
            assert!(v > -1.0 && v < 1.0);
        }
    }

    #[test]
    fn test_stochastic_rounding_lands_on_grid() {
        let q = FixedPointQuantizer::new(QuantizerKind::QuantizedBits, 7, 2, 1.0, true).unwrap();
        let x = Tensor::<Autodiff<TestBackend>, 1>::from_floats(
            [0.01, 0.3, -0.7, 2.2].as_slice(),
            &Default::default(),
        );
        for v in q.apply(x).into_data().to_vec::<f32>().unwrap() {
            let level = v as f64 / q.step();
            assert!((level - level.round()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stochastic_rounding_is_off_without_autodiff() {
        let q     = FixedPointQuantizer::new(QuantizerKind::QuantizedBits, 7, 2, 1.0, true).unwrap();
        let input = [0.01, 0.03, 0.3, -0.7, 2.2, 0.09];
        let first = values(q.apply(tensor(&input)));
        for _ in 0..8 {
            assert_eq!(values(q.apply(tensor(&input))), first);
        }
        assert_eq!(first, values(q.deterministic().apply(tensor(&input))));
    }

    #[test]
    fn test_alpha_scales_the_grid() {
        let q = FixedPointQuantizer::new(QuantizerKind::QuantizedBits, 7, 2, 0.5, false).unwrap();
        assert_eq!(q.range(), (-2.0, 2.0 - 1.0 / 32.0));
    }

    #[test]
    fn test_invalid_bit_widths_rejected() {
        assert!(matches!(
            FixedPointQuantizer::new(QuantizerKind::QuantizedBits, 4, 4, 1.0, false),
            Err(ConfigError::BitWidth { .. })
        ));
        assert!(FixedPointQuantizer::new(QuantizerKind::QuantizedBits, 0, 0, 1.0, false).is_err());
        assert!(FixedPointQuantizer::new(QuantizerKind::QuantizedRelu, 40, 2, 1.0, false).is_err());
        assert!(matches!(
            FixedPointQuantizer::new(QuantizerKind::QuantizedBits, 8, 2, 0.0, false),
            Err(ConfigError::Alpha(_))
        ));
    }

    #[test]
    fn test_unknown_quantizer_name() {
        assert_eq!(
            "quantized_po2".parse::<QuantizerKind>(),
            Err(ConfigError::UnknownQuantizer("quantized_po2".into()))
        );
        assert_eq!("quantized_relu".parse::<QuantizerKind>(), Ok(QuantizerKind::QuantizedRelu));
    }

    #[test]
    fn test_relu_cannot_quantize_kernels() {
        let cfg = QuantizationConfig::new().with_logit_quantizer(QuantizerKind::QuantizedRelu);
        assert!(matches!(cfg.build(), Err(ConfigError::QuantizerRole { role: "logit", .. })));
    }

    #[test]
    fn test_full_precision_is_identity_for_params() {
        let policy = FullPrecision { activation: Activation::Relu };
        assert_eq!(values(policy.quantize(tensor(&[0.123, -7.0]))), vec![0.123, -7.0]);
        assert_eq!(values(policy.activate(tensor(&[0.5, -7.0]))), vec![0.5, 0.0]);
    }

    #[test]
    fn test_pooling_quantizer_ignores_stochastic_rounding() {
        let cfg    = QuantizationConfig::new().with_use_stochastic_rounding(true);
        let policy = cfg.build().unwrap();
        // 0.05 rounds to 1/16 deterministically; stochastic could give 0
        for _ in 0..10 {
            assert_eq!(values(policy.pooled(tensor(&[0.05]))), vec![0.0625]);
        }
    }

    #[test]
    fn test_activation_names() {
        assert_eq!("ReLU".parse::<Activation>(), Ok(Activation::Relu));
        assert!("swish".parse::<Activation>().is_err());
    }
}
