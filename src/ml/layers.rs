// ============================================================
// Layer 5 — Building Blocks
// ============================================================
// The per-candidate pieces of the network:
//
//   FeatureSplitter      — carves (px, py) out of the continuous
//                          features, no parameters
//   CategoricalEmbedder  — one embedding table per categorical
//                          attribute
//   Dense                — affine layer whose kernel, bias and
//                          activation go through a NumericPolicy
//   DenseTower           — n blocks of Dense + BatchNorm with
//                          widths 8·2^n, 8·2^(n-1), ..., 16
//
// Every block works on [batch, candidates, features] tensors and
// treats the candidate axis like a batch axis, so the same weights
// are applied to every candidate.
//
// Reference: Burn Book §3 (Building Blocks)
//            Ioffe & Szegedy (2015) Batch Normalization

use burn::{
    module::Ignored,
    nn::{
        BatchNorm, BatchNormConfig,
        Embedding, EmbeddingConfig,
        Initializer,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::domain::error::ConfigError;
use crate::ml::numerics::{NumericPolicy, Numerics};

/// LeCun uniform: U(-sqrt(3 / fan_in), sqrt(3 / fan_in))
pub fn lecun_uniform() -> Initializer {
    Initializer::KaimingUniform { gain: 1.0, fan_out_only: false }
}

/// Variance scaling N(0, scale / fan_in)
pub fn variance_scaling(scale: f64) -> Initializer {
    Initializer::KaimingNormal { gain: scale.sqrt(), fan_out_only: false }
}

/// Widest hidden layer a tower may have.
pub const MAX_TOWER_WIDTH: usize = 1 << 16;

/// Block widths of a tower with `n_layers` blocks: 8·2^n, ..., 16.
pub fn tower_widths(n_layers: usize) -> Result<Vec<usize>, ConfigError> {
    let too_wide = ConfigError::TowerWidth { n_dense_layers: n_layers, max: MAX_TOWER_WIDTH };
    let widest = u32::try_from(n_layers)
        .ok()
        .and_then(|n| 2usize.checked_pow(n))
        .and_then(|w| w.checked_mul(8))
        .filter(|&w| w <= MAX_TOWER_WIDTH)
        .ok_or(too_wide)?;
    Ok((0..n_layers).map(|k| widest >> k).collect())
}

// ─── FeatureSplitter ──────────────────────────────────────────────────────────
/// Returns the trailing two continuous features of every candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSplitter {
    n_features: usize,
}

impl FeatureSplitter {
    pub fn new(n_features: usize) -> Result<Self, ConfigError> {
        if n_features < 2 {
            return Err(ConfigError::TooFewFeatures(n_features));
        }
        Ok(Self { n_features })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// [batch, P, F] → [batch, P, 2]
    pub fn momentum<B: Backend>(&self, continuous: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, candidates, _] = continuous.dims();
        continuous.slice([0..batch, 0..candidates, self.n_features - 2..self.n_features])
    }
}

// ─── CategoricalEmbedder ──────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CategoricalEmbedder<B: Backend> {
    tables: Vec<Embedding<B>>,
}

impl<B: Backend> CategoricalEmbedder<B> {
    /// One `vocab × emb_dim` table per attribute, N(0, 0.4 / emb_dim).
    pub fn new(vocab_sizes: &[usize], emb_dim: usize, device: &B::Device) -> Self {
        let std = 0.4 / emb_dim as f64;
        let tables = vocab_sizes
            .iter()
            .map(|&vocab| {
                EmbeddingConfig::new(vocab, emb_dim)
                    .with_initializer(Initializer::Normal { mean: 0.0, std })
                    .init(device)
            })
            .collect();
        Self { tables }
    }

    pub fn num_attributes(&self) -> usize {
        self.tables.len()
    }

    /// codes: [batch, P, C] → C tensors of [batch, P, E], in attribute order.
    pub fn forward(&self, codes: Tensor<B, 3, Int>) -> Vec<Tensor<B, 3>> {
        let [batch, candidates, _] = codes.dims();
        self.tables
            .iter()
            .enumerate()
            .map(|(i, table)| {
                let column = codes
                    .clone()
                    .slice([0..batch, 0..candidates, i..i + 1])
                    .reshape([batch, candidates]);
                table.forward(column)
            })
            .collect()
    }

    /// (vocab, emb_dim) of every table
    pub fn table_shapes(&self) -> Vec<[usize; 2]> {
        self.tables.iter().map(|t| t.weight.val().dims()).collect()
    }
}

// ─── Dense ────────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct DenseConfig {
    pub d_input:  usize,
    pub d_output: usize,
    /// Hidden layers use the policy's nonlinearity, projections its linear pass.
    #[config(default = false)]
    pub nonlinear: bool,
    #[config(default = "Initializer::XavierUniform { gain: 1.0 }")]
    pub initializer: Initializer,
}

impl DenseConfig {
    pub fn init<B: Backend>(&self, numerics: &Numerics, device: &B::Device) -> Dense<B> {
        let linear = LinearConfig::new(self.d_input, self.d_output)
            .with_initializer(self.initializer.clone())
            .init(device);
        Dense {
            linear,
            numerics: Ignored(numerics.clone()),
            nonlinear: self.nonlinear,
        }
    }
}

/// Affine layer with kernel/bias quantization and activation delegated to the policy.
#[derive(Module, Debug)]
pub struct Dense<B: Backend> {
    linear:    Linear<B>,
    numerics:  Ignored<Numerics>,
    nonlinear: bool,
}

impl<B: Backend> Dense<B> {
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let policy = &self.numerics.0;

        let weight = policy.quantize(self.linear.weight.val());
        let mut out = input.matmul(weight.unsqueeze());
        if let Some(bias) = &self.linear.bias {
            out = out + policy.quantize(bias.val()).unsqueeze();
        }

        if self.nonlinear {
            policy.activate(out)
        } else {
            policy.linear(out)
        }
    }

    /// [d_input, d_output]
    pub fn shape(&self) -> [usize; 2] {
        self.linear.weight.val().dims()
    }

    pub fn is_nonlinear(&self) -> bool {
        self.nonlinear
    }
}

// ─── DenseTower ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct TowerBlock<B: Backend> {
    dense: Dense<B>,
    norm:  BatchNorm<B, 1>,
}

impl<B: Backend> TowerBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.dense.forward(x);
        // BatchNorm wants channels on dim 1: [batch, width, P]
        self.norm.forward(x.swap_dims(1, 2)).swap_dims(1, 2)
    }

    pub fn dense(&self) -> &Dense<B> {
        &self.dense
    }
}

#[derive(Module, Debug)]
pub struct DenseTower<B: Backend> {
    blocks: Vec<TowerBlock<B>>,
}

impl<B: Backend> DenseTower<B> {
    /// `bn_momentum` uses the running-statistic decay convention
    /// (0.95 keeps 95% of the old estimate every step).
    pub fn new(
        d_input:     usize,
        widths:      &[usize],
        bn_momentum: f64,
        numerics:    &Numerics,
        device:      &B::Device,
    ) -> Self {
        let mut d_in   = d_input;
        let mut blocks = Vec::with_capacity(widths.len());
        for &width in widths {
            let dense = DenseConfig::new(d_in, width)
                .with_nonlinear(true)
                .with_initializer(lecun_uniform())
                .init(numerics, device);
            // Burn weights the new batch statistic by `momentum`.
            let norm = BatchNormConfig::new(width)
                .with_momentum(1.0 - bn_momentum)
                .init(device);
            blocks.push(TowerBlock { dense, norm });
            d_in = width;
        }
        Self { blocks }
    }

    pub fn forward(&self, mut x: Tensor<B, 3>) -> Tensor<B, 3> {
        for block in &self.blocks {
            x = block.forward(x);
        }
        x
    }

    pub fn blocks(&self) -> &[TowerBlock<B>] {
        &self.blocks
    }

    pub fn output_width(&self) -> Option<usize> {
        self.blocks.last().map(|b| b.dense.shape()[1])
    }
}
