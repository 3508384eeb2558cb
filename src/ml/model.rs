// ============================================================
// Layer 5 — Dense Embedding MET Model
// ============================================================
// Estimates the missing transverse momentum (px, py) of an event
// from a fixed-length list of P pile-up candidates.
//
//   continuous [batch, P, F] ──┬─────────────────────────► (px, py) [batch, P, 2]
//                              │                                │
//   codes [batch, P, C] ─► embeddings (C × [batch, P, E])       │
//                              │                                │
//                   concat [batch, P, F + C·E]                  │
//                              │                                │
//                   dense tower  → [batch, P, 16]               │
//                              │                                │
//          t_mode 0:  average pool → output head → [batch, 2]   │
//          t_mode 1:  projection → [batch, P, K] ─ concat ◄─────┘
//                     weighted sum → [batch, 2]
//                     (+ output head when with_bias)
//
// The quantization-aware variant is the same graph built with a
// fixed-point NumericPolicy (see numerics.rs); no layer type is
// duplicated. Its projection and output layers snap to the signed
// logit grid rather than the activation quantizer used by the
// QKeras model, so negative weights and MET components survive.

use std::fmt;

use burn::{module::Ignored, prelude::*};

use crate::domain::error::ConfigError;
use crate::ml::aggregate::{average_pool, learned_columns, weighted_sum, AggregationMode};
use crate::ml::layers::{
    tower_widths, variance_scaling, CategoricalEmbedder, Dense, DenseConfig, DenseTower,
    FeatureSplitter,
};
use crate::ml::numerics::{Activation, NumericPolicy, Numerics, PrecisionConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct DenseEmbeddingConfig {
    /// Continuous features per candidate; the last two are (px, py)
    #[config(default = 6)]
    pub n_features: usize,
    /// Number of categorical attributes per candidate
    #[config(default = 2)]
    pub n_features_cat: usize,
    #[config(default = 3)]
    pub n_dense_layers: usize,
    /// Fixed candidate count per event (zero padded)
    #[config(default = 100)]
    pub number_of_pupcandis: usize,
    /// Vocabulary size of each categorical attribute
    #[config(default = "vec![13, 3]")]
    pub embedding_input_dim: Vec<usize>,
    #[config(default = 8)]
    pub emb_out_dim: usize,
    /// Weighted sum with a per-candidate (bx, by) and a final output head
    #[config(default = true)]
    pub with_bias: bool,
    #[config(default = "AggregationMode::AveragePool")]
    pub t_mode: AggregationMode,
    #[config(default = "Activation::Relu")]
    pub activation: Activation,
    /// Decay of the batch-norm running statistics
    #[config(default = 0.95)]
    pub bn_momentum: f64,
    #[config(default = "PrecisionConfig::Full")]
    pub precision: PrecisionConfig,
}

impl DenseEmbeddingConfig {
    /// Width of the per-candidate vector entering the tower.
    pub fn tower_input_width(&self) -> usize {
        self.n_features + self.n_features_cat * self.emb_out_dim
    }

    /// Check everything that does not need a device.
    pub fn validate(&self) -> Result<Numerics, ConfigError> {
        FeatureSplitter::new(self.n_features)?;

        if self.embedding_input_dim.len() != self.n_features_cat {
            return Err(ConfigError::VocabularyCount {
                expected: self.n_features_cat,
                got:      self.embedding_input_dim.len(),
            });
        }
        if let Some(index) = self.embedding_input_dim.iter().position(|&v| v == 0) {
            return Err(ConfigError::EmptyVocabulary { index });
        }
        for (name, value) in [
            ("emb_out_dim", self.emb_out_dim),
            ("number_of_pupcandis", self.number_of_pupcandis),
            ("n_dense_layers", self.n_dense_layers),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDimension(name));
            }
        }
        tower_widths(self.n_dense_layers)?;
        if !(0.0..1.0).contains(&self.bn_momentum) {
            return Err(ConfigError::Momentum(self.bn_momentum));
        }

        self.precision.build(&self.activation)
    }

    /// Build the model. Every configuration error surfaces here,
    /// before the first forward pass.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DenseEmbedding<B>, ConfigError> {
        let numerics = self.validate()?;
        let splitter = FeatureSplitter::new(self.n_features)?;

        let embedder = CategoricalEmbedder::new(&self.embedding_input_dim, self.emb_out_dim, device);
        let widths   = tower_widths(self.n_dense_layers)?;
        let tower_out = *widths.last().ok_or(ConfigError::ZeroDimension("n_dense_layers"))?;
        let tower = DenseTower::new(
            self.tower_input_width(),
            &widths,
            self.bn_momentum,
            &numerics,
            device,
        );

        let (projection, head) = match self.t_mode {
            AggregationMode::AveragePool => {
                let head = DenseConfig::new(tower_out, 2).init(&numerics, device);
                (None, Some(head))
            }
            AggregationMode::WeightedSum => {
                // small initial weights: every candidate starts near w = 0
                let projection = DenseConfig::new(tower_out, learned_columns(self.with_bias))
                    .with_initializer(variance_scaling(0.02))
                    .init(&numerics, device);
                let head = self
                    .with_bias
                    .then(|| DenseConfig::new(2, 2).init(&numerics, device));
                (Some(projection), head)
            }
        };

        tracing::debug!(
            "Built {} model: t_mode={}, with_bias={}, tower_in={}",
            if numerics.is_quantized() { "quantized" } else { "full-precision" },
            self.t_mode.t_mode(),
            self.with_bias,
            self.tower_input_width(),
        );

        Ok(DenseEmbedding {
            splitter:    Ignored(splitter),
            embedder,
            tower,
            projection,
            head,
            aggregation: Ignored(self.t_mode.clone()),
            with_bias:   self.with_bias,
            numerics:    Ignored(numerics),
            candidates:  self.number_of_pupcandis,
        })
    }
}

#[derive(Module, Debug)]
pub struct DenseEmbedding<B: Backend> {
    splitter:    Ignored<FeatureSplitter>,
    embedder:    CategoricalEmbedder<B>,
    tower:       DenseTower<B>,
    /// Per-candidate weights (t_mode 1 only)
    projection:  Option<Dense<B>>,
    /// Final 2-output affine map (t_mode 0, or t_mode 1 with bias)
    head:        Option<Dense<B>>,
    aggregation: Ignored<AggregationMode>,
    with_bias:   bool,
    numerics:    Ignored<Numerics>,
    candidates:  usize,
}

impl<B: Backend> DenseEmbedding<B> {
    /// continuous: [batch, P, F], codes: [batch, P, C] → [batch, 2]
    pub fn forward(&self, continuous: Tensor<B, 3>, codes: Tensor<B, 3, Int>) -> Tensor<B, 2> {
        let pxpy = self.splitter.0.momentum(continuous.clone());

        let mut parts = vec![continuous];
        parts.extend(self.embedder.forward(codes));
        let x = self.tower.forward(Tensor::cat(parts, 2));

        let aggregated = match self.aggregation.0 {
            AggregationMode::AveragePool => self.numerics.0.pooled(average_pool(x)),
            AggregationMode::WeightedSum => {
                let learned = match &self.projection {
                    Some(projection) => projection.forward(x),
                    None => x,
                };
                let summed = weighted_sum(Tensor::cat(vec![learned, pxpy], 2), self.with_bias);
                // without bias the sum is the model output
                match &self.head {
                    Some(_) => summed,
                    None => self.numerics.0.linear(summed),
                }
            }
        };

        match &self.head {
            Some(head) => head.forward(aggregated),
            None => aggregated,
        }
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn numerics(&self) -> &Numerics {
        &self.numerics.0
    }

    /// Every layer in evaluation order, with its shape and parameter count.
    pub fn summary(&self) -> Vec<LayerSummary> {
        let mut layers = Vec::new();

        for (i, [vocab, dim]) in self.embedder.table_shapes().into_iter().enumerate() {
            layers.push(LayerSummary::new(format!("embedding{i}"), vocab, dim, vocab * dim));
        }
        for (i, block) in self.tower.blocks().iter().enumerate() {
            let [d_in, d_out] = block.dense().shape();
            layers.push(LayerSummary::new(format!("dense{i}"), d_in, d_out, d_in * d_out + d_out));
            // gamma and beta; running mean/var are not trained
            layers.push(LayerSummary::new(format!("batch_norm{i}"), d_out, d_out, 2 * d_out));
        }
        if let Some(projection) = &self.projection {
            let [d_in, d_out] = projection.shape();
            layers.push(LayerSummary::new("weights", d_in, d_out, d_in * d_out + d_out));
            layers.push(LayerSummary::new("weighted_sum", d_out + 2, 2, 0));
        } else {
            let width = self.tower.output_width().unwrap_or(0);
            layers.push(LayerSummary::new("pool", width, width, 0));
        }
        if let Some(head) = &self.head {
            let [d_in, d_out] = head.shape();
            layers.push(LayerSummary::new("output", d_in, d_out, d_in * d_out + d_out));
        }
        layers
    }
}

/// One row of the architecture table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSummary {
    pub name:     String,
    pub d_input:  usize,
    pub d_output: usize,
    pub params:   usize,
}

impl LayerSummary {
    fn new(name: impl Into<String>, d_input: usize, d_output: usize, params: usize) -> Self {
        Self { name: name.into(), d_input, d_output, params }
    }
}

impl fmt::Display for LayerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<14} {:>6} → {:<6} {:>8} params",
            self.name, self.d_input, self.d_output, self.params
        )
    }
}
