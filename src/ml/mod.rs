// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn modules, tensor maths and the training loop live here.
// The data layer only builds tensors through the Batcher trait.
//
// What's in this layer:
//
//   numerics.rs   — Activations, fixed-point quantizers and the
//                   NumericPolicy that switches a layer between
//                   full precision and quantized arithmetic
//
//   layers.rs     — FeatureSplitter, CategoricalEmbedder, Dense
//                   and the Dense + BatchNorm tower
//
//   aggregate.rs  — Average pooling and the PUPPI-style weighted
//                   sum over candidates
//
//   model.rs      — DenseEmbedding: the end-to-end MET regressor
//                   and its config / build-time validation
//
//   trainer.rs    — The training loop (Adam, MSE, checkpoints)
//
//   inferencer.rs — Loads a checkpoint and predicts (px, py)
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Activations, quantizers and numeric policies
pub mod numerics;

/// Per-candidate layers shared by both model variants
pub mod layers;

/// Candidate-axis aggregation
pub mod aggregate;

/// DenseEmbedding MET model
pub mod model;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and predicts MET
pub mod inferencer;

use burn::prelude::Backend;

/// Backend for inference; NdArray (CPU) unless built with `--features wgpu`.
#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub fn default_device() -> <InferBackend as Backend>::Device {
    Default::default()
}
