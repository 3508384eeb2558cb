//! Error types shared across layers.
//!
//! `ConfigError` covers everything that can be wrong with a model
//! configuration; it is raised while the model is being built, never
//! during a forward pass. `DataError` covers events that break the
//! input contract of a built model (feature width, code range).

use thiserror::Error;

/// Invalid model configuration, detected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("n_features must be at least 2 to carry (px, py), got {0}")]
    TooFewFeatures(usize),

    #[error("expected {expected} embedding vocabulary sizes (one per categorical feature), got {got}")]
    VocabularyCount { expected: usize, got: usize },

    #[error("vocabulary size of categorical feature {index} must be positive")]
    EmptyVocabulary { index: usize },

    #[error("{0} must be positive")]
    ZeroDimension(&'static str),

    #[error("unknown aggregation mode t_mode={0}, expected 0 (average pool) or 1 (weighted sum)")]
    UnknownMode(u8),

    #[error("n_dense_layers={n_dense_layers} makes the first tower layer wider than {max}")]
    TowerWidth { n_dense_layers: usize, max: usize },

    #[error("batch-norm momentum must lie in [0, 1), got {0}")]
    Momentum(f64),

    #[error("unknown activation '{0}'")]
    UnknownActivation(String),

    #[error("unknown quantizer '{0}'")]
    UnknownQuantizer(String),

    #[error("quantizer '{quantizer}' cannot be used as the {role} quantizer")]
    QuantizerRole { quantizer: &'static str, role: &'static str },

    #[error("invalid bit widths for {quantizer}: total_bits={total_bits}, int_bits={int_bits}")]
    BitWidth { quantizer: &'static str, total_bits: u32, int_bits: u32 },

    #[error("quantizer alpha must be positive and finite, got {0}")]
    Alpha(f64),
}

/// An event that does not fit the input contract of the model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("candidate {candidate} has {got} continuous features, expected {expected}")]
    FeatureWidth { candidate: usize, expected: usize, got: usize },

    #[error("candidate {candidate} has {got} categorical codes, expected {expected}")]
    CodeCount { candidate: usize, expected: usize, got: usize },

    #[error("candidate {candidate}: code {code} of categorical feature {feature} is outside [0, {vocab})")]
    OutOfVocabulary { candidate: usize, feature: usize, code: i64, vocab: usize },

    #[error("event has no target momentum")]
    MissingTarget,
}
