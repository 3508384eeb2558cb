// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by training and inference:
//
//   checkpoint.rs — model weights (Burn CompactRecorder) plus
//                   the JSON config needed to rebuild the model
//
//   metrics.rs    — per-epoch loss/MAE appended to a CSV file

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
