// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
// training, predicting MET for an event file, or describing a
// model configuration.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// Checkpoint → MET predictions for an event file
pub mod predict_use_case;

// Architecture table of a configuration
pub mod summary_use_case;
