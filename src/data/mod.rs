// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw events to tensor batches:
//
//   SyntheticEventSource / JsonEventSource
//       │                     → Vec<Event>
//       ▼
//   EventPreprocessor         → pad to P candidates, validate codes
//       │
//       ▼
//   split_train_val           → seeded shuffle + split
//       │
//       ▼
//   EventDataset              → implements Burn's Dataset trait
//       │
//       ▼
//   EventBatcher              → stacks samples into tensors
//       │
//       ▼
//   DataLoader                → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Seeded generator of labelled toy events
pub mod synthetic;

/// Loads events from a JSON file
pub mod loader;

/// Pads events to the model's candidate count and validates them
pub mod preprocessor;

/// Implements Burn's Dataset trait for padded events
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
