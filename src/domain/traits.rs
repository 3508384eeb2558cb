// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits, so the
// event source (synthetic generator, JSON file, ...) can be
// swapped without touching the training workflow.

use anyhow::Result;
use crate::domain::event::{Event, MetPrediction};

// ─── EventSource ──────────────────────────────────────────────────────────────
/// Any component that can provide events.
///
/// Implementations:
///   - SyntheticEventSource → seeded physics-flavoured generator
///   - JsonEventSource      → events stored in a JSON file
pub trait EventSource {
    /// Load all available events from this source.
    fn load_all(&self) -> Result<Vec<Event>>;
}

// ─── MetEstimator ─────────────────────────────────────────────────────────────
/// Anything that can turn events into missing-momentum estimates.
pub trait MetEstimator {
    fn estimate(&self, events: &[Event]) -> Result<Vec<MetPrediction>>;
}
