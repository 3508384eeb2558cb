// ============================================================
// Layer 4 — JSON Event Loader
// ============================================================
// Reads events from a JSON file holding an array of Event
// objects:
//
//   [
//     { "candidates": [ { "features": [...], "codes": [...] }, ... ],
//       "target": [px, py] },
//     ...
//   ]
//
// "target" may be omitted for events that are only predicted.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::event::Event;
use crate::domain::traits::EventSource;

pub struct JsonEventSource {
    path: PathBuf,
}

impl JsonEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EventSource for JsonEventSource {
    fn load_all(&self) -> Result<Vec<Event>> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read events from '{}'", self.path.display()))?;
        let events: Vec<Event> = serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a JSON array of events", self.path.display()))?;
        tracing::info!("Loaded {} events from '{}'", events.len(), self.path.display());
        Ok(events)
    }
}
