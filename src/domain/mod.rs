// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the system works on:
// events, their pile-up candidates, and the errors raised
// when a configuration or an input violates its contract.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Everything that turns these types into tensors lives in
// Layer 4 (data) and Layer 5 (ml).

// An event and its fixed-length list of candidates
pub mod event;

// Typed configuration and data-contract errors
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
