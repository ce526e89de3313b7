// ── State mirror ──
//
// Process-lifetime record of what has been registered and published.
// Rebuilt from scratch on every broker connection; never persisted.

mod mirror;

pub use mirror::{Observation, Reconciliation, Slot, StateMirror};
