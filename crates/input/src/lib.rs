//! Input: host window events in, per-frame snapshots out.
//!
//! The host forwards raw events to an [`InputCollector`]; simulation code
//! calls [`InputCollector::process`] once per step and reads the returned
//! [`InputSnapshot`]. Simulation never writes back into the collector.
//!
//! # Invariants
//! - Events are ignored while the collector is unfocused.
//! - An edge (`clicked` / `pressed`) is true only in the first snapshot
//!   after the button or key went down.
//! - The cursor stays inside the logical canvas.

pub mod collector;
pub mod snapshot;

pub use collector::InputCollector;
pub use snapshot::{InputSnapshot, MouseButton};

pub fn crate_info() -> &'static str {
    "retkit-input v0.1.0"
}
