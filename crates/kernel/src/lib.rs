//! Simulation kernel: axis-aligned colliders with swept motion, entities,
//! the room grid, world state and the fixed-timestep scheduler.
//!
//! # Invariants
//! - Motion resolves X first, applies it, then sweeps Y from the new position.
//! - Entry times are in `[0, 1]`; 1 means unobstructed.
//! - Room access outside the grid is an error, never clamped.
//! - World iteration order is the `EntityId` order.

pub mod collider;
pub mod entity;
pub mod room;
pub mod scheduler;
pub mod world;

pub use collider::{Axis, Collider};
pub use entity::{Entity, Role, Sprite};
pub use room::{Room, RoomError};
pub use scheduler::{
    Clock, FixedStep, FixedStepScheduler, FrameReport, MonotonicClock, SchedulerConfig,
    SchedulerError,
};
pub use world::{World, WorldError};

pub fn crate_info() -> &'static str {
    "retkit-kernel v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("retkit-kernel"));
    }
}
