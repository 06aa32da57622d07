//! Swept axis-aligned boxes.
//!
//! # Invariants
//! - Entry times lie in `[0, 1]`; 1 means the motion is unobstructed.
//! - X motion is resolved and applied before the Y sweep, which starts from
//!   the updated position.
//! - Zero motion on an axis and degenerate obstacles never block.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned box: `position` is the top-left corner, `size` the extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub position: Vec2,
    pub size: Vec2,
}

/// The axis a sweep travels along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn perpendicular(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    fn of(self, v: Vec2) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }
}

impl Collider {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self { position, size }
    }

    /// A box with no area on either axis. Degenerate boxes never block.
    pub fn is_degenerate(&self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Whether the open extents of both boxes intersect along `axis`.
    /// Touching edges do not overlap.
    pub fn overlaps_on(&self, axis: Axis, other: &Collider) -> bool {
        let a_min = axis.of(self.position);
        let a_max = a_min + axis.of(self.size);
        let b_min = axis.of(other.position);
        let b_max = b_min + axis.of(other.size);
        a_min < b_max && a_max > b_min
    }

    /// Fraction of `motion` along `axis` that can be travelled before this
    /// box first touches `other`. Returns 1.0 when nothing is hit within the
    /// motion, including when the boxes do not share the perpendicular extent.
    pub fn sweep(&self, axis: Axis, motion: f32, other: &Collider) -> f32 {
        if other.is_degenerate() || !self.overlaps_on(axis.perpendicular(), other) {
            return 1.0;
        }

        let position = axis.of(self.position);
        let size = axis.of(self.size);
        let other_position = axis.of(other.position);
        let other_size = axis.of(other.size);

        let entry_time = if motion > 0.0 {
            (other_position - position - size) / motion
        } else if motion < 0.0 {
            (other_position + other_size - position) / motion
        } else {
            return 1.0;
        };

        if (0.0..1.0).contains(&entry_time) {
            entry_time
        } else {
            1.0
        }
    }

    pub fn sweep_x(&self, motion: f32, other: &Collider) -> f32 {
        self.sweep(Axis::X, motion, other)
    }

    pub fn sweep_y(&self, motion: f32, other: &Collider) -> f32 {
        self.sweep(Axis::Y, motion, other)
    }

    /// Move by `motion`, stopping at the first obstacle on each axis.
    ///
    /// X is resolved and applied first, then Y is swept from the updated
    /// position. This lets a box slide along a wall but is only an
    /// approximation for diagonal approaches onto a corner. Returns the
    /// displacement actually applied.
    pub fn move_by<'a, I>(&mut self, motion: Vec2, obstacles: I) -> Vec2
    where
        I: IntoIterator<Item = &'a Collider>,
        I::IntoIter: Clone,
    {
        let obstacles = obstacles.into_iter();

        let entry_x = obstacles
            .clone()
            .map(|other| self.sweep_x(motion.x, other))
            .fold(1.0_f32, f32::min);
        let applied_x = motion.x * entry_x;
        self.position.x += applied_x;

        let entry_y = obstacles
            .map(|other| self.sweep_y(motion.y, other))
            .fold(1.0_f32, f32::min);
        let applied_y = motion.y * entry_y;
        self.position.y += applied_y;

        Vec2::new(applied_x, applied_y)
    }
}
