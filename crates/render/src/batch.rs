//! Quad batching into one pre-sized vertex buffer.
//!
//! # Invariants
//! - `pushed_quads <= capacity` at all times; a push on a full batch is an
//!   error and writes nothing.
//! - Quad `i` occupies vertices `4i..4i+4` in the order bottom-left,
//!   bottom-right, top-right, top-left, matching indices
//!   `[4i, 4i+1, 4i+2, 4i+2, 4i+3, 4i]`.
//! - Vertex storage is allocated once; `reset` only rewinds the count.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use retkit_kernel::Sprite;
use thiserror::Error;

use crate::handles::BufferId;

/// Largest vertex index a 16-bit element buffer can address, plus one.
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("batch is full ({capacity} quads)")]
    CapacityExceeded { capacity: usize },
    #[error("{capacity} quads need {vertices} vertices, more than 16-bit indices address (65536)")]
    IndexRangeExceeded { capacity: usize, vertices: usize },
}

/// One interleaved vertex: 2 position, 3 color, 2 texcoord floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BatchVertex {
    pub position: [f32; 2],
    pub color: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl BatchVertex {
    pub const FLOATS: usize = 7;
    pub const SIZE: usize = std::mem::size_of::<BatchVertex>();
}

/// An axis-aligned quad in pixel space with its atlas rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    /// Top-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub texel_min: Vec2,
    pub texel_max: Vec2,
    pub color: Vec3,
}

impl From<&Sprite> for Quad {
    fn from(sprite: &Sprite) -> Self {
        Self {
            position: sprite.draw_position(),
            size: sprite.size,
            texel_min: sprite.texel_origin,
            texel_max: sprite.texel_origin + sprite.texel_size,
            color: sprite.color,
        }
    }
}

/// Index pattern for `capacity` quads.
pub fn quad_indices(capacity: usize) -> Vec<u16> {
    let mut indices = Vec::with_capacity(capacity * 6);
    for quad in 0..capacity {
        let i = (quad * 4) as u16;
        indices.extend_from_slice(&[i, i + 1, i + 2, i + 2, i + 3, i]);
    }
    indices
}

/// CPU-side vertex storage plus the backend buffers it flushes into.
///
/// Built by `Renderer::build_batch`, which also allocates and fills the
/// backend buffers.
#[derive(Debug, Clone)]
pub struct Batch {
    vertex_buffer: BufferId,
    element_buffer: BufferId,
    vertices: Vec<BatchVertex>,
    capacity: usize,
    pushed_quads: usize,
    flushed_quads: usize,
}

impl Batch {
    pub(crate) fn new(
        capacity: usize,
        vertex_buffer: BufferId,
        element_buffer: BufferId,
    ) -> Result<Self, BatchError> {
        Self::check_capacity(capacity)?;
        Ok(Self {
            vertex_buffer,
            element_buffer,
            vertices: vec![BatchVertex::default(); capacity * 4],
            capacity,
            pushed_quads: 0,
            flushed_quads: 0,
        })
    }

    pub fn check_capacity(capacity: usize) -> Result<(), BatchError> {
        let vertices = capacity.saturating_mul(4);
        if vertices > MAX_VERTICES {
            return Err(BatchError::IndexRangeExceeded { capacity, vertices });
        }
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pushed_quads(&self) -> usize {
        self.pushed_quads
    }

    /// Quads the last flush uploaded; what the next draw covers.
    pub fn flushed_quads(&self) -> usize {
        self.flushed_quads
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.pushed_quads
    }

    pub fn is_full(&self) -> bool {
        self.pushed_quads == self.capacity
    }

    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    pub fn element_buffer(&self) -> BufferId {
        self.element_buffer
    }

    /// Vertices pushed since the last reset or flush.
    pub fn vertices(&self) -> &[BatchVertex] {
        &self.vertices[..self.pushed_quads * 4]
    }

    pub fn push_quad(&mut self, quad: Quad) -> Result<(), BatchError> {
        if self.is_full() {
            return Err(BatchError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let Quad {
            position: p,
            size: s,
            texel_min: a,
            texel_max: b,
            color,
        } = quad;
        let color = color.to_array();
        let vertex = |x: f32, y: f32, u: f32, v: f32| BatchVertex {
            position: [x, y],
            color,
            tex_coord: [u, v],
        };

        let start = self.pushed_quads * 4;
        self.vertices[start..start + 4].copy_from_slice(&[
            vertex(p.x, p.y + s.y, a.x, b.y),
            vertex(p.x + s.x, p.y + s.y, b.x, b.y),
            vertex(p.x + s.x, p.y, b.x, a.y),
            vertex(p.x, p.y, a.x, a.y),
        ]);
        self.pushed_quads += 1;
        Ok(())
    }

    pub fn push_sprite(&mut self, sprite: &Sprite) -> Result<(), BatchError> {
        self.push_quad(Quad::from(sprite))
    }

    /// Rewind to empty. Storage is reused.
    pub fn reset(&mut self) {
        self.pushed_quads = 0;
    }

    /// Record that the pushed range was uploaded and start the next frame.
    pub(crate) fn mark_flushed(&mut self) {
        self.flushed_quads = self.pushed_quads;
        self.pushed_quads = 0;
    }
}
