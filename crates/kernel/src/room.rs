use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collider::Collider;
use crate::entity::{Entity, Sprite};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("tile ({x}, {y}) is outside a {width}x{height} room")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

/// Fixed-size grid of optional tiles, stored row-major.
///
/// Coordinates are signed so callers can ask about cells left of or above
/// the room and get an error back instead of a wrapped index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    width: u32,
    height: u32,
    tiles: Vec<Option<Entity>>,
}

impl Room {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![None; width as usize * height as usize],
        }
    }

    /// Build a room from text rows. Every `#` becomes a tile of
    /// `tile_size` at `(x * tile_size, y * tile_size)`; anything else is empty.
    /// The room is as wide as the longest row.
    pub fn from_layout(rows: &[&str], tile_size: f32, template: Option<Sprite>) -> Self {
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let mut room = Self::new(width, rows.len() as u32);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c != '#' {
                    continue;
                }
                let collider = Collider::new(
                    Vec2::new(x as f32 * tile_size, y as f32 * tile_size),
                    Vec2::splat(tile_size),
                );
                let index = room.width as usize * y + x;
                room.tiles[index] = Some(Entity::tile(collider, template));
            }
        }
        room
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Result<usize, RoomError> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return Err(RoomError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }

    pub fn get_tile(&self, x: i32, y: i32) -> Result<Option<&Entity>, RoomError> {
        let index = self.index(x, y)?;
        Ok(self.tiles[index].as_ref())
    }

    /// Place or clear a tile. Returns whatever occupied the cell before.
    pub fn set_tile(
        &mut self,
        x: i32,
        y: i32,
        tile: Option<Entity>,
    ) -> Result<Option<Entity>, RoomError> {
        let index = self.index(x, y)?;
        Ok(std::mem::replace(&mut self.tiles[index], tile))
    }

    /// Occupied tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Entity> + Clone {
        self.tiles.iter().flatten()
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.tiles.iter_mut().flatten()
    }

    pub fn colliders(&self) -> impl Iterator<Item = &Collider> + Clone {
        self.tiles().map(|t| &t.collider)
    }
}
