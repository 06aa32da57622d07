use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::collider::Collider;

/// What an entity is for in the simulation. Behaviour does not differ by
/// role; it only decides who moves and who blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Player or script driven; moves through the resolver.
    Actor,
    /// Static obstacle.
    Tile,
}

/// Rendering data for one quad drawn from the shared atlas.
///
/// `texel_origin` and `texel_size` are normalized atlas coordinates. `color`
/// multiplies the sampled texel; alpha is always 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub position: Vec2,
    pub offset: Vec2,
    pub size: Vec2,
    pub texel_origin: Vec2,
    pub texel_size: Vec2,
    pub color: Vec3,
}

impl Sprite {
    /// White, unoffset sprite covering the given atlas region.
    pub fn new(size: Vec2, texel_origin: Vec2, texel_size: Vec2) -> Self {
        Self {
            position: Vec2::ZERO,
            offset: Vec2::ZERO,
            size,
            texel_origin,
            texel_size,
            color: Vec3::ONE,
        }
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Top-left corner of the drawn quad.
    pub fn draw_position(&self) -> Vec2 {
        self.position + self.offset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub role: Role,
    pub collider: Collider,
    pub sprite: Option<Sprite>,
}

impl Entity {
    pub fn new(role: Role, collider: Collider, sprite: Option<Sprite>) -> Self {
        let mut entity = Self {
            role,
            collider,
            sprite,
        };
        entity.synchronise_sprite();
        entity
    }

    pub fn actor(collider: Collider, sprite: Option<Sprite>) -> Self {
        Self::new(Role::Actor, collider, sprite)
    }

    pub fn tile(collider: Collider, sprite: Option<Sprite>) -> Self {
        Self::new(Role::Tile, collider, sprite)
    }

    /// Copy the collider position into the sprite.
    pub fn synchronise_sprite(&mut self) {
        if let Some(sprite) = self.sprite.as_mut() {
            sprite.position = self.collider.position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite() -> Sprite {
        Sprite::new(Vec2::splat(16.0), Vec2::ZERO, Vec2::splat(0.25))
    }

    #[test]
    fn construction_synchronises_sprite() {
        let e = Entity::actor(
            Collider::new(Vec2::new(32.0, 16.0), Vec2::splat(16.0)),
            Some(sprite()),
        );
        assert_eq!(e.sprite.map(|s| s.position), Some(Vec2::new(32.0, 16.0)));
    }

    #[test]
    fn synchronise_follows_collider() {
        let mut e = Entity::tile(Collider::new(Vec2::ZERO, Vec2::splat(16.0)), Some(sprite()));
        e.collider.position = Vec2::new(4.0, 5.0);
        assert_eq!(e.sprite.map(|s| s.position), Some(Vec2::ZERO));
        e.synchronise_sprite();
        assert_eq!(e.sprite.map(|s| s.position), Some(Vec2::new(4.0, 5.0)));
    }

    #[test]
    fn offset_shifts_draw_position_only() {
        let mut s = sprite().with_offset(Vec2::new(-2.0, 1.0));
        s.position = Vec2::new(10.0, 10.0);
        assert_eq!(s.draw_position(), Vec2::new(8.0, 11.0));
        assert_eq!(s.position, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn entity_without_sprite_is_fine() {
        let mut e = Entity::tile(Collider::new(Vec2::ZERO, Vec2::ONE), None);
        e.synchronise_sprite();
        assert!(e.sprite.is_none());
        assert_eq!(e.role, Role::Tile);
    }
}
