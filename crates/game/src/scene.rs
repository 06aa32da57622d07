//! The testbed scene: one actor sliding against two free-standing tiles.

use glam::Vec2;
use retkit_common::EntityId;
use retkit_kernel::{Collider, Entity, Sprite, World};

pub const PLAYER: EntityId = EntityId::from_u128(1);
pub const TILE_SIZE: f32 = 16.0;
pub const PLAYER_START: Vec2 = Vec2::new(32.0, 16.0);
pub const TILE_POSITIONS: [Vec2; 2] = [Vec2::new(96.0, 32.0), Vec2::new(80.0, 48.0)];
/// Atlas region edge, in texture coordinates.
pub const TEXEL_SIZE: f32 = 0.25;

/// Pixels per step an arrow key adds to the player's motion.
pub const NUDGE: f32 = 1.0;

pub fn player_sprite() -> Sprite {
    Sprite::new(Vec2::splat(TILE_SIZE), Vec2::ZERO, Vec2::splat(TEXEL_SIZE))
}

pub fn tile_sprite() -> Sprite {
    Sprite::new(
        Vec2::splat(TILE_SIZE),
        Vec2::new(0.0, 0.5),
        Vec2::splat(TEXEL_SIZE),
    )
}

pub fn build_world() -> World {
    let mut world = World::default();
    world.spawn_with_id(
        PLAYER,
        Entity::actor(
            Collider::new(PLAYER_START, Vec2::splat(TILE_SIZE)),
            Some(player_sprite()),
        ),
    );
    for (i, position) in TILE_POSITIONS.into_iter().enumerate() {
        world.spawn_with_id(
            EntityId::from_u128(2 + i as u128),
            Entity::tile(
                Collider::new(position, Vec2::splat(TILE_SIZE)),
                Some(tile_sprite()),
            ),
        );
    }
    world
}

/// Scripted drift at simulation time `time`.
pub fn player_motion(time: f64) -> Vec2 {
    Vec2::new(
        ((time * 4.0).sin() * 2.0) as f32,
        ((time + 1.0).sin() / 2.0) as f32,
    )
}

/// Atlas x offset of the two-frame walk cycle, switching every 0.1 s.
pub fn animation_offset(time: f64) -> f32 {
    (((time * 10.0).floor() as i64) & 1) as f32 * TEXEL_SIZE
}
