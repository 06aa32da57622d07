use glam::Vec2;
use retkit_common::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::collider::Collider;
use crate::entity::{Entity, Role, Sprite};
use crate::room::Room;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("entity {0:?} not found")]
    EntityNotFound(EntityId),
}

/// The authoritative simulation state.
///
/// A static [`Room`] grid plus free-standing entities. Entities live in a
/// BTreeMap so iteration, rendering order and [`World::state_hash`] are
/// deterministic across platforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    room: Room,
    entities: BTreeMap<EntityId, Entity>,
    tick: u64,
}

impl Default for World {
    fn default() -> Self {
        Self::new(Room::new(0, 0))
    }
}

impl World {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            entities: BTreeMap::new(),
            tick: 0,
        }
    }

    /// Number of completed simulation steps.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn room_mut(&mut self) -> &mut Room {
        &mut self.room
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, Entity> {
        &self.entities
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = EntityId::new();
        self.spawn_with_id(id, entity);
        id
    }

    /// Insert under a caller-chosen id, replacing any entity already there.
    pub fn spawn_with_id(&mut self, id: EntityId, entity: Entity) {
        tracing::debug!(?id, role = ?entity.role, "spawn");
        self.entities.insert(id, entity);
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Everything `id` collides with: room tiles, then every free-standing
    /// tile entity except `id` itself.
    fn obstacles_for(&self, id: EntityId) -> Vec<Collider> {
        self.room
            .colliders()
            .copied()
            .chain(
                self.entities
                    .iter()
                    .filter(|(other, e)| **other != id && e.role == Role::Tile)
                    .map(|(_, e)| e.collider),
            )
            .collect()
    }

    /// Sweep an entity by `motion` against the static geometry and return the
    /// displacement actually applied.
    pub fn move_entity(&mut self, id: EntityId, motion: Vec2) -> Result<Vec2, WorldError> {
        if !self.entities.contains_key(&id) {
            return Err(WorldError::EntityNotFound(id));
        }
        let obstacles = self.obstacles_for(id);
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        let applied = entity.collider.move_by(motion, &obstacles);
        tracing::trace!(?id, ?motion, ?applied, "move");
        Ok(applied)
    }

    /// Finish one simulation step: advance the tick and bring every sprite
    /// up to date with its collider.
    pub fn step(&mut self) {
        self.tick += 1;
        for tile in self.room.tiles_mut() {
            tile.synchronise_sprite();
        }
        for entity in self.entities.values_mut() {
            entity.synchronise_sprite();
        }
    }

    /// Sprites in draw order: room tiles row-major, then entities by id.
    pub fn sprites(&self) -> impl Iterator<Item = &Sprite> {
        self.room
            .tiles()
            .chain(self.entities.values())
            .filter_map(|e| e.sprite.as_ref())
    }

    /// FNV-1a over the tick and every entity's id, role and collider box.
    /// Two worlds driven by the same steps hash equal.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for (id, entity) in &self.entities {
            mix(&mut h, id.0.as_bytes());
            mix(&mut h, &[entity.role as u8]);
            let c = entity.collider;
            for v in [c.position.x, c.position.y, c.size.x, c.size.y] {
                mix(&mut h, &v.to_le_bytes());
            }
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: f32, y: f32) -> Collider {
        Collider::new(Vec2::new(x, y), Vec2::splat(16.0))
    }

    fn sprite() -> Sprite {
        Sprite::new(Vec2::splat(16.0), Vec2::ZERO, Vec2::splat(0.25))
    }

    #[test]
    fn world_starts_empty() {
        let w = World::default();
        assert_eq!(w.tick(), 0);
        assert_eq!(w.entity_count(), 0);
        assert_eq!(w.sprites().count(), 0);
    }

    #[test]
    fn spawn_and_despawn() {
        let mut w = World::default();
        let id = w.spawn(Entity::actor(boxed(0.0, 0.0), None));
        assert_eq!(w.entity_count(), 1);
        assert!(w.get(id).is_some());

        assert!(w.despawn(id).is_some());
        assert_eq!(w.entity_count(), 0);
        assert!(w.despawn(id).is_none());
    }

    #[test]
    fn move_unknown_entity_fails() {
        let mut w = World::default();
        let id = EntityId::new();
        assert_eq!(
            w.move_entity(id, Vec2::ONE),
            Err(WorldError::EntityNotFound(id))
        );
    }

    #[test]
    fn move_is_blocked_by_room_and_tile_entities() {
        let mut w = World::new(Room::from_layout(&["...#"], 16.0, None));
        let player = w.spawn(Entity::actor(boxed(0.0, 0.0), None));
        // Room tile at x = 48 on row 0.
        let applied = w.move_entity(player, Vec2::new(64.0, 0.0)).unwrap();
        assert_eq!(applied, Vec2::new(32.0, 0.0));

        w.spawn(Entity::tile(boxed(32.0, 32.0), None));
        let applied = w.move_entity(player, Vec2::new(0.0, 32.0)).unwrap();
        assert_eq!(applied, Vec2::new(0.0, 16.0));
    }

    #[test]
    fn actors_do_not_block_each_other() {
        let mut w = World::default();
        let a = w.spawn(Entity::actor(boxed(0.0, 0.0), None));
        w.spawn(Entity::actor(boxed(20.0, 0.0), None));
        let applied = w.move_entity(a, Vec2::new(40.0, 0.0)).unwrap();
        assert_eq!(applied, Vec2::new(40.0, 0.0));
    }

    #[test]
    fn tile_entity_does_not_block_itself() {
        let mut w = World::default();
        let t = w.spawn(Entity::tile(boxed(0.0, 0.0), None));
        let applied = w.move_entity(t, Vec2::new(4.0, 0.0)).unwrap();
        assert_eq!(applied, Vec2::new(4.0, 0.0));
    }

    #[test]
    fn step_increments_tick_and_syncs_sprites() {
        let mut w = World::default();
        let id = w.spawn(Entity::actor(boxed(0.0, 0.0), Some(sprite())));
        w.move_entity(id, Vec2::new(3.0, 4.0)).unwrap();
        assert_eq!(w.get(id).unwrap().sprite.unwrap().position, Vec2::ZERO);
        w.step();
        assert_eq!(w.tick(), 1);
        assert_eq!(w.get(id).unwrap().sprite.unwrap().position, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn sprites_put_room_tiles_first() {
        let tile_sprite = sprite().with_color(glam::Vec3::new(1.0, 0.0, 0.0));
        let mut w = World::new(Room::from_layout(&["#"], 16.0, Some(tile_sprite)));
        w.spawn(Entity::actor(boxed(32.0, 0.0), Some(sprite())));
        w.spawn(Entity::tile(boxed(64.0, 0.0), None));
        let sprites: Vec<&Sprite> = w.sprites().collect();
        assert_eq!(sprites.len(), 2);
        assert_eq!(sprites[0].color, glam::Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(sprites[1].position, Vec2::new(32.0, 0.0));
    }

    #[test]
    fn state_hash_deterministic() {
        let id = EntityId::new();
        let mut w1 = World::default();
        let mut w2 = World::default();
        w1.spawn_with_id(id, Entity::actor(boxed(0.0, 0.0), None));
        w2.spawn_with_id(id, Entity::actor(boxed(0.0, 0.0), None));
        for w in [&mut w1, &mut w2] {
            w.move_entity(id, Vec2::new(1.5, 2.5)).unwrap();
            w.step();
        }
        assert_eq!(w1.state_hash(), w2.state_hash());

        w2.move_entity(id, Vec2::new(0.5, 0.0)).unwrap();
        assert_ne!(w1.state_hash(), w2.state_hash());
    }

    #[test]
    fn btreemap_gives_deterministic_iteration() {
        let mut w = World::default();
        for _ in 0..100 {
            w.spawn(Entity::tile(boxed(0.0, 0.0), None));
        }
        let keys: Vec<EntityId> = w.entities().keys().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
