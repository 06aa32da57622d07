use glam::Vec2;
use retkit_common::EntityId;
use retkit_kernel::{
    Collider, Entity, FixedStep, FixedStepScheduler, Room, SchedulerConfig, Sprite, World,
};

const GRAVITY: f32 = 3.0;

/// An actor dropped into a walled room, pushed right and down every step.
struct Drop {
    world: World,
    actor: EntityId,
    renders: u32,
}

impl Drop {
    fn new() -> Self {
        let room = Room::from_layout(
            &[
                "#......#", //
                "#......#",
                "#......#",
                "########",
            ],
            16.0,
            None,
        );
        let mut world = World::new(room);
        let actor = EntityId::from_u128(7);
        world.spawn_with_id(
            actor,
            Entity::actor(
                Collider::new(Vec2::new(20.0, 2.0), Vec2::splat(12.0)),
                Some(Sprite::new(Vec2::splat(12.0), Vec2::ZERO, Vec2::splat(0.25))),
            ),
        );
        Self {
            world,
            actor,
            renders: 0,
        }
    }

    fn actor(&self) -> Collider {
        self.world.get(self.actor).unwrap().collider
    }
}

impl FixedStep for Drop {
    fn update(&mut self, _time: f64, _delta: f64) {
        self.world
            .move_entity(self.actor, Vec2::new(1.25, GRAVITY))
            .unwrap();
        self.world.step();
    }

    fn render(&mut self) {
        self.renders += 1;
    }
}

fn run(frame_secs: f64, frames: u32) -> Drop {
    let mut game = Drop::new();
    let mut scheduler = FixedStepScheduler::new(SchedulerConfig::default()).unwrap();
    scheduler.start(0.0);
    for i in 1..=frames {
        scheduler.frame(f64::from(i) * frame_secs, &mut game);
    }
    game
}

#[test]
fn actor_comes_to_rest_in_the_corner() {
    let game = run(1.0 / 64.0, 200);
    let actor = game.actor();
    // Floor row starts at y = 48, right wall at x = 112.
    assert_eq!(actor.position.y + actor.size.y, 48.0);
    assert_eq!(actor.position.x + actor.size.x, 112.0);
    assert_eq!(game.world.tick(), 200);
    assert_eq!(game.renders, 200);
}

#[test]
fn actor_never_enters_a_wall() {
    let mut game = Drop::new();
    let mut scheduler = FixedStepScheduler::new(SchedulerConfig::default()).unwrap();
    scheduler.start(0.0);
    for i in 1..=120 {
        scheduler.frame(f64::from(i) / 64.0, &mut game);
        let actor = game.actor();
        for wall in game.world.room().colliders() {
            let overlap_x = (actor.position.x + actor.size.x).min(wall.position.x + wall.size.x)
                - actor.position.x.max(wall.position.x);
            let overlap_y = (actor.position.y + actor.size.y).min(wall.position.y + wall.size.y)
                - actor.position.y.max(wall.position.y);
            assert!(overlap_x <= 0.0 || overlap_y <= 0.0, "{actor:?} inside {wall:?}");
        }
    }
}

#[test]
fn same_steps_give_same_world_at_any_frame_rate() {
    let a = run(1.0 / 64.0, 96);
    let b = run(3.0 / 64.0, 32);
    assert_eq!(a.world.tick(), b.world.tick());
    assert_eq!(a.world.state_hash(), b.world.state_hash());
    assert_eq!(a.renders, 96);
    assert_eq!(b.renders, 32);
}

#[test]
fn sprite_trails_collider_until_step() {
    let game = run(1.0 / 64.0, 5);
    let entity = game.world.get(game.actor).unwrap();
    assert_eq!(entity.sprite.unwrap().position, entity.collider.position);
    assert_eq!(game.world.sprites().count(), 1);
}
