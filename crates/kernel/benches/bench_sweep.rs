use std::hint::black_box;
use std::time::Instant;

use glam::Vec2;
use retkit_kernel::{Collider, Entity, Room, World};

fn scattered_obstacles(count: usize) -> Vec<Collider> {
    let side = (count as f32).sqrt().ceil() as usize;
    (0..count)
        .map(|i| {
            let x = (i % side) as f32 * 24.0;
            let y = (i / side) as f32 * 24.0;
            Collider::new(Vec2::new(x, y), Vec2::splat(16.0))
        })
        .collect()
}

fn bench_move_by(obstacle_count: usize, iterations: usize) {
    let obstacles = scattered_obstacles(obstacle_count);
    let start_box = Collider::new(Vec2::new(-20.0, 3.0), Vec2::splat(16.0));

    let start = Instant::now();
    for i in 0..iterations {
        let mut mover = start_box;
        let motion = Vec2::new((i % 7) as f32 + 1.0, (i % 5) as f32 - 2.0);
        black_box(mover.move_by(black_box(motion), black_box(&obstacles)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  move_by ({obstacle_count} obstacles, {iterations} iters): \
         {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_world_move(rows: usize, iterations: usize) {
    let row = "#.".repeat(20);
    let layout: Vec<&str> = (0..rows).map(|_| row.as_str()).collect();
    let mut world = World::new(Room::from_layout(&layout, 16.0, None));
    let player = world.spawn(Entity::actor(
        Collider::new(Vec2::new(16.0, 0.0), Vec2::splat(16.0)),
        None,
    ));

    let start = Instant::now();
    for i in 0..iterations {
        let dir = if i % 2 == 0 { 1.0 } else { -1.0 };
        let _ = black_box(world.move_entity(player, black_box(Vec2::new(0.0, 4.0 * dir))));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  world move ({} tiles, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}",
        world.room().tiles().count()
    );
}

fn main() {
    println!("=== Sweep Resolver Benchmarks ===\n");

    println!("Collider::move_by:");
    bench_move_by(10, 100000);
    bench_move_by(100, 10000);
    bench_move_by(1000, 1000);

    println!("\nWorld::move_entity (room tiles + obstacle collection):");
    bench_world_move(4, 10000);
    bench_world_move(16, 10000);
    bench_world_move(64, 1000);

    println!("\n=== Done ===");
}
