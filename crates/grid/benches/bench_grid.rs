use std::hint::black_box;
use std::time::Instant;

use glam::IVec3;
use habitat_common::Edge;
use habitat_grid::{BuildingGrid, GridConfig};

const UNIT: i32 = 4;

/// A square slab of `side * side` floors with a ceiling and a perimeter wall.
fn make_hall(side: i32) -> BuildingGrid {
    let mut grid = BuildingGrid::new(GridConfig { grid_unit: UNIT }).unwrap();
    for x in 0..side {
        for z in 0..side {
            let pos = IVec3::new(x * UNIT, 0, z * UNIT);
            grid.add_floor(pos);
            grid.add_floor(pos + IVec3::Y * UNIT);
            if x == 0 {
                grid.add_wall(pos, Edge::Left);
            }
            if x == side - 1 {
                grid.add_wall(pos, Edge::Right);
            }
            if z == 0 {
                grid.add_wall(pos, Edge::Back);
            }
            if z == side - 1 {
                grid.add_wall(pos, Edge::Front);
            }
        }
    }
    grid
}

fn bench_build(side: i32, iterations: usize) {
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(make_hall(black_box(side)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  build hall ({side}x{side}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_split(side: i32, iterations: usize) {
    let hall = make_hall(side);
    // Cutting a full row of floors and ceilings separates the hall in two.
    let cut = side / 2;

    let start = Instant::now();
    for _ in 0..iterations {
        let mut grid = hall.clone();
        for z in 0..side {
            let pos = IVec3::new(cut * UNIT, 0, z * UNIT);
            let _ = grid.remove_floor(pos + IVec3::Y * UNIT);
            let _ = grid.remove_floor(pos);
            let _ = grid.remove_wall(pos, Edge::Back);
            let _ = grid.remove_wall(pos, Edge::Front);
        }
        black_box(grid.system_count());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  split hall ({side}x{side}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_sealed_query(side: i32, iterations: usize) {
    let grid = make_hall(side);
    let probe = IVec3::new(side / 2 * UNIT, 0, side / 2 * UNIT);

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(grid.is_sealed(black_box(probe)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  is_sealed ({side}x{side}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn main() {
    println!("=== Building Grid Benchmarks ===\n");

    println!("Placement (join + resize + seal per module):");
    bench_build(4, 100);
    bench_build(8, 20);
    bench_build(16, 2);

    println!("\nDisconnecting removal (split + seal):");
    bench_split(4, 100);
    bench_split(8, 10);

    println!("\nSeal query:");
    bench_sealed_query(8, 100_000);
    bench_sealed_query(16, 100_000);

    println!("\n=== Done ===");
}
