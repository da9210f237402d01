// Benchmarks for enclosure analysis and the observer sweep.
//
// `find_enclosure` is the hot path of every observer check: a sealed room
// terminates quickly, while an observer under open sky explores the full
// search cube before giving up. The sweep benchmark measures a whole check
// of many observers, which runs the flood fills on rayon's pool.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use frostcraft_sim::command::{SimAction, SimCommand};
use frostcraft_sim::config::GameConfig;
use frostcraft_sim::enclosure::find_enclosure;
use frostcraft_sim::host::InMemoryHost;
use frostcraft_sim::sim::SimState;
use frostcraft_sim::types::{ObserverId, VoxelCoord, WorldId, WorldPos};
use frostcraft_sim::world::VoxelWorld;
use std::collections::BTreeMap;
use std::hint::black_box;

fn room_world() -> VoxelWorld {
    let mut world = VoxelWorld::new(VoxelCoord::new(-40, -40, -40), 80, 80, 80);
    world.hollow_box(VoxelCoord::new(-6, -3, -6), VoxelCoord::new(6, 3, 6), "stone");
    world
}

fn bench_find_enclosure(c: &mut Criterion) {
    let world = room_world();
    let mut group = c.benchmark_group("find_enclosure");
    group.bench_function("sealed_room", |b| {
        b.iter(|| find_enclosure(black_box(VoxelCoord::new(0, 0, 0)), &world, 32))
    });
    group.bench_function("open_sky_r16", |b| {
        b.iter(|| find_enclosure(black_box(VoxelCoord::new(20, 20, 20)), &world, 16))
    });
    group.finish();
}

fn bench_observer_sweep(c: &mut Criterion) {
    let mut worlds = BTreeMap::new();
    worlds.insert(WorldId(0), room_world());
    let mut config = GameConfig::default();
    config.enclosure.max_radius = 16;

    c.bench_function("observer_sweep_64", |b| {
        b.iter_batched(
            || {
                let commands: Vec<SimCommand> = (0..64u64)
                    .map(|i| SimCommand {
                        tick: 0,
                        action: SimAction::ObserverJoined {
                            observer_id: ObserverId(i),
                            world: WorldId(0),
                            // Half inside the room, half outside.
                            position: if i % 2 == 0 {
                                WorldPos::new((i % 5) as f32 - 2.0, 0.5, 0.5)
                            } else {
                                WorldPos::new(20.5, 0.5, (i % 7) as f32)
                            },
                        },
                    })
                    .collect();
                (SimState::with_config(config.clone()), commands)
            },
            |(mut sim, commands)| {
                let mut host = InMemoryHost::new();
                sim.step(&worlds, &mut host, &commands, 1)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_find_enclosure, bench_observer_sweep);
criterion_main!(benches);
