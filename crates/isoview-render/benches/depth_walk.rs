//! Frame cost of the depth orderings over generated terrain.
//!
//! Run: cargo bench -p isoview-render --bench depth_walk

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::Vec3;
use isoview_common::{ChunkDims, EntityId};
use isoview_render::{Entity, RenderConfig, Scene, SortStrategy};
use isoview_world::{InMemoryStore, LoadMode, MaterialTable, WorldGenerator};

const SEED: u32 = 42;

fn scene(strategy: SortStrategy) -> Scene {
    let store = Arc::new(InMemoryStore::new(
        ChunkDims::new(16, 16, 32),
        WorldGenerator::with_seed(SEED),
        LoadMode::Immediate,
    ));
    let config = RenderConfig {
        sort_strategy: strategy,
        max_window_radius: 2,
        ..RenderConfig::default()
    };
    let mut scene = Scene::new(config, store, Arc::new(MaterialTable::default()));
    scene.add_camera(1280, 720);
    scene
}

fn crowd(count: usize) -> Vec<Entity> {
    let mut rng = fastrand::Rng::with_seed(u64::from(SEED));
    (0..count)
        .map(|i| {
            let position = Vec3::new(rng.f32() * 32.0, rng.f32() * 32.0, rng.f32() * 24.0);
            Entity::new(EntityId::from_raw(i as u64 + 1), position)
        })
        .collect()
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    let entities = crowd(256);

    for strategy in [SortStrategy::Topological, SortStrategy::Scalar, SortStrategy::None] {
        let mut scene = scene(strategy);
        // Warm the window so only the per-frame work is measured.
        let report = scene.tick(entities.as_slice());
        let emitted = report.frames.first().map_or(0, |(_, stats)| stats.emitted);
        group.throughput(Throughput::Elements(emitted as u64));

        group.bench_with_input(
            BenchmarkId::new("tick", format!("{strategy:?}")),
            &entities,
            |b, entities| {
                b.iter(|| black_box(scene.tick(black_box(entities.as_slice()))));
            },
        );
    }

    group.finish();
}

fn bench_crowd_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("crowd");

    for count in [0, 64, 1024, 4096] {
        let entities = crowd(count);
        let mut scene = scene(SortStrategy::Topological);
        scene.tick(entities.as_slice());
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &entities, |b, entities| {
            b.iter(|| black_box(scene.tick(black_box(entities.as_slice()))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_crowd_size);
criterion_main!(benches);
