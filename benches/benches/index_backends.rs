// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use strata_index::{Aabb2D, Backend, FlatVec, RTree, RTreeFactory};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f32(&mut self) -> f32 {
        let v = self.next_u64() >> 40;
        (v as f32) / ((1u64 << 24) as f32)
    }
}

fn grid_rects(n: usize, cell: f32) -> Vec<(usize, Aabb2D<f32>)> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let slot = y * n + x;
            out.push((
                slot,
                Aabb2D::from_xywh(x as f32 * cell, y as f32 * cell, cell, cell),
            ));
        }
    }
    out
}

/// Display-list shaped input: many small glyph-sized boxes plus a few large
/// backgrounds.
fn scene_rects(count: usize, world: f32) -> Vec<(usize, Aabb2D<f32>)> {
    let mut rng = Rng::new(0x5EED_CAFE_F00D_0001);
    (0..count)
        .map(|slot| {
            let (w, h) = if slot % 64 == 0 {
                (world * 0.5, world * 0.25)
            } else {
                (4.0 + rng.next_f32() * 12.0, 8.0 + rng.next_f32() * 8.0)
            };
            let x = rng.next_f32() * world;
            let y = rng.next_f32() * world;
            (slot, Aabb2D::from_xywh(x, y, w, h))
        })
        .collect()
}

fn flat(entries: &[(usize, Aabb2D<f32>)]) -> FlatVec<f32> {
    let mut backend = FlatVec::default();
    for &(slot, aabb) in entries {
        backend.insert(slot, aabb);
    }
    backend
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build_f32_grid");
    for &n in &[32usize, 64, 128] {
        let entries = grid_rects(n, 10.0);
        group.throughput(Throughput::Elements(entries.len() as u64));
        group.bench_function(BenchmarkId::new("FlatVec", n), |b| {
            b.iter(|| black_box(flat(&entries)));
        });
        group.bench_function(BenchmarkId::new("RTree", n), |b| {
            let factory = RTreeFactory::default();
            b.iter(|| black_box(factory.build(entries.iter().copied())));
        });
    }
    group.finish();
}

fn bench_visit_rect(c: &mut Criterion) {
    fn run(b: &mut criterion::Bencher, backend: &impl Backend<f32>, windows: &[Aabb2D<f32>]) {
        b.iter(|| {
            let mut total = 0usize;
            for &window in windows {
                backend.visit_rect(window, |_| total += 1);
            }
            total
        });
    }

    let mut group = c.benchmark_group("index_visit_rect_f32_scene");
    for &count in &[1_000usize, 10_000, 50_000] {
        let entries = scene_rects(count, 4000.0);
        let mut rng = Rng::new(0xA11C_E5EE_D000_0002);
        let windows: Vec<_> = (0..64)
            .map(|_| {
                let (x, y) = (rng.next_f32() * 3600.0, rng.next_f32() * 3600.0);
                Aabb2D::from_xywh(x, y, 400.0, 300.0)
            })
            .collect();
        let flat = flat(&entries);
        let tree: RTree<f32> = RTreeFactory::default().build(entries.iter().copied());

        group.throughput(Throughput::Elements(windows.len() as u64));
        group.bench_function(BenchmarkId::new("FlatVec", count), |b| run(b, &flat, &windows));
        group.bench_function(BenchmarkId::new("RTree", count), |b| run(b, &tree, &windows));
    }
    group.finish();
}

fn bench_node_capacity(c: &mut Criterion) {
    let entries = scene_rects(20_000, 4000.0);
    let window = Aabb2D::from_xywh(1800.0, 1800.0, 400.0, 300.0);
    let mut group = c.benchmark_group("rtree_node_capacity");
    for &capacity in &[4usize, 8, 16, 32] {
        let tree: RTree<f32> = RTreeFactory::new(capacity).build(entries.iter().copied());
        group.bench_function(BenchmarkId::from_parameter(capacity), |b| {
            b.iter(|| tree.query_rect(black_box(window)).count());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_visit_rect, bench_node_capacity);
criterion_main!(benches);
