// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use peniko::{Brush, Color};
use strata_imaging::{
    DrawOp, ImagingBackend, ImagingBackendExt, PaintDesc, Picture, PictureRecorder, RectF,
    ResourceBackend, StateOp,
};
use strata_imaging_ref::RefBackend;

/// Record an `n` x `n` grid of 10px cells, every eighth row inside an
/// opacity layer.
fn record_grid(recorder: &mut PictureRecorder, n: usize) -> Picture {
    let side = n as f32 * 10.0;
    recorder
        .record(RectF::new(0.0, 0.0, side, side), |c| {
            let paint = c.create_paint(PaintDesc {
                brush: Brush::Solid(Color::BLACK),
            });
            c.state(StateOp::SetPaint(paint));
            for row in 0..n {
                let y = row as f32 * 10.0;
                let draw_row = |c: &mut strata_imaging::RecordingCanvas| {
                    for col in 0..n {
                        let x = col as f32 * 10.0;
                        c.draw(DrawOp::fill_rect(RectF::from_xywh(x, y, 8.0, 8.0)));
                    }
                };
                if row % 8 == 0 {
                    c.with_opacity_layer(0.5, draw_row);
                } else {
                    draw_row(c);
                }
            }
        })
        .expect("recorder is idle")
}

fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("picture_record_grid");
    for &n in &[32usize, 64, 128] {
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            let mut recorder = PictureRecorder::new();
            b.iter(|| black_box(record_grid(&mut recorder, n)));
        });
    }
    group.finish();
}

fn bench_playback(c: &mut Criterion) {
    let mut recorder = PictureRecorder::new();
    let mut group = c.benchmark_group("picture_playback_grid");
    for &n in &[32usize, 64, 128] {
        let picture = record_grid(&mut recorder, n);
        let visible = RectF::from_xywh(40.0, 40.0, 160.0, 120.0);
        group.throughput(Throughput::Elements(picture.draw_count() as u64));
        group.bench_function(BenchmarkId::new("full", n), |b| {
            b.iter_batched(
                RefBackend::default,
                |mut target| {
                    picture.playback(&mut target);
                    target
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_function(BenchmarkId::new("culled", n), |b| {
            b.iter_batched(
                RefBackend::default,
                |mut target| {
                    picture.playback_in_rect(&mut target, visible);
                    target
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_function(BenchmarkId::new("query", n), |b| {
            b.iter(|| picture.query(black_box(visible)).len());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_record, bench_playback);
criterion_main!(benches);
