//! Benchmarks for support point placement and tree synthesis.
//!
//! Run with: cargo bench -p sla-supports

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mesh_index::IndexedMesh;
use mesh_slice::{grid, slice_mesh};
use mesh_types::{cube, NoControl};
use sla_supports::{AutoSupportConfig, AutoSupports, SupportConfig, SupportTree};

fn bench_points(c: &mut Criterion) {
    let model = cube(20.0);
    let index = IndexedMesh::new(&model).unwrap();
    let heights = grid(0.05, 20.0, 0.05);
    let slices = slice_mesh(&model, &heights, 0.005).unwrap();
    let config = AutoSupportConfig::default();

    let mut group = c.benchmark_group("auto_supports");
    group.sample_size(10);
    group.bench_function("cube_20mm", |b| {
        b.iter(|| AutoSupports::new(&index, black_box(&slices), &heights, &config, &NoControl));
    });
    group.finish();
}

fn bench_tree(c: &mut Criterion) {
    let model = cube(20.0);
    let index = IndexedMesh::new(&model).unwrap();
    let heights = grid(0.05, 20.0, 0.05);
    let slices = slice_mesh(&model, &heights, 0.005).unwrap();
    let points = AutoSupports::new(
        &index,
        &slices,
        &heights,
        &AutoSupportConfig::default(),
        &NoControl,
    )
    .unwrap()
    .into_output();
    let config = SupportConfig::default();

    let mut group = c.benchmark_group("support_tree");
    group.sample_size(10);
    group.bench_function("cube_20mm", |b| {
        b.iter(|| SupportTree::new(black_box(&points), &index, &config));
    });
    group.bench_function("cube_20mm_merged", |b| {
        b.iter(|| {
            SupportTree::new(black_box(&points), &index, &config)
                .map(|tree| tree.merged_mesh().faces.len())
        });
    });
    group.finish();
}

criterion_group!(benches, bench_points, bench_tree);
criterion_main!(benches);
