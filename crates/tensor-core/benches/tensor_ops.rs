// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for core kernels and value construction.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tensor_core::ops::linalg;
use tensor_core::{LabelHandle, ValueBuilder, ValueType};

fn bench_vector_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector_matrix");
    for &n in &[64usize, 256, 1024] {
        let vector: Vec<f32> = (0..n).map(|i| i as f32 * 0.01).collect();
        let matrix: Vec<f32> = (0..n * 64).map(|i| (i % 17) as f32).collect();
        let mut out = vec![0.0f32; 64];
        for inner in [true, false] {
            let id = BenchmarkId::new(if inner { "inner" } else { "outer" }, n);
            group.bench_with_input(id, &n, |b, _| {
                b.iter(|| linalg::vector_matrix(black_box(&vector), &matrix, &mut out, inner))
            });
        }
    }
    group.finish();
}

fn bench_sparse_build(c: &mut Criterion) {
    let labels: Vec<LabelHandle> = (0..1000).map(|i| LabelHandle::new(&format!("doc{i}"))).collect();
    let value_type = ValueType::from_spec("tensor<float>(d{},x[8])");
    c.bench_function("build_mixed_1000", |b| {
        b.iter(|| {
            let mut builder = ValueBuilder::<f32>::new(value_type.clone(), labels.len())
                .expect("bench type is valid");
            for (i, label) in labels.iter().enumerate() {
                builder.add_subspace(&[label.id()])[0] = i as f32;
            }
            black_box(builder.build())
        })
    });
}

criterion_group!(benches, bench_vector_matrix, bench_sparse_build);
criterion_main!(benches);
