// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: build, optimize, compile and evaluate end to end.
//!
//! These tests exercise the full flow from tree construction through
//! optimization to concurrent evaluation, proving that the crates compose
//! and that a compiled function is safely shared between threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tensor_codec::{decode, encode};
use tensor_core::{Aggr, BinaryOp, Label, TensorSpec, UnaryOp, Value, ValueType};
use tensor_ir::{Building, NodeId, Tree};
use tensor_runtime::{prepare, EngineConfig, EvalContext, RuntimeError};

// ── Helpers ────────────────────────────────────────────────────

fn t(spec: &str) -> ValueType {
    ValueType::from_spec(spec)
}

fn unoptimized() -> EngineConfig {
    EngineConfig {
        optimize: false,
        ..Default::default()
    }
}

/// Best dot-product score of a query against a set of documents, with a
/// bias vector added to the query first.
fn scoring_tree() -> (Tree<Building>, NodeId) {
    let mut tree = Tree::new();
    let query = tree.inject(t("tensor<float>(e[8])"), 0);
    let bias = tree.inject(t("tensor<float>(e[8])"), 1);
    let docs = tree.inject(t("tensor<float>(d{},e[8])"), 2);
    let shifted = tree.join(query, bias, BinaryOp::Add);
    let scores = tree.join(shifted, docs, BinaryOp::Mul);
    let scores = tree.reduce(scores, Aggr::Sum, &["e"]);
    let root = tree.reduce(scores, Aggr::Max, &["d"]);
    (tree, root)
}

fn random_dense(spec: &str, rng: &mut StdRng) -> Value {
    let ty = t(spec);
    let cells: Vec<f32> = (0..ty.dense_subspace_size())
        .map(|_| rng.gen_range(-8..=8) as f32 / 4.0)
        .collect();
    Value::dense(ty, cells).unwrap()
}

fn random_docs(count: usize, rng: &mut StdRng) -> Value {
    let mut spec = TensorSpec::new("tensor<float>(d{},e[8])").unwrap();
    for d in 0..count {
        for e in 0..8usize {
            let cell = rng.gen_range(-8..=8) as f64 / 4.0;
            spec = spec.add(
                [("d", Label::from(format!("doc{d}"))), ("e", Label::from(e))],
                cell,
            );
        }
    }
    spec.to_value().unwrap()
}

// ── Pipeline ───────────────────────────────────────────────────

#[test]
fn optimized_and_plain_functions_agree() {
    let mut rng = StdRng::seed_from_u64(3);
    let query = random_dense("tensor<float>(e[8])", &mut rng);
    let bias = random_dense("tensor<float>(e[8])", &mut rng);
    let docs = random_docs(20, &mut rng);
    let inputs = [&query, &bias, &docs];

    let (tree, root) = scoring_tree();
    let optimized = prepare(tree, root, &EngineConfig::default()).unwrap();
    assert!(optimized.dump().starts_with("best_similarity"));

    let (tree, root) = scoring_tree();
    let plain = prepare(tree, root, &unoptimized()).unwrap();
    assert!(plain.dump().starts_with("reduce"));
    assert!(optimized.num_instructions() < plain.num_instructions());

    let config = EngineConfig::default();
    let a = EvalContext::new(&optimized, &config).unwrap().eval(&inputs).unwrap();
    let b = EvalContext::new(&plain, &config).unwrap().eval(&inputs).unwrap();
    assert_eq!(a.value_type(), &ValueType::double());
    assert!((a.as_double() - b.as_double()).abs() < 1e-9);
}

#[test]
fn small_arena_budget_does_not_change_results() {
    let build = || {
        let mut tree = Tree::new();
        let v = tree.inject(t("tensor<int8>(x[2])"), 0);
        let m = tree.inject(t("tensor<float>(x[2],y[256])"), 1);
        let product = tree.join(v, m, BinaryOp::Mul);
        let root = tree.reduce(product, Aggr::Sum, &["x"]);
        (tree, root)
    };
    let small = EngineConfig {
        arena_budget: "1K".into(),
        ..Default::default()
    };
    let (tree, root) = build();
    let optimized = prepare(tree, root, &small).unwrap();
    assert!(optimized.dump().starts_with("vector_matrix"));
    let (tree, root) = build();
    let plain_config = EngineConfig {
        optimize: false,
        ..small.clone()
    };
    let plain = prepare(tree, root, &plain_config).unwrap();

    let mut rng = StdRng::seed_from_u64(11);
    let v = Value::dense(t("tensor<int8>(x[2])"), vec![1i8, -2]).unwrap();
    let m = random_dense("tensor<float>(x[2],y[256])", &mut rng);
    let mut ctx = EvalContext::new(&optimized, &small).unwrap();
    let a = ctx.eval(&[&v, &m]).unwrap();
    let b = EvalContext::new(&plain, &small).unwrap().eval(&[&v, &m]).unwrap();
    assert!(TensorSpec::from_value(&a).approx_eq(&TensorSpec::from_value(&b), 1e-6));
    assert!(ctx.arena_stats().budget_failures > 0);
}

#[test]
fn pass_list_comes_from_config() {
    let config = EngineConfig::from_toml("passes = [\"generic-rename\"]\n").unwrap();
    let (tree, root) = scoring_tree();
    let function = prepare(tree, root, &config).unwrap();
    assert!(function.dump().starts_with("reduce"));

    let mut tree = Tree::new();
    let a = tree.inject(t("tensor(x[2],y[3])"), 0);
    let root = tree.rename(a, &["x", "y"], &["y", "x"]);
    let function = prepare(tree, root, &config).unwrap();
    assert!(function.dump().starts_with("planned_rename"));

    let m = Value::dense(t("tensor(x[2],y[3])"), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let mut ctx = EvalContext::new(&function, &config).unwrap();
    let result = ctx.eval(&[&m]).unwrap();
    assert_eq!(result.cells().to_f64_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
}

#[test]
fn unknown_pass_is_a_config_error() {
    let config = EngineConfig {
        passes: vec!["loop-fusion".into()],
        ..Default::default()
    };
    let (tree, root) = scoring_tree();
    let err = prepare(tree, root, &config).unwrap_err();
    assert!(matches!(err, RuntimeError::Optimizer(_)));
    assert!(err.to_string().contains("loop-fusion"));
}

#[test]
fn encoded_evaluation_round_trips() {
    let (tree, root) = {
        let mut tree = Tree::new();
        let a = tree.inject(t("tensor(k{},x[2])"), 0);
        let root = tree.map(a, UnaryOp::Square);
        (tree, root)
    };
    let config = EngineConfig::default();
    let function = prepare(tree, root, &config).unwrap();
    let input = TensorSpec::new("tensor(k{},x[2])")
        .unwrap()
        .add([("k", Label::from("a")), ("x", Label::from(0usize))], 3.0)
        .add([("k", Label::from("a")), ("x", Label::from(1usize))], -2.0)
        .to_value()
        .unwrap();

    let mut ctx = EvalContext::new(&function, &config).unwrap();
    let bytes = ctx.eval_encoded(&[&encode(&input).unwrap()]).unwrap();
    let result = decode(&bytes).unwrap();
    assert_eq!(result.cells().to_f64_vec(), vec![9.0, 4.0]);
    assert_eq!(encode(&result).unwrap(), bytes);
}

// ── Concurrency ────────────────────────────────────────────────

#[test]
fn shared_function_evaluates_on_many_threads() {
    let mut rng = StdRng::seed_from_u64(5);
    let bias = Arc::new(random_dense("tensor<float>(e[8])", &mut rng));
    let docs = Arc::new(random_docs(16, &mut rng));
    let queries: Vec<Value> = (0..8)
        .map(|_| random_dense("tensor<float>(e[8])", &mut rng))
        .collect();

    let config = EngineConfig {
        enable_profiling: true,
        ..Default::default()
    };
    let (tree, root) = scoring_tree();
    let function = Arc::new(prepare(tree, root, &config).unwrap());

    // Sequential answers first.
    let mut ctx = EvalContext::new(&function, &config).unwrap();
    let expected: Vec<f64> = queries
        .iter()
        .map(|q| ctx.eval(&[q, &*bias, &*docs]).unwrap().as_double())
        .collect();

    let handles: Vec<_> = queries
        .into_iter()
        .map(|query| {
            let function = Arc::clone(&function);
            let bias = Arc::clone(&bias);
            let docs = Arc::clone(&docs);
            let config = config.clone();
            std::thread::spawn(move || {
                let mut ctx = EvalContext::new(&function, &config).unwrap();
                let mut last = 0.0;
                for _ in 0..50 {
                    last = ctx.eval(&[&query, &*bias, &*docs]).unwrap().as_double();
                }
                assert_eq!(ctx.metrics().unwrap().evaluations, 50);
                last
            })
        })
        .collect();

    let results: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, expected);
}

#[test]
fn one_context_per_thread_with_scoped_threads() {
    let config = EngineConfig::default();
    let mut tree = Tree::new();
    let v = tree.inject(t("tensor(x[4])"), 0);
    let m = tree.inject(t("tensor(x[4],y[3])"), 1);
    let product = tree.join(v, m, BinaryOp::Mul);
    let root = tree.reduce(product, Aggr::Sum, &["x"]);
    let function = prepare(tree, root, &config).unwrap();
    let matrix = Value::dense(t("tensor(x[4],y[3])"), (1..=12).map(f64::from).collect::<Vec<_>>()).unwrap();

    std::thread::scope(|scope| {
        for i in 0..4 {
            let function = &function;
            let matrix = &matrix;
            let config = &config;
            scope.spawn(move || {
                let mut cells = vec![0.0; 4];
                cells[i] = 1.0;
                let vector = Value::dense(t("tensor(x[4])"), cells).unwrap();
                let mut ctx = EvalContext::new(function, config).unwrap();
                let row = ctx.eval(&[&vector, matrix]).unwrap();
                let start = (i * 3 + 1) as f64;
                assert_eq!(row.cells().to_f64_vec(), vec![start, start + 1.0, start + 2.0]);
            });
        }
    });
}
