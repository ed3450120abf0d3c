// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Compare generic and optimized evaluation of a similarity search.
//!
//! Builds "best dot-product score of a query against a document set",
//! prepares it with and without the optimizer, and evaluates both on the
//! same inputs, printing the compiled trees and profiling metrics.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p tensor-runtime --example similarity_search
//! ```

use tensor_core::{Aggr, BinaryOp, Label, TensorSpec, Value, ValueType};
use tensor_ir::{Building, NodeId, Tree};
use tensor_runtime::{prepare, EngineConfig, EvalContext};
use tracing_subscriber::EnvFilter;

const DOCS: usize = 2_000;
const DIMS: usize = 32;
const ROUNDS: usize = 200;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let query_type = ValueType::from_spec(&format!("tensor<float>(e[{DIMS}])"));
    let docs_type = ValueType::from_spec(&format!("tensor<float>(d{{}},e[{DIMS}])"));

    let query_cells: Vec<f32> = (0..DIMS).map(|e| ((e * 5) % 11) as f32 / 5.0 - 1.0).collect();
    let query = Value::dense(query_type.clone(), query_cells)?;
    let mut spec = TensorSpec::from_type(docs_type.clone());
    for d in 0..DOCS {
        for e in 0..DIMS {
            let cell = ((d * 13 + e * 3) % 17) as f64 / 8.0 - 1.0;
            spec = spec.add([("d", Label::from(format!("doc-{d}"))), ("e", Label::from(e))], cell);
        }
    }
    let docs = spec.to_value()?;
    println!("Query: {query_type}, documents: {DOCS} x {DIMS}\n");

    let build = |tree: &mut Tree<Building>| -> NodeId {
        let q = tree.inject(query_type.clone(), 0);
        let d = tree.inject(docs_type.clone(), 1);
        let product = tree.join(q, d, BinaryOp::Mul);
        let scores = tree.reduce(product, Aggr::Sum, &["e"]);
        tree.reduce(scores, Aggr::Max, &["d"])
    };

    println!("{:<12} {:>14} {:>14} {:>12}", "Mode", "Instructions", "Best score", "Mean ms");
    println!("{}", "-".repeat(56));

    for (mode, optimize) in [("generic", false), ("optimized", true)] {
        let config = EngineConfig {
            optimize,
            enable_profiling: true,
            ..Default::default()
        };
        let mut tree = Tree::new();
        let root = build(&mut tree);
        let function = prepare(tree, root, &config)?;

        let mut ctx = EvalContext::new(&function, &config)?;
        let mut best = 0.0;
        for _ in 0..ROUNDS {
            best = ctx.eval(&[&query, &docs])?.as_double();
        }
        let metrics = ctx.metrics().ok_or("profiling is enabled")?;
        println!(
            "{:<12} {:>14} {:>14.4} {:>12.3}",
            mode,
            function.num_instructions(),
            best,
            metrics.mean_duration().as_secs_f64() * 1000.0,
        );
        println!("\n{}", function.dump());
        println!("Metrics: {}", metrics.summary());
        println!("Arena: {}\n", ctx.arena_stats().summary());
    }

    Ok(())
}
