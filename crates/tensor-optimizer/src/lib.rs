// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-optimizer
//!
//! Rewrite passes over a [`tensor_ir::Tree`]. Each pass recognizes a
//! pattern of generic nodes and replaces it with one specialized node that
//! computes the same value with a cheaper kernel.
//!
//! # Contract
//!
//! - A pass sees a node whose children are already optimized.
//! - A replacement has the identical result type and reads the same inputs.
//! - A pass either applies completely or not at all; mismatches are not
//!   errors.
//!
//! # Trait-Based Extensibility
//!
//! All passes implement [`OptimizePass`], so the runtime can run custom
//! rewrites next to the built-in ones:
//!
//! ```ignore
//! struct MyPass;
//! impl OptimizePass for MyPass {
//!     fn name(&self) -> &'static str { "my-pass" }
//!     fn optimize(&self, node: NodeId, tree: &mut Tree<Building>) -> NodeId { node }
//! }
//! let optimizer = Optimizer::with_default_passes().with_pass(Box::new(MyPass));
//! ```
//!
//! # Example
//! ```
//! use tensor_core::{Aggr, BinaryOp, ValueType};
//! use tensor_ir::Tree;
//! use tensor_optimizer::Optimizer;
//!
//! let mut tree = Tree::new();
//! let v = tree.inject(ValueType::from_spec("tensor(x[3])"), 0);
//! let m = tree.inject(ValueType::from_spec("tensor(x[3],y[4])"), 1);
//! let product = tree.join(v, m, BinaryOp::Mul);
//! let root = tree.reduce(product, Aggr::Sum, &["x"]);
//!
//! let (root, report) = Optimizer::with_default_passes().optimize_with_report(&mut tree, root);
//! assert_eq!(report.count("vector-matrix-product"), 1);
//! assert_eq!(tree.get(root).name(), "vector_matrix");
//! ```

mod error;
mod optimizer;
mod pass;
pub mod passes;

pub use error::OptimizerError;
pub use optimizer::{OptimizeReport, Optimizer};
pub use pass::OptimizePass;
