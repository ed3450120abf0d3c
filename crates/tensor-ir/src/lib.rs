// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-ir
//!
//! Intermediate representation for tensor expressions.
//!
//! An expression is a tree of [`TensorFunction`] nodes owned by a
//! [`Tree`] arena. Every node knows its result type, its children, and how
//! to compile itself into a single [`Instruction`]:
//!
//! - [`Tree`]: the build-time arena, with a **type-state** transition
//!   `Building` → `Frozen` that rejects error-typed nodes.
//! - [`nodes`]: the generic node kinds (`Join`, `Reduce`, `Rename`,
//!   `Concat`, `Map`, `Merge`, `ConstValue`, `Inject`) and their kernels.
//! - [`Instruction`], [`ParamStash`], [`State`]: the compiled form and the
//!   operand-stack machine it runs on.
//! - [`plan`]: strided traversal and sparse matching plans shared with the
//!   specialized nodes of the optimizer.
//!
//! # Example
//! ```
//! use tensor_core::{Aggr, BinaryOp, ValueType};
//! use tensor_ir::Tree;
//!
//! let mut tree = Tree::new();
//! let v = tree.inject(ValueType::from_spec("tensor(x[3])"), 0);
//! let m = tree.inject(ValueType::from_spec("tensor(x[3],y[4])"), 1);
//! let product = tree.join(v, m, BinaryOp::Mul);
//! let root = tree.reduce(product, Aggr::Sum, &["x"]);
//! let frozen = tree.freeze(root).unwrap();
//! println!("{}", frozen.dump_root());
//! ```

mod error;
mod function;
mod instruction;
pub mod nodes;
pub mod plan;
pub mod tree;

pub use error::IrError;
pub use function::{swap_child, TensorFunction};
pub use instruction::{Instruction, OpFunction, Operand, ParamStash, State};
pub use tree::{Building, Frozen, NodeId, Nodes, Tree};

/// Compiles a frozen tree into its instruction sequence.
///
/// Instructions come out in post-order; parameters land in `stash`.
pub fn compile_tree(tree: &Tree<Frozen>, stash: &mut ParamStash) -> Vec<Instruction> {
    tree.post_order()
        .into_iter()
        .map(|id| tree.get(id).compile_self(tree.nodes(), stash))
        .collect()
}
