// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Built-in passes and the specialized nodes they produce.
//!
//! | Pass | Matches | Produces |
//! |---|---|---|
//! | [`TrivialDimension`] | `join(x, unit, mul)`, `reduce(x, size-1 dims)` | [`ReplaceType`] |
//! | [`StableRename`] | order-preserving `rename` | [`ReplaceType`] |
//! | [`VectorMatrixProduct`] | `reduce(join(x[n], m[n,k], mul), sum, x)` | [`DenseVectorMatrix`] |
//! | [`DenseDotProduct`] | `reduce(join(x[n], x[n], mul), sum)` | [`DotProduct`] |
//! | [`BestSimilarity`] | max of dot products, min of hamming distances | [`FusedBestSimilarity`] |
//! | [`SparseDenseMixedProduct`] | `sum(s{x} * d[y] * m{x}[y])` | [`FusedTripleProduct`] |
//! | [`MixedWeightedSum`] | `reduce(join(w{d}, m{d}[..], mul), sum, d)` | [`WeightedSubspaceSum`] |
//! | [`GenericRename`] | any remaining `rename` | [`PlannedRename`] |

mod best_similarity;
mod dot_product;
mod generic_rename;
mod mixed_weighted_sum;
mod replace_type;
mod sparse_dense_mixed;
mod stable_rename;
mod trivial_dimension;
mod vector_matrix;

pub use best_similarity::{BestSimilarity, FusedBestSimilarity};
pub use dot_product::{DenseDotProduct, DotProduct};
pub use generic_rename::{GenericRename, PlannedRename, RenamePlan};
pub use mixed_weighted_sum::{MixedWeightedSum, WeightedSubspaceSum};
pub use replace_type::ReplaceType;
pub use sparse_dense_mixed::{FusedTripleProduct, SparseDenseMixedProduct};
pub use stable_rename::StableRename;
pub use trivial_dimension::TrivialDimension;
pub use vector_matrix::{DenseVectorMatrix, VectorMatrixProduct};

use crate::OptimizePass;
use tensor_core::{BinaryOp, Dimension, ValueType};
use tensor_ir::nodes::{Join, Reduce};
use tensor_ir::{NodeId, Nodes};

/// Built-in pass names in the default order.
pub const NAMES: [&str; 8] = [
    "trivial-dimension",
    "stable-rename",
    "vector-matrix-product",
    "dense-dot-product",
    "best-similarity",
    "sparse-dense-mixed-product",
    "mixed-weighted-sum",
    "generic-rename",
];

/// Every built-in pass, in the default order.
pub fn default_passes() -> Vec<Box<dyn OptimizePass>> {
    NAMES.iter().filter_map(|name| by_name(name)).collect()
}

/// The built-in pass called `name`.
pub fn by_name(name: &str) -> Option<Box<dyn OptimizePass>> {
    let pass: Box<dyn OptimizePass> = match name {
        "trivial-dimension" => Box::new(TrivialDimension),
        "stable-rename" => Box::new(StableRename),
        "vector-matrix-product" => Box::new(VectorMatrixProduct),
        "dense-dot-product" => Box::new(DenseDotProduct),
        "best-similarity" => Box::new(BestSimilarity),
        "sparse-dense-mixed-product" => Box::new(SparseDenseMixedProduct),
        "mixed-weighted-sum" => Box::new(MixedWeightedSum),
        "generic-rename" => Box::new(GenericRename),
        _ => return None,
    };
    Some(pass)
}

// ── Pattern helpers ────────────────────────────────────────────────

/// The only dimension of a one-dimensional type.
fn only_dimension(ty: &ValueType) -> Option<&Dimension> {
    match ty.dimensions() {
        [dim] => Some(dim),
        _ => None,
    }
}

/// `(lhs, rhs)` if `id` is a join with operator `op`.
fn join_operands(nodes: &Nodes, id: NodeId, op: BinaryOp) -> Option<(NodeId, NodeId)> {
    let join = nodes.downcast::<Join>(id)?;
    (join.op() == op).then(|| (join.lhs(), join.rhs()))
}

/// True if `reduce` removes exactly the dimensions in `names` from
/// `child`, in any order.
fn reduces_exactly(reduce: &Reduce, child: &ValueType, names: &[&str]) -> bool {
    let mut reduced = reduce.reduced_dimensions(child);
    let mut expected = names.to_vec();
    reduced.sort_unstable();
    expected.sort_unstable();
    reduced == expected
}
