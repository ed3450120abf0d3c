// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Best match of a query against a set of candidate vectors.
//!
//! ```text
//! reduce(reduce(join(q[e], docs{d}[e], mul),     sum, e), max, d)
//! reduce(reduce(join(q[e], docs{d}[e], hamming), sum, e), min, d)
//! ```
//!
//! The fused kernel scores each candidate subspace and folds the score
//! straight into the outer aggregation, so the per-candidate scores are
//! never stored. Hamming distances require `int8` cells on both sides.

use super::{join_operands, only_dimension, reduces_exactly};
use crate::OptimizePass;
use std::any::Any;
use tensor_core::{
    dispatch_aggr, select_cell_fn, Aggr, Aggregator, BinaryOp, CellType, CellValue, Value,
    ValueType,
};
use tensor_ir::nodes::Reduce;
use tensor_ir::{
    swap_child, Building, Instruction, NodeId, Nodes, OpFunction, ParamStash, State,
    TensorFunction, Tree,
};

#[derive(Debug, Clone, Default)]
pub struct BestSimilarity;

impl OptimizePass for BestSimilarity {
    fn name(&self) -> &'static str {
        "best-similarity"
    }

    fn optimize(&self, node: NodeId, tree: &mut Tree<Building>) -> NodeId {
        match FusedBestSimilarity::find(tree.nodes(), node) {
            Some(replacement) => tree.add(replacement),
            None => node,
        }
    }
}

/// Max dot product or min hamming distance over candidate subspaces.
#[derive(Debug)]
pub struct FusedBestSimilarity {
    result_type: ValueType,
    query: NodeId,
    docs: NodeId,
    op: BinaryOp,
    aggr: Aggr,
    size: usize,
}

impl FusedBestSimilarity {
    fn find(nodes: &Nodes, node: NodeId) -> Option<Self> {
        let outer = nodes.downcast::<Reduce>(node)?;
        let op = match outer.aggr() {
            Aggr::Max => BinaryOp::Mul,
            Aggr::Min => BinaryOp::Hamming,
            _ => return None,
        };
        if !nodes.result_type(node).is_double() {
            return None;
        }
        let inner = nodes.downcast::<Reduce>(outer.child())?;
        if inner.aggr() != Aggr::Sum {
            return None;
        }
        let (lhs, rhs) = join_operands(nodes, inner.child(), op)?;
        let (query, docs) = if is_query(nodes.result_type(lhs)) {
            (lhs, rhs)
        } else {
            (rhs, lhs)
        };
        let query_type = nodes.result_type(query);
        let docs_type = nodes.result_type(docs);
        let e = only_dimension(query_type).filter(|_| is_query(query_type))?;
        let [d, docs_e] = docs_type.dimensions() else {
            return None;
        };
        if !d.is_mapped() || docs_e != e {
            return None;
        }
        if !reduces_exactly(inner, nodes.result_type(inner.child()), &[e.name.as_str()])
            || !reduces_exactly(outer, nodes.result_type(outer.child()), &[d.name.as_str()])
        {
            return None;
        }
        if op == BinaryOp::Hamming
            && (query_type.cell_type() != CellType::Int8 || docs_type.cell_type() != CellType::Int8)
        {
            return None;
        }
        Some(Self {
            result_type: ValueType::double(),
            query,
            docs,
            op,
            aggr: outer.aggr(),
            size: e.size()?,
        })
    }

    pub fn query(&self) -> NodeId {
        self.query
    }

    pub fn docs(&self) -> NodeId {
        self.docs
    }

    pub fn aggr(&self) -> Aggr {
        self.aggr
    }
}

fn is_query(ty: &ValueType) -> bool {
    ty.is_dense() && only_dimension(ty).is_some_and(|d| d.is_bound())
}

struct BestParam {
    function: fn(f64, f64) -> f64,
    size: usize,
}

fn best_op<Q: CellValue, D: CellValue, A: Aggregator>(state: &mut State<'_>, param: u64) {
    let p: &BestParam = state.param(param);
    let docs = state.pop();
    let query = state.pop();
    let q = query.view().typed_cells::<Q>();
    let cells = docs.view().typed_cells::<D>();

    let mut best = A::default();
    for candidate in cells.chunks_exact(p.size) {
        let score: f64 = q
            .iter()
            .zip(candidate)
            .map(|(&a, &b)| (p.function)(a.to_f64(), b.to_f64()))
            .sum();
        best.sample(score);
    }
    state.push_value(Value::double(best.result()));
}

impl TensorFunction for FusedBestSimilarity {
    fn name(&self) -> &'static str {
        "best_similarity"
    }

    fn result_type(&self) -> &ValueType {
        &self.result_type
    }

    fn push_children(&self, children: &mut Vec<NodeId>) {
        children.extend([self.query, self.docs]);
    }

    fn replace_child(&mut self, old: NodeId, new: NodeId) {
        swap_child(&mut self.query, old, new);
        swap_child(&mut self.docs, old, new);
    }

    fn compile_self(&self, nodes: &Nodes, stash: &mut ParamStash) -> Instruction {
        let query = nodes.result_type(self.query).cell_type();
        let docs = nodes.result_type(self.docs).cell_type();
        let function = dispatch_aggr!(
            self.aggr,
            A => select_cell_fn!(OpFunction; best_op; [query, docs]; [A])
        );
        let param = BestParam {
            function: self.op.function(),
            size: self.size,
        };
        Instruction::new(function, stash.create(param))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dump_details(&self) -> String {
        format!("({} of {})", self.aggr, self.op)
    }
}
