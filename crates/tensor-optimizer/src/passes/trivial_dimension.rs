// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Adding or removing size-1 indexed dimensions.
//!
//! Multiplying by a constant `1.0` whose dimensions all have size 1 only
//! adds dimensions to the type; reducing size-1 dimensions with an
//! aggregator that returns a single sample unchanged only removes them.
//! Neither moves a cell, so both become a [`ReplaceType`].

use super::replace_type::{same_layout, ReplaceType};
use crate::OptimizePass;
use tensor_core::{BinaryOp, ValueType};
use tensor_ir::nodes::{ConstValue, Join, Reduce};
use tensor_ir::{Building, NodeId, Nodes, Tree};

#[derive(Debug, Clone, Default)]
pub struct TrivialDimension;

impl OptimizePass for TrivialDimension {
    fn name(&self) -> &'static str {
        "trivial-dimension"
    }

    fn optimize(&self, node: NodeId, tree: &mut Tree<Building>) -> NodeId {
        let nodes = tree.nodes();
        let target = unit_join_operand(nodes, node).or_else(|| trivial_reduce_child(nodes, node));
        match target {
            Some(child) if same_layout(nodes.result_type(child), nodes.result_type(node)) => {
                let result_type = nodes.result_type(node).clone();
                tree.add(ReplaceType::new(result_type, child))
            }
            _ => node,
        }
    }
}

/// A constant holding a single `1.0` with only size-1 dimensions.
fn is_unit_constant(nodes: &Nodes, id: NodeId) -> bool {
    nodes.downcast::<ConstValue>(id).is_some_and(|c| {
        let value = c.value();
        value.value_type().dimensions().iter().all(|d| d.is_trivial())
            && value.cells().len() == 1
            && value.cells().get_f64(0) == 1.0
    })
}

fn unit_join_operand(nodes: &Nodes, node: NodeId) -> Option<NodeId> {
    let join = nodes.downcast::<Join>(node)?;
    if join.op() != BinaryOp::Mul {
        return None;
    }
    if is_unit_constant(nodes, join.rhs()) {
        Some(join.lhs())
    } else if is_unit_constant(nodes, join.lhs()) {
        Some(join.rhs())
    } else {
        None
    }
}

fn trivial_reduce_child(nodes: &Nodes, node: NodeId) -> Option<NodeId> {
    let reduce = nodes.downcast::<Reduce>(node)?;
    if !reduce.aggr().is_ident() {
        return None;
    }
    let child: &ValueType = nodes.result_type(reduce.child());
    let all_trivial = reduce
        .reduced_dimensions(child)
        .iter()
        .all(|name| child.dimension(name).is_some_and(|d| d.is_trivial()));
    all_trivial.then(|| reduce.child())
}
