// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Weighted sum of the subspaces of a mixed tensor.
//!
//! Matches `reduce(join(w{d}, m{d}[..], mul), sum, d)` where the selector
//! `w` is sparse over `d` alone and `m` has `d` as its only mapped
//! dimension. The result is the dense block `Σ_d w[d] · m[d]`.
//!
//! A selector with a single nonzero weight of exactly `1.0` picks one
//! subspace; the kernel detects that at run time and copies the block
//! instead of accumulating.

use super::{join_operands, only_dimension};
use crate::OptimizePass;
use std::any::Any;
use tensor_core::{select_cell_fn, AddressMap, Aggr, BinaryOp, CellValue, ValueType};
use tensor_ir::nodes::Reduce;
use tensor_ir::plan::{convert_into, finish_value};
use tensor_ir::{
    swap_child, Building, Instruction, NodeId, Nodes, OpFunction, ParamStash, State,
    TensorFunction, Tree,
};

#[derive(Debug, Clone, Default)]
pub struct MixedWeightedSum;

impl OptimizePass for MixedWeightedSum {
    fn name(&self) -> &'static str {
        "mixed-weighted-sum"
    }

    fn optimize(&self, node: NodeId, tree: &mut Tree<Building>) -> NodeId {
        match WeightedSubspaceSum::find(tree.nodes(), node) {
            Some(replacement) => tree.add(replacement),
            None => node,
        }
    }
}

#[derive(Debug)]
pub struct WeightedSubspaceSum {
    result_type: ValueType,
    selector: NodeId,
    mixed: NodeId,
}

impl WeightedSubspaceSum {
    fn find(nodes: &Nodes, node: NodeId) -> Option<Self> {
        let reduce = nodes.downcast::<Reduce>(node)?;
        let [dim] = reduce.dimensions() else {
            return None;
        };
        if reduce.aggr() != Aggr::Sum {
            return None;
        }
        let (lhs, rhs) = join_operands(nodes, reduce.child(), BinaryOp::Mul)?;
        let (selector, mixed) = if is_selector(nodes.result_type(lhs), dim) {
            (lhs, rhs)
        } else {
            (rhs, lhs)
        };
        let mixed_type = nodes.result_type(mixed);
        if !is_selector(nodes.result_type(selector), dim)
            || !mixed_type.is_mixed()
            || mixed_type.mapped_dimension_names() != [dim.as_str()]
        {
            return None;
        }
        Some(Self {
            result_type: nodes.result_type(node).clone(),
            selector,
            mixed,
        })
    }

    pub fn selector(&self) -> NodeId {
        self.selector
    }

    pub fn mixed(&self) -> NodeId {
        self.mixed
    }
}

fn is_selector(ty: &ValueType, dim: &str) -> bool {
    ty.is_sparse() && only_dimension(ty).is_some_and(|d| d.name == dim)
}

struct WeightedSumParam {
    result_type: ValueType,
    size: usize,
}

/// The subspace picked by a selector with one nonzero weight equal to 1.
fn selected<S: CellValue>(weights: &[S]) -> Option<usize> {
    let mut nonzero = weights
        .iter()
        .enumerate()
        .filter(|(_, w)| w.to_f64() != 0.0);
    match (nonzero.next(), nonzero.next()) {
        (Some((i, w)), None) if w.to_f64() == 1.0 => Some(i),
        _ => None,
    }
}

fn weighted_sum_op<S: CellValue, M: CellValue, O: CellValue>(state: &mut State<'_>, param: u64) {
    let p: &WeightedSumParam = state.param(param);
    let mixed = state.pop();
    let selector = state.pop();
    let (selector, mixed) = (selector.view(), mixed.view());
    let weights = selector.typed_cells::<S>();
    let blocks = mixed.typed_cells::<M>();
    let size = p.size;

    let picked = selected(weights)
        .and_then(|i| mixed.index().lookup(selector.index().address(i)));
    if let Some(subspace) = picked {
        let mut out = vec![O::default(); size];
        convert_into(&blocks[subspace * size..][..size], &mut out);
        state.push_value(finish_value(&p.result_type, out, AddressMap::dense()));
        return;
    }

    let mut acc = state.scratch(size);
    for (i, address) in selector.index().iter() {
        if let Some(subspace) = mixed.index().lookup(address) {
            let weight = weights[i].to_f64();
            let block = &blocks[subspace * size..][..size];
            for (sum, &cell) in acc.iter_mut().zip(block) {
                *sum += weight * cell.to_f64();
            }
        }
    }
    let out: Vec<O> = acc.iter().map(|&x| O::from_f64(x)).collect();
    drop(acc);
    state.push_value(finish_value(&p.result_type, out, AddressMap::dense()));
}

impl TensorFunction for WeightedSubspaceSum {
    fn name(&self) -> &'static str {
        "weighted_sum"
    }

    fn result_type(&self) -> &ValueType {
        &self.result_type
    }

    fn push_children(&self, children: &mut Vec<NodeId>) {
        children.extend([self.selector, self.mixed]);
    }

    fn replace_child(&mut self, old: NodeId, new: NodeId) {
        swap_child(&mut self.selector, old, new);
        swap_child(&mut self.mixed, old, new);
    }

    fn compile_self(&self, nodes: &Nodes, stash: &mut ParamStash) -> Instruction {
        let function = select_cell_fn!(
            OpFunction;
            weighted_sum_op;
            [
                nodes.result_type(self.selector).cell_type(),
                nodes.result_type(self.mixed).cell_type(),
                self.result_type.cell_type(),
            ]
        );
        let param = WeightedSumParam {
            result_type: self.result_type.clone(),
            size: self.result_type.dense_subspace_size(),
        };
        Instruction::new(function, stash.create(param))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
