// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::plan::{convert_into, finish_value};
use crate::{
    swap_child, Instruction, NodeId, Nodes, OpFunction, ParamStash, State, TensorFunction,
};
use std::any::Any;
use tensor_core::{select_cell_fn, BinaryOp, CellValue, ValueType};

/// Union of two values with identical dimensions.
///
/// Subspaces present on one side are copied; where both sides have an
/// address the cells are combined with `op(lhs, rhs)`.
#[derive(Debug)]
pub struct Merge {
    result_type: ValueType,
    lhs: NodeId,
    rhs: NodeId,
    op: BinaryOp,
}

impl Merge {
    pub fn new(result_type: ValueType, lhs: NodeId, rhs: NodeId, op: BinaryOp) -> Self {
        Self {
            result_type,
            lhs,
            rhs,
            op,
        }
    }

    pub fn lhs(&self) -> NodeId {
        self.lhs
    }

    pub fn rhs(&self) -> NodeId {
        self.rhs
    }

    pub fn op(&self) -> BinaryOp {
        self.op
    }
}

struct MergeParam {
    result_type: ValueType,
    function: fn(f64, f64) -> f64,
    size: usize,
}

fn merge_op<L: CellValue, R: CellValue, O: CellValue>(state: &mut State<'_>, param: u64) {
    let p: &MergeParam = state.param(param);
    let rhs = state.pop();
    let lhs = state.pop();
    let (lhs, rhs) = (lhs.view(), rhs.view());
    let lhs_cells = lhs.typed_cells::<L>();
    let rhs_cells = rhs.typed_cells::<R>();
    let size = p.size;

    let mut index = lhs.index().clone();
    let mut cells = vec![O::default(); lhs_cells.len()];
    convert_into(lhs_cells, &mut cells);
    for (r, address) in rhs.index().iter() {
        let b = &rhs_cells[r * size..][..size];
        match lhs.index().lookup(address) {
            Some(l) => {
                let a = &lhs_cells[l * size..][..size];
                let out = &mut cells[l * size..][..size];
                for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
                    *o = O::from_f64((p.function)(x.to_f64(), y.to_f64()));
                }
            }
            None => {
                index.add(address);
                let base = cells.len();
                cells.resize(base + size, O::default());
                convert_into(b, &mut cells[base..]);
            }
        }
    }
    state.push_value(finish_value(&p.result_type, cells, index));
}

impl TensorFunction for Merge {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn result_type(&self) -> &ValueType {
        &self.result_type
    }

    fn push_children(&self, children: &mut Vec<NodeId>) {
        children.extend([self.lhs, self.rhs]);
    }

    fn replace_child(&mut self, old: NodeId, new: NodeId) {
        swap_child(&mut self.lhs, old, new);
        swap_child(&mut self.rhs, old, new);
    }

    fn compile_self(&self, nodes: &Nodes, stash: &mut ParamStash) -> Instruction {
        let lhs = nodes.result_type(self.lhs);
        let rhs = nodes.result_type(self.rhs);
        let function = select_cell_fn!(
            OpFunction;
            merge_op;
            [lhs.cell_type(), rhs.cell_type(), self.result_type.cell_type()]
        );
        let param = MergeParam {
            result_type: self.result_type.clone(),
            function: self.op.function(),
            size: self.result_type.dense_subspace_size(),
        };
        Instruction::new(function, stash.create(param))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dump_details(&self) -> String {
        format!("({})", self.op)
    }
}
