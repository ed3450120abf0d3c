// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Type-only reinterpretation of a value.

use std::any::Any;
use tensor_core::ValueType;
use tensor_ir::{
    swap_child, Instruction, NodeId, Nodes, ParamStash, State, TensorFunction,
};

/// Passes the child through under another type without touching cells.
///
/// Only valid when both types share cell type, mapped dimension count and
/// dense cell order; see [`same_layout`].
#[derive(Debug)]
pub struct ReplaceType {
    result_type: ValueType,
    child: NodeId,
}

impl ReplaceType {
    pub fn new(result_type: ValueType, child: NodeId) -> Self {
        Self { result_type, child }
    }

    pub fn child(&self) -> NodeId {
        self.child
    }
}

/// True if cells and addresses of `from` can be read as `to` unchanged,
/// given that dimensions keep their relative order.
pub(crate) fn same_layout(from: &ValueType, to: &ValueType) -> bool {
    from.cell_type() == to.cell_type()
        && from.count_mapped_dimensions() == to.count_mapped_dimensions()
        && from.dense_subspace_size() == to.dense_subspace_size()
}

fn replace_type_op(state: &mut State<'_>, param: u64) {
    let result_type: &ValueType = state.param(param);
    let child = state.pop();
    state.push(child.retype(result_type));
}

impl TensorFunction for ReplaceType {
    fn name(&self) -> &'static str {
        "replace_type"
    }

    fn result_type(&self) -> &ValueType {
        &self.result_type
    }

    fn push_children(&self, children: &mut Vec<NodeId>) {
        children.push(self.child);
    }

    fn replace_child(&mut self, old: NodeId, new: NodeId) {
        swap_child(&mut self.child, old, new);
    }

    fn compile_self(&self, _nodes: &Nodes, stash: &mut ParamStash) -> Instruction {
        Instruction::new(replace_type_op, stash.create(self.result_type.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
