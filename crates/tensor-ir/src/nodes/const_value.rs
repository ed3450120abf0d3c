// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::{Instruction, NodeId, Nodes, Operand, ParamStash, State, TensorFunction};
use std::any::Any;
use tensor_core::{Value, ValueType};

/// A constant value baked into the expression.
#[derive(Debug)]
pub struct ConstValue {
    value: Value,
}

impl ConstValue {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

fn const_op(state: &mut State<'_>, param: u64) {
    let value: &Value = state.param(param);
    state.push(Operand::Borrowed(value.view()));
}

impl TensorFunction for ConstValue {
    fn name(&self) -> &'static str {
        "const"
    }

    fn result_type(&self) -> &ValueType {
        self.value.value_type()
    }

    fn push_children(&self, _children: &mut Vec<NodeId>) {}

    fn replace_child(&mut self, _old: NodeId, _new: NodeId) {}

    fn compile_self(&self, _nodes: &Nodes, stash: &mut ParamStash) -> Instruction {
        Instruction::new(const_op, stash.create(self.value.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dump_details(&self) -> String {
        format!("({} cells)", self.value.cells().len())
    }
}
