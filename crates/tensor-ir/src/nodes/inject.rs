// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::{Instruction, NodeId, Nodes, Operand, ParamStash, State, TensorFunction};
use std::any::Any;
use tensor_core::ValueType;

/// Placeholder for an evaluation input.
///
/// The instruction parameter is the input slot itself.
#[derive(Debug)]
pub struct Inject {
    result_type: ValueType,
    slot: usize,
}

impl Inject {
    pub fn new(result_type: ValueType, slot: usize) -> Self {
        Self { result_type, slot }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

fn inject_op(state: &mut State<'_>, param: u64) {
    let value = state.input(param as usize);
    state.push(Operand::Borrowed(value.view()));
}

impl TensorFunction for Inject {
    fn name(&self) -> &'static str {
        "inject"
    }

    fn result_type(&self) -> &ValueType {
        &self.result_type
    }

    fn push_children(&self, _children: &mut Vec<NodeId>) {}

    fn replace_child(&mut self, _old: NodeId, _new: NodeId) {}

    fn compile_self(&self, _nodes: &Nodes, _stash: &mut ParamStash) -> Instruction {
        Instruction::new(inject_op, self.slot as u64)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dump_details(&self) -> String {
        format!("({})", self.slot)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::eval;
    use crate::Tree;
    use tensor_core::{Value, ValueType};

    #[test]
    fn test_inject_reads_its_slot() {
        let ty = ValueType::from_spec("tensor(x[2])");
        let first = Value::dense(ty.clone(), vec![1.0, 2.0]).unwrap();
        let second = Value::dense(ty.clone(), vec![3.0, 4.0]).unwrap();
        let mut tree = Tree::new();
        let root = tree.inject(ty, 1);
        assert_eq!(eval(tree, root, &[&first, &second]), second);
    }
}
