// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::plan::finish_value;
use crate::{
    swap_child, Instruction, NodeId, Nodes, OpFunction, ParamStash, State, TensorFunction,
};
use std::any::Any;
use tensor_core::{select_cell_fn, CellValue, UnaryOp, ValueType};

/// Elementwise unary operation.
#[derive(Debug)]
pub struct Map {
    result_type: ValueType,
    child: NodeId,
    op: UnaryOp,
}

impl Map {
    pub fn new(result_type: ValueType, child: NodeId, op: UnaryOp) -> Self {
        Self {
            result_type,
            child,
            op,
        }
    }

    pub fn child(&self) -> NodeId {
        self.child
    }

    pub fn op(&self) -> UnaryOp {
        self.op
    }
}

struct MapParam {
    result_type: ValueType,
    function: fn(f64) -> f64,
}

fn map_op<I: CellValue, O: CellValue>(state: &mut State<'_>, param: u64) {
    let p: &MapParam = state.param(param);
    let child = state.pop();
    let view = child.view();
    let function = p.function;
    let cells: Vec<O> = view
        .typed_cells::<I>()
        .iter()
        .map(|&c| O::from_f64(function(c.to_f64())))
        .collect();
    state.push_value(finish_value(&p.result_type, cells, view.index().clone()));
}

impl TensorFunction for Map {
    fn name(&self) -> &'static str {
        "map"
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

    fn compile_self(&self, nodes: &Nodes, stash: &mut ParamStash) -> Instruction {
        let child = nodes.result_type(self.child);
        let function = select_cell_fn!(
            OpFunction;
            map_op;
            [child.cell_type(), self.result_type.cell_type()]
        );
        let param = MapParam {
            result_type: self.result_type.clone(),
            function: self.op.function(),
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

#[cfg(test)]
mod tests {
    use crate::testing::eval;
    use crate::Tree;
    use tensor_core::{TensorSpec, UnaryOp, Value, ValueType};

    #[test]
    fn test_map_sparse_keeps_addresses() {
        let input = TensorSpec::new("tensor(k{})")
            .unwrap()
            .add([("k", "a")], -2.0)
            .add([("k", "b")], 3.0)
            .to_value()
            .unwrap();
        let mut tree = Tree::new();
        let child = tree.inject(input.value_type().clone(), 0);
        let root = tree.map(child, UnaryOp::Relu);
        let result = eval(tree, root, &[&input]);
        assert_eq!(result.index(), input.index());
        assert_eq!(result.cells().to_f64_vec(), vec![0.0, 3.0]);
    }

    #[test]
    fn test_map_int8_produces_float() {
        let input = Value::dense(ValueType::from_spec("tensor<int8>(x[2])"), vec![3i8, -4]).unwrap();
        let mut tree = Tree::new();
        let child = tree.inject(input.value_type().clone(), 0);
        let root = tree.map(child, UnaryOp::Square);
        let result = eval(tree, root, &[&input]);
        assert_eq!(result.cells().typed::<f32>(), Some(&[9.0f32, 16.0][..]));
    }
}
