// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dense dot product: `reduce(join(a, b, mul), sum)` over two vectors of
//! the same dimension, producing a scalar.

use super::{join_operands, only_dimension};
use crate::OptimizePass;
use num_traits::Float;
use std::any::Any;
use tensor_core::ops::linalg;
use tensor_core::{select_cell_fn, Aggr, BinaryOp, CellType, CellValue, Value, ValueType};
use tensor_ir::nodes::Reduce;
use tensor_ir::{
    swap_child, Building, Instruction, NodeId, Nodes, OpFunction, ParamStash, State,
    TensorFunction, Tree,
};

#[derive(Debug, Clone, Default)]
pub struct DenseDotProduct;

impl OptimizePass for DenseDotProduct {
    fn name(&self) -> &'static str {
        "dense-dot-product"
    }

    fn optimize(&self, node: NodeId, tree: &mut Tree<Building>) -> NodeId {
        let nodes = tree.nodes();
        let Some(reduce) = nodes.downcast::<Reduce>(node) else {
            return node;
        };
        if reduce.aggr() != Aggr::Sum || !nodes.result_type(node).is_double() {
            return node;
        }
        let Some((lhs, rhs)) = join_operands(nodes, reduce.child(), BinaryOp::Mul) else {
            return node;
        };
        let (a, b) = (nodes.result_type(lhs), nodes.result_type(rhs));
        let same_vector = match (only_dimension(a), only_dimension(b)) {
            (Some(x), Some(y)) => x.is_bound() && x == y,
            _ => false,
        };
        if !same_vector {
            return node;
        }
        let size = a.dense_subspace_size();
        tree.add(DotProduct {
            result_type: ValueType::double(),
            lhs,
            rhs,
            size,
        })
    }
}

/// Scalar product of two equally shaped dense vectors.
#[derive(Debug)]
pub struct DotProduct {
    result_type: ValueType,
    lhs: NodeId,
    rhs: NodeId,
    size: usize,
}

impl DotProduct {
    pub fn size(&self) -> usize {
        self.size
    }
}

fn native_op<T: CellValue + Float>(state: &mut State<'_>, _param: u64) {
    let rhs = state.pop();
    let lhs = state.pop();
    let dot = linalg::dot(lhs.view().typed_cells::<T>(), rhs.view().typed_cells::<T>());
    state.push_value(Value::double(CellValue::to_f64(dot)));
}

fn generic_op<L: CellValue, R: CellValue>(state: &mut State<'_>, _param: u64) {
    let rhs = state.pop();
    let lhs = state.pop();
    let a = lhs.view().typed_cells::<L>();
    let b = rhs.view().typed_cells::<R>();
    let dot: f64 = a.iter().zip(b).map(|(&x, &y)| x.to_f64() * y.to_f64()).sum();
    state.push_value(Value::double(dot));
}

impl TensorFunction for DotProduct {
    fn name(&self) -> &'static str {
        "dot_product"
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

    fn compile_self(&self, nodes: &Nodes, _stash: &mut ParamStash) -> Instruction {
        let lhs = nodes.result_type(self.lhs).cell_type();
        let rhs = nodes.result_type(self.rhs).cell_type();
        let function = match (lhs, rhs) {
            (CellType::Double, CellType::Double) => native_op::<f64> as OpFunction,
            (CellType::Float, CellType::Float) => native_op::<f32> as OpFunction,
            _ => select_cell_fn!(OpFunction; generic_op; [lhs, rhs]),
        };
        Instruction::new(function, self.size as u64)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dump_details(&self) -> String {
        format!("({})", self.size)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::compare;
    use tensor_core::{Aggr, BinaryOp, Value, ValueType};

    fn t(spec: &str) -> ValueType {
        ValueType::from_spec(spec)
    }

    #[test]
    fn test_double_vectors() {
        let a = Value::dense(t("tensor(x[4])"), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Value::dense(t("tensor(x[4])"), vec![0.5, 0.25, -1.0, 2.0]).unwrap();
        let result = compare(
            "dense-dot-product",
            |tree| {
                let l = tree.inject(t("tensor(x[4])"), 0);
                let r = tree.inject(t("tensor(x[4])"), 1);
                let joined = tree.join(l, r, BinaryOp::Mul);
                tree.reduce(joined, Aggr::Sum, &[])
            },
            &[&a, &b],
        );
        assert_eq!(result.rewrites, 1);
        assert_eq!(result.root_name, "dot_product");
        assert_eq!(result.optimized.as_double(), 6.0);
        assert_eq!(result.optimized, result.reference);
    }

    #[test]
    fn test_mixed_cell_types() {
        let a = Value::dense(t("tensor<int8>(x[3])"), vec![1i8, -2, 3]).unwrap();
        let b = Value::dense(t("tensor<float>(x[3])"), vec![0.5f32, 0.5, 0.5]).unwrap();
        let result = compare(
            "dense-dot-product",
            |tree| {
                let l = tree.inject(t("tensor<int8>(x[3])"), 0);
                let r = tree.inject(t("tensor<float>(x[3])"), 1);
                let joined = tree.join(l, r, BinaryOp::Mul);
                tree.reduce(joined, Aggr::Sum, &["x"])
            },
            &[&a, &b],
        );
        assert_eq!(result.rewrites, 1);
        assert_eq!(result.optimized.as_double(), 1.0);
        result.assert_close(1e-9);
    }

    #[test]
    fn test_different_dimensions_are_an_outer_product() {
        let a = Value::dense(t("tensor(x[2])"), vec![1.0, 2.0]).unwrap();
        let b = Value::dense(t("tensor(y[2])"), vec![3.0, 4.0]).unwrap();
        let result = compare(
            "dense-dot-product",
            |tree| {
                let l = tree.inject(t("tensor(x[2])"), 0);
                let r = tree.inject(t("tensor(y[2])"), 1);
                let joined = tree.join(l, r, BinaryOp::Mul);
                tree.reduce(joined, Aggr::Sum, &[])
            },
            &[&a, &b],
        );
        assert_eq!(result.rewrites, 0);
        assert_eq!(result.optimized.as_double(), 21.0);
    }
}
