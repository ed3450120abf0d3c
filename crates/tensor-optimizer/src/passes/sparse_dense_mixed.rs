// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sum of a sparse-dense-mixed triple product.
//!
//! Matches `reduce(s{x} * v[y] * m{x}[y], sum)` in either association of
//! the two joins and any operand order. The fused kernel walks the sparse
//! labels, looks up the matching mixed subspace and adds the weighted dot
//! product with the dense vector. Labels with weight zero are skipped.

use super::{join_operands, only_dimension, reduces_exactly};
use crate::OptimizePass;
use std::any::Any;
use tensor_core::{select_cell_fn, Aggr, BinaryOp, CellValue, Value, ValueType};
use tensor_ir::nodes::Reduce;
use tensor_ir::{
    swap_child, Building, Instruction, NodeId, Nodes, OpFunction, ParamStash, State,
    TensorFunction, Tree,
};

#[derive(Debug, Clone, Default)]
pub struct SparseDenseMixedProduct;

impl OptimizePass for SparseDenseMixedProduct {
    fn name(&self) -> &'static str {
        "sparse-dense-mixed-product"
    }

    fn optimize(&self, node: NodeId, tree: &mut Tree<Building>) -> NodeId {
        match FusedTripleProduct::find(tree.nodes(), node) {
            Some(replacement) => tree.add(replacement),
            None => node,
        }
    }
}

/// `Σ_x s[x] · Σ_y v[y] · m[x, y]`.
#[derive(Debug)]
pub struct FusedTripleProduct {
    result_type: ValueType,
    sparse: NodeId,
    dense: NodeId,
    mixed: NodeId,
    size: usize,
}

impl FusedTripleProduct {
    fn find(nodes: &Nodes, node: NodeId) -> Option<Self> {
        let reduce = nodes.downcast::<Reduce>(node)?;
        if reduce.aggr() != Aggr::Sum || !nodes.result_type(node).is_double() {
            return None;
        }
        let (p, q) = join_operands(nodes, reduce.child(), BinaryOp::Mul)?;
        let leaves = if let Some((a, b)) = join_operands(nodes, p, BinaryOp::Mul) {
            [a, b, q]
        } else {
            let (a, b) = join_operands(nodes, q, BinaryOp::Mul)?;
            [p, a, b]
        };

        let (mut sparse, mut dense, mut mixed) = (None, None, None);
        for leaf in leaves {
            let ty = nodes.result_type(leaf);
            let slot = match ty.dimensions().len() {
                1 if ty.is_sparse() => &mut sparse,
                1 if ty.is_dense() => &mut dense,
                2 if ty.is_mixed() => &mut mixed,
                _ => return None,
            };
            if slot.replace(leaf).is_some() {
                return None;
            }
        }
        let (sparse, dense, mixed) = (sparse?, dense?, mixed?);

        let x = only_dimension(nodes.result_type(sparse))?;
        let y = only_dimension(nodes.result_type(dense))?;
        let [mixed_x, mixed_y] = nodes.result_type(mixed).dimensions() else {
            return None;
        };
        if mixed_x.name != x.name || mixed_y != y {
            return None;
        }
        let product = nodes.result_type(reduce.child());
        if !reduces_exactly(reduce, product, &[x.name.as_str(), y.name.as_str()]) {
            return None;
        }
        Some(Self {
            result_type: ValueType::double(),
            sparse,
            dense,
            mixed,
            size: y.size()?,
        })
    }
}

fn triple_op<S: CellValue, V: CellValue, M: CellValue>(state: &mut State<'_>, param: u64) {
    let size = param as usize;
    let mixed = state.pop();
    let dense = state.pop();
    let sparse = state.pop();
    let (sparse, dense, mixed) = (sparse.view(), dense.view(), mixed.view());
    let weights = sparse.typed_cells::<S>();
    let vector = dense.typed_cells::<V>();
    let blocks = mixed.typed_cells::<M>();

    let mut sum = 0.0;
    for (i, address) in sparse.index().iter() {
        let weight = weights[i].to_f64();
        if weight == 0.0 {
            continue;
        }
        if let Some(subspace) = mixed.index().lookup(address) {
            let block = &blocks[subspace * size..][..size];
            let dot: f64 = vector
                .iter()
                .zip(block)
                .map(|(&a, &b)| a.to_f64() * b.to_f64())
                .sum();
            sum += weight * dot;
        }
    }
    state.push_value(Value::double(sum));
}

impl TensorFunction for FusedTripleProduct {
    fn name(&self) -> &'static str {
        "triple_product"
    }

    fn result_type(&self) -> &ValueType {
        &self.result_type
    }

    fn push_children(&self, children: &mut Vec<NodeId>) {
        children.extend([self.sparse, self.dense, self.mixed]);
    }

    fn replace_child(&mut self, old: NodeId, new: NodeId) {
        swap_child(&mut self.sparse, old, new);
        swap_child(&mut self.dense, old, new);
        swap_child(&mut self.mixed, old, new);
    }

    fn compile_self(&self, nodes: &Nodes, _stash: &mut ParamStash) -> Instruction {
        let function = select_cell_fn!(
            OpFunction;
            triple_op;
            [
                nodes.result_type(self.sparse).cell_type(),
                nodes.result_type(self.dense).cell_type(),
                nodes.result_type(self.mixed).cell_type(),
            ]
        );
        Instruction::new(function, self.size as u64)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::compare;
    use tensor_core::{Aggr, BinaryOp, Label, TensorSpec, Value, ValueType};
    use tensor_ir::{Building, NodeId, Tree};

    const SPARSE: &str = "tensor(x{})";
    const DENSE: &str = "tensor<float>(y[2])";
    const MIXED: &str = "tensor<float>(x{},y[2])";

    fn inputs() -> Vec<Value> {
        let sparse = TensorSpec::new(SPARSE)
            .unwrap()
            .add([("x", "a")], 2.0)
            .add([("x", "b")], 0.0)
            .add([("x", "c")], -1.0)
            .add([("x", "missing")], 5.0)
            .to_value()
            .unwrap();
        let dense = Value::dense(ValueType::from_spec(DENSE), vec![1.0f32, 10.0]).unwrap();
        let cell = |x: &str, y: usize| [("x", Label::from(x)), ("y", Label::from(y))];
        let mixed = TensorSpec::new(MIXED)
            .unwrap()
            .add(cell("a", 0), 1.0)
            .add(cell("a", 1), 2.0)
            .add(cell("b", 0), 7.0)
            .add(cell("b", 1), 7.0)
            .add(cell("c", 0), 3.0)
            .add(cell("c", 1), 0.5)
            .to_value()
            .unwrap();
        vec![sparse, dense, mixed]
    }

    fn leaves(tree: &mut Tree<Building>) -> [NodeId; 3] {
        [
            tree.inject(ValueType::from_spec(SPARSE), 0),
            tree.inject(ValueType::from_spec(DENSE), 1),
            tree.inject(ValueType::from_spec(MIXED), 2),
        ]
    }

    #[test]
    fn test_left_nested_product() {
        let values = inputs();
        let refs: Vec<&Value> = values.iter().collect();
        let result = compare(
            "sparse-dense-mixed-product",
            |tree| {
                let [s, v, m] = leaves(tree);
                let sv = tree.join(s, v, BinaryOp::Mul);
                let svm = tree.join(sv, m, BinaryOp::Mul);
                tree.reduce(svm, Aggr::Sum, &[])
            },
            &refs,
        );
        assert_eq!(result.rewrites, 1);
        assert_eq!(result.root_name, "triple_product");
        // a: 2 * (1 + 20) = 42; c: -1 * (3 + 5) = -8.
        assert_eq!(result.optimized.as_double(), 34.0);
        result.assert_close(1e-9);
    }

    #[test]
    fn test_right_nested_product() {
        let values = inputs();
        let refs: Vec<&Value> = values.iter().collect();
        let result = compare(
            "sparse-dense-mixed-product",
            |tree| {
                let [s, v, m] = leaves(tree);
                let mv = tree.join(m, v, BinaryOp::Mul);
                let smv = tree.join(mv, s, BinaryOp::Mul);
                tree.reduce(smv, Aggr::Sum, &["y", "x"])
            },
            &refs,
        );
        assert_eq!(result.rewrites, 1);
        result.assert_close(1e-9);
    }

    #[test]
    fn test_partial_reduce_is_left_alone() {
        let values = inputs();
        let refs: Vec<&Value> = values.iter().collect();
        let result = compare(
            "sparse-dense-mixed-product",
            |tree| {
                let [s, v, m] = leaves(tree);
                let sv = tree.join(s, v, BinaryOp::Mul);
                let svm = tree.join(sv, m, BinaryOp::Mul);
                tree.reduce(svm, Aggr::Sum, &["y"])
            },
            &refs,
        );
        assert_eq!(result.rewrites, 0);
        result.assert_close(0.0);
    }
}
