// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::plan::{finish_value, indexed_stride, SparseJoinPlan, StridedLoop};
use crate::{
    swap_child, Instruction, NodeId, Nodes, OpFunction, ParamStash, State, TensorFunction,
};
use std::any::Any;
use tensor_core::{select_cell_fn, AddressMap, BinaryOp, CellValue, Value, ValueType, ValueView};

/// Elementwise binary operation.
///
/// Mapped dimensions join as an intersection: only addresses present on
/// both sides (on their shared dimensions) produce output. Indexed
/// dimensions broadcast.
#[derive(Debug)]
pub struct Join {
    result_type: ValueType,
    lhs: NodeId,
    rhs: NodeId,
    op: BinaryOp,
}

impl Join {
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

struct JoinParam {
    result_type: ValueType,
    function: fn(f64, f64) -> f64,
    sparse: SparseJoinPlan,
    /// Offsets `[out, lhs, rhs]` within one subspace of each.
    dense: StridedLoop<3>,
    lhs_size: usize,
    rhs_size: usize,
    out_size: usize,
}

impl JoinParam {
    fn new(lhs: &ValueType, rhs: &ValueType, result_type: &ValueType, op: BinaryOp) -> Self {
        let dense = StridedLoop::new(
            result_type
                .indexed_dimensions()
                .zip(result_type.dense_strides())
                .map(|(dim, out_stride)| {
                    (
                        dim.size().unwrap_or(1),
                        [
                            out_stride,
                            indexed_stride(lhs, &dim.name).unwrap_or(0),
                            indexed_stride(rhs, &dim.name).unwrap_or(0),
                        ],
                    )
                }),
        );
        Self {
            result_type: result_type.clone(),
            function: op.function(),
            sparse: SparseJoinPlan::new(lhs, rhs, result_type),
            dense,
            lhs_size: lhs.dense_subspace_size(),
            rhs_size: rhs.dense_subspace_size(),
            out_size: result_type.dense_subspace_size(),
        }
    }

    fn apply<L: CellValue, R: CellValue, O: CellValue>(
        &self,
        lhs: ValueView<'_>,
        rhs: ValueView<'_>,
    ) -> Value {
        let lhs_cells = lhs.typed_cells::<L>();
        let rhs_cells = rhs.typed_cells::<R>();
        let function = self.function;
        let mut index = AddressMap::with_capacity(self.sparse.sources.len(), lhs.num_subspaces());
        let mut cells: Vec<O> = Vec::with_capacity(lhs.num_subspaces() * self.out_size);
        self.sparse
            .for_each_match(lhs.index(), rhs.index(), |l, r, address| {
                index.add(address);
                let a = &lhs_cells[l * self.lhs_size..][..self.lhs_size];
                let b = &rhs_cells[r * self.rhs_size..][..self.rhs_size];
                let base = cells.len();
                cells.resize(base + self.out_size, O::default());
                let out = &mut cells[base..];
                self.dense.for_each(|[o, i, j]| {
                    out[o] = O::from_f64(function(a[i].to_f64(), b[j].to_f64()));
                });
            });
        finish_value(&self.result_type, cells, index)
    }
}

fn join_op<L: CellValue, R: CellValue, O: CellValue>(state: &mut State<'_>, param: u64) {
    let p: &JoinParam = state.param(param);
    let rhs = state.pop();
    let lhs = state.pop();
    let value = p.apply::<L, R, O>(lhs.view(), rhs.view());
    state.push_value(value);
}

impl TensorFunction for Join {
    fn name(&self) -> &'static str {
        "join"
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
            join_op;
            [lhs.cell_type(), rhs.cell_type(), self.result_type.cell_type()]
        );
        let param = JoinParam::new(lhs, rhs, &self.result_type, self.op);
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
    use crate::testing::{eval, spec};
    use crate::Tree;
    use tensor_core::{BinaryOp, Label, TensorSpec, Value, ValueType};

    fn t(s: &str) -> ValueType {
        ValueType::from_spec(s)
    }

    #[test]
    fn test_dense_broadcast() {
        let x = Value::dense(t("tensor(x[2])"), vec![1.0, 2.0]).unwrap();
        let y = Value::dense(t("tensor(y[3])"), vec![10.0, 20.0, 30.0]).unwrap();
        let mut tree = Tree::new();
        let a = tree.inject(x.value_type().clone(), 0);
        let b = tree.inject(y.value_type().clone(), 1);
        let root = tree.join(a, b, BinaryOp::Mul);
        let result = eval(tree, root, &[&x, &y]);
        assert_eq!(result.value_type(), &t("tensor(x[2],y[3])"));
        assert_eq!(
            result.cells().to_f64_vec(),
            vec![10.0, 20.0, 30.0, 20.0, 40.0, 60.0]
        );
    }

    #[test]
    fn test_sparse_intersection() {
        let lhs = TensorSpec::new("tensor(k{})")
            .unwrap()
            .add([("k", "a")], 2.0)
            .add([("k", "b")], 3.0);
        let rhs = TensorSpec::new("tensor(k{})")
            .unwrap()
            .add([("k", "b")], 5.0)
            .add([("k", "c")], 7.0);
        let (l, r) = (lhs.to_value().unwrap(), rhs.to_value().unwrap());

        let mut tree = Tree::new();
        let a = tree.inject(l.value_type().clone(), 0);
        let b = tree.inject(r.value_type().clone(), 1);
        let root = tree.join(a, b, BinaryOp::Mul);
        let expected = TensorSpec::new("tensor(k{})").unwrap().add([("k", "b")], 15.0);
        assert_eq!(spec(&eval(tree, root, &[&l, &r])), expected);
    }

    #[test]
    fn test_mixed_with_dense_and_scalar() {
        let mixed = TensorSpec::new("tensor(k{},x[2])")
            .unwrap()
            .add([("k", Label::from("a")), ("x", Label::from(0usize))], 1.0)
            .add([("k", Label::from("a")), ("x", Label::from(1usize))], 2.0)
            .to_value()
            .unwrap();
        let dense = Value::dense(t("tensor<float>(x[2])"), vec![3.0f32, 4.0]).unwrap();

        let mut tree = Tree::new();
        let m = tree.inject(mixed.value_type().clone(), 0);
        let d = tree.inject(dense.value_type().clone(), 1);
        let two = tree.const_value(Value::double(2.0));
        let product = tree.join(m, d, BinaryOp::Mul);
        let root = tree.join(product, two, BinaryOp::Sub);
        let result = eval(tree, root, &[&mixed, &dense]);
        assert_eq!(result.value_type(), &t("tensor(k{},x[2])"));
        assert_eq!(result.cells().to_f64_vec(), vec![1.0, 6.0]);
    }

    #[test]
    fn test_join_with_empty_sparse_side() {
        let empty = Value::empty(t("tensor(k{})")).unwrap();
        let dense = Value::dense(t("tensor(x[2])"), vec![1.0, 2.0]).unwrap();
        let mut tree = Tree::new();
        let a = tree.inject(empty.value_type().clone(), 0);
        let b = tree.inject(dense.value_type().clone(), 1);
        let root = tree.join(a, b, BinaryOp::Add);
        let result = eval(tree, root, &[&empty, &dense]);
        assert_eq!(result.num_subspaces(), 0);
        assert_eq!(result.value_type(), &t("tensor(k{},x[2])"));
    }

    #[test]
    fn test_float_cells_decay() {
        let a = Value::dense(t("tensor<int8>(x[2])"), vec![3i8, 4]).unwrap();
        let b = Value::dense(t("tensor<bfloat16>(x[2])"), vec![
            tensor_core::bf16::from_f32(0.5),
            tensor_core::bf16::from_f32(2.0),
        ])
        .unwrap();
        let mut tree = Tree::new();
        let l = tree.inject(a.value_type().clone(), 0);
        let r = tree.inject(b.value_type().clone(), 1);
        let root = tree.join(l, r, BinaryOp::Mul);
        let result = eval(tree, root, &[&a, &b]);
        assert_eq!(result.value_type(), &t("tensor<float>(x[2])"));
        assert_eq!(result.cells().typed::<f32>(), Some(&[1.5f32, 8.0][..]));
    }
}
