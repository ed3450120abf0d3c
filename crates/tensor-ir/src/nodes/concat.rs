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
use tensor_core::{select_cell_fn, AddressMap, CellValue, ValueType};

/// Concatenation along one indexed dimension.
///
/// An input without the dimension contributes a single slice. Mapped
/// dimensions match like a join.
#[derive(Debug)]
pub struct Concat {
    result_type: ValueType,
    lhs: NodeId,
    rhs: NodeId,
    dimension: String,
}

impl Concat {
    pub fn new(result_type: ValueType, lhs: NodeId, rhs: NodeId, dimension: String) -> Self {
        Self {
            result_type,
            lhs,
            rhs,
            dimension,
        }
    }

    pub fn lhs(&self) -> NodeId {
        self.lhs
    }

    pub fn rhs(&self) -> NodeId {
        self.rhs
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }
}

struct ConcatParam {
    result_type: ValueType,
    sparse: SparseJoinPlan,
    /// Offsets `[out, lhs]` covering the lhs part of each output subspace.
    lhs_loop: StridedLoop<2>,
    /// Offsets `[out, rhs]`, relative to `rhs_offset`.
    rhs_loop: StridedLoop<2>,
    rhs_offset: usize,
    lhs_size: usize,
    rhs_size: usize,
    out_size: usize,
}

impl ConcatParam {
    fn new(lhs: &ValueType, rhs: &ValueType, result_type: &ValueType, dimension: &str) -> Self {
        let extent = |ty: &ValueType| ty.dimension(dimension).and_then(|d| d.size()).unwrap_or(1);
        let mut lhs_dims = Vec::new();
        let mut rhs_dims = Vec::new();
        let mut rhs_offset = 0;
        for (dim, out_stride) in result_type
            .indexed_dimensions()
            .zip(result_type.dense_strides())
        {
            let lhs_stride = indexed_stride(lhs, &dim.name).unwrap_or(0);
            let rhs_stride = indexed_stride(rhs, &dim.name).unwrap_or(0);
            if dim.name == dimension {
                lhs_dims.push((extent(lhs), [out_stride, lhs_stride]));
                rhs_dims.push((extent(rhs), [out_stride, rhs_stride]));
                rhs_offset = extent(lhs) * out_stride;
            } else {
                let size = dim.size().unwrap_or(1);
                lhs_dims.push((size, [out_stride, lhs_stride]));
                rhs_dims.push((size, [out_stride, rhs_stride]));
            }
        }
        Self {
            result_type: result_type.clone(),
            sparse: SparseJoinPlan::new(lhs, rhs, result_type),
            lhs_loop: StridedLoop::new(lhs_dims),
            rhs_loop: StridedLoop::new(rhs_dims),
            rhs_offset,
            lhs_size: lhs.dense_subspace_size(),
            rhs_size: rhs.dense_subspace_size(),
            out_size: result_type.dense_subspace_size(),
        }
    }
}

fn concat_op<L: CellValue, R: CellValue, O: CellValue>(state: &mut State<'_>, param: u64) {
    let p: &ConcatParam = state.param(param);
    let rhs = state.pop();
    let lhs = state.pop();
    let (lhs, rhs) = (lhs.view(), rhs.view());
    let lhs_cells = lhs.typed_cells::<L>();
    let rhs_cells = rhs.typed_cells::<R>();

    let mut index = AddressMap::with_capacity(p.sparse.sources.len(), lhs.num_subspaces());
    let mut cells: Vec<O> = Vec::new();
    p.sparse.for_each_match(lhs.index(), rhs.index(), |l, r, address| {
        index.add(address);
        let a = &lhs_cells[l * p.lhs_size..][..p.lhs_size];
        let b = &rhs_cells[r * p.rhs_size..][..p.rhs_size];
        let base = cells.len();
        cells.resize(base + p.out_size, O::default());
        let out = &mut cells[base..];
        p.lhs_loop
            .for_each(|[o, i]| out[o] = O::from_f64(a[i].to_f64()));
        let tail = &mut out[p.rhs_offset..];
        p.rhs_loop
            .for_each(|[o, j]| tail[o] = O::from_f64(b[j].to_f64()));
    });
    state.push_value(finish_value(&p.result_type, cells, index));
}

impl TensorFunction for Concat {
    fn name(&self) -> &'static str {
        "concat"
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
            concat_op;
            [lhs.cell_type(), rhs.cell_type(), self.result_type.cell_type()]
        );
        let param = ConcatParam::new(lhs, rhs, &self.result_type, &self.dimension);
        Instruction::new(function, stash.create(param))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dump_details(&self) -> String {
        format!("({})", self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::eval;
    use crate::Tree;
    use tensor_core::{Value, ValueType};

    fn t(s: &str) -> ValueType {
        ValueType::from_spec(s)
    }

    fn concat(a: &Value, b: &Value, dim: &str) -> Value {
        let mut tree = Tree::new();
        let l = tree.inject(a.value_type().clone(), 0);
        let r = tree.inject(b.value_type().clone(), 1);
        let root = tree.concat(l, r, dim);
        eval(tree, root, &[a, b])
    }

    #[test]
    fn test_concat_vectors() {
        let a = Value::dense(t("tensor(x[2])"), vec![1.0, 2.0]).unwrap();
        let b = Value::dense(t("tensor(x[3])"), vec![3.0, 4.0, 5.0]).unwrap();
        let result = concat(&a, &b, "x");
        assert_eq!(result.value_type(), &t("tensor(x[5])"));
        assert_eq!(result.cells().to_f64_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_concat_scalar_onto_vector() {
        let a = Value::double(9.0);
        let b = Value::dense(t("tensor(x[2])"), vec![1.0, 2.0]).unwrap();
        let result = concat(&a, &b, "x");
        assert_eq!(result.cells().to_f64_vec(), vec![9.0, 1.0, 2.0]);
    }

    #[test]
    fn test_concat_outer_dimension_of_matrices() {
        let a = Value::dense(t("tensor(x[1],y[2])"), vec![1.0, 2.0]).unwrap();
        let b = Value::dense(t("tensor(x[2],y[2])"), vec![3.0, 4.0, 5.0, 6.0]).unwrap();
        let result = concat(&a, &b, "x");
        assert_eq!(result.value_type(), &t("tensor(x[3],y[2])"));
        assert_eq!(
            result.cells().to_f64_vec(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn test_concat_inner_dimension_broadcasts() {
        // b has no y: it contributes one slice, broadcast over x.
        let a = Value::dense(t("tensor<float>(x[2],y[2])"), vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
        let b = Value::dense(t("tensor<float>(x[2])"), vec![7.0f32, 8.0]).unwrap();
        let result = concat(&a, &b, "y");
        assert_eq!(result.value_type(), &t("tensor<float>(x[2],y[3])"));
        assert_eq!(
            result.cells().to_f64_vec(),
            vec![1.0, 2.0, 7.0, 3.0, 4.0, 8.0]
        );
    }
}
