// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dense vector-matrix product.
//!
//! Matches `reduce(join(v, m, mul), sum, n)` where `v` is `tensor(n[N])`,
//! `m` is a dense two-dimensional tensor over `n[N]` and one other
//! dimension, in either operand order. The matrix may store the common
//! dimension innermost or outermost.
//!
//! When vector, matrix and result share `double` or `float` cells the
//! kernel calls [`tensor_core::ops::linalg::vector_matrix`]; any other
//! combination runs a strided dot-product loop.

use super::{join_operands, only_dimension};
use crate::OptimizePass;
use num_traits::Float;
use std::any::Any;
use tensor_core::ops::linalg;
use tensor_core::{select_cell_fn, AddressMap, Aggr, BinaryOp, CellType, CellValue, ValueType};
use tensor_ir::nodes::Reduce;
use tensor_ir::plan::finish_value;
use tensor_ir::{
    swap_child, Building, Instruction, NodeId, Nodes, OpFunction, ParamStash, State,
    TensorFunction, Tree,
};

#[derive(Debug, Clone, Default)]
pub struct VectorMatrixProduct;

impl OptimizePass for VectorMatrixProduct {
    fn name(&self) -> &'static str {
        "vector-matrix-product"
    }

    fn optimize(&self, node: NodeId, tree: &mut Tree<Building>) -> NodeId {
        match DenseVectorMatrix::find(tree.nodes(), node) {
            Some(replacement) => tree.add(replacement),
            None => node,
        }
    }
}

/// `result[i] = Σ_j vector[j] · matrix(i, j)`.
#[derive(Debug)]
pub struct DenseVectorMatrix {
    result_type: ValueType,
    vector: NodeId,
    matrix: NodeId,
    common_size: usize,
    result_size: usize,
    common_inner: bool,
}

impl DenseVectorMatrix {
    fn find(nodes: &Nodes, node: NodeId) -> Option<Self> {
        let reduce = nodes.downcast::<Reduce>(node)?;
        let [common] = reduce.dimensions() else {
            return None;
        };
        if reduce.aggr() != Aggr::Sum {
            return None;
        }
        let (lhs, rhs) = join_operands(nodes, reduce.child(), BinaryOp::Mul)?;
        let (vector, matrix) = if is_vector(nodes.result_type(lhs), common) {
            (lhs, rhs)
        } else {
            (rhs, lhs)
        };
        let vector_type = nodes.result_type(vector);
        let matrix_type = nodes.result_type(matrix);
        if !is_vector(vector_type, common) || !matrix_type.is_dense() {
            return None;
        }
        let [outer, inner] = matrix_type.dimensions() else {
            return None;
        };
        let common_inner = inner.name == *common;
        let (common_dim, result_dim) = if common_inner { (inner, outer) } else { (outer, inner) };
        let common_size = vector_type.dense_subspace_size();
        if common_dim.name != *common || common_dim.size() != Some(common_size) {
            return None;
        }
        let result_type = nodes.result_type(node);
        if only_dimension(result_type).map(|d| &d.name) != Some(&result_dim.name) {
            return None;
        }
        Some(Self {
            result_type: result_type.clone(),
            vector,
            matrix,
            common_size,
            result_size: result_dim.size()?,
            common_inner,
        })
    }

    pub fn vector(&self) -> NodeId {
        self.vector
    }

    pub fn matrix(&self) -> NodeId {
        self.matrix
    }

    /// True if the common dimension varies fastest in the matrix.
    pub fn common_inner(&self) -> bool {
        self.common_inner
    }
}

fn is_vector(ty: &ValueType, common: &str) -> bool {
    ty.is_dense() && only_dimension(ty).is_some_and(|d| d.name == common)
}

struct VectorMatrixParam {
    result_type: ValueType,
    common_size: usize,
    result_size: usize,
    common_inner: bool,
}

fn native_op<T: CellValue + Float>(state: &mut State<'_>, param: u64) {
    let p: &VectorMatrixParam = state.param(param);
    let matrix = state.pop();
    let vector = state.pop();
    let mut out = vec![T::default(); p.result_size];
    linalg::vector_matrix(
        vector.view().typed_cells::<T>(),
        matrix.view().typed_cells::<T>(),
        &mut out,
        p.common_inner,
    );
    state.push_value(finish_value(&p.result_type, out, AddressMap::dense()));
}

fn strided_op<V: CellValue, M: CellValue, O: CellValue>(state: &mut State<'_>, param: u64) {
    let p: &VectorMatrixParam = state.param(param);
    let matrix = state.pop();
    let vector = state.pop();
    let v = vector.view().typed_cells::<V>();
    let m = matrix.view().typed_cells::<M>();
    let (result_stride, common_stride) = if p.common_inner {
        (p.common_size, 1)
    } else {
        (1, p.result_size)
    };

    let mut acc = state.scratch(p.result_size);
    for (i, sum) in acc.iter_mut().enumerate() {
        let base = i * result_stride;
        *sum = v
            .iter()
            .enumerate()
            .map(|(j, &x)| x.to_f64() * m[base + j * common_stride].to_f64())
            .sum();
    }
    let out: Vec<O> = acc.iter().map(|&x| O::from_f64(x)).collect();
    drop(acc);
    state.push_value(finish_value(&p.result_type, out, AddressMap::dense()));
}

impl TensorFunction for DenseVectorMatrix {
    fn name(&self) -> &'static str {
        "vector_matrix"
    }

    fn result_type(&self) -> &ValueType {
        &self.result_type
    }

    fn push_children(&self, children: &mut Vec<NodeId>) {
        children.extend([self.vector, self.matrix]);
    }

    fn replace_child(&mut self, old: NodeId, new: NodeId) {
        swap_child(&mut self.vector, old, new);
        swap_child(&mut self.matrix, old, new);
    }

    fn compile_self(&self, nodes: &Nodes, stash: &mut ParamStash) -> Instruction {
        let vector = nodes.result_type(self.vector).cell_type();
        let matrix = nodes.result_type(self.matrix).cell_type();
        let out = self.result_type.cell_type();
        let function = match (vector, matrix, out) {
            (CellType::Double, CellType::Double, CellType::Double) => native_op::<f64> as OpFunction,
            (CellType::Float, CellType::Float, CellType::Float) => native_op::<f32> as OpFunction,
            _ => select_cell_fn!(OpFunction; strided_op; [vector, matrix, out]),
        };
        let param = VectorMatrixParam {
            result_type: self.result_type.clone(),
            common_size: self.common_size,
            result_size: self.result_size,
            common_inner: self.common_inner,
        };
        Instruction::new(function, stash.create(param))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dump_details(&self) -> String {
        let layout = if self.common_inner { "inner" } else { "outer" };
        format!("({}x{}, common {layout})", self.common_size, self.result_size)
    }
}
