// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::plan::{finish_value, indexed_stride, StridedLoop};
use crate::{
    swap_child, Instruction, NodeId, Nodes, OpFunction, ParamStash, State, TensorFunction,
};
use std::any::Any;
use tensor_core::{
    dispatch_aggr, select_cell_fn, AddressMap, Aggr, Aggregator, CellValue, ValueType,
};

/// Aggregation over a set of dimensions.
///
/// Subspaces that agree on the surviving mapped dimensions are folded
/// together; reduced indexed dimensions fold within each subspace.
#[derive(Debug)]
pub struct Reduce {
    result_type: ValueType,
    child: NodeId,
    aggr: Aggr,
    dimensions: Vec<String>,
}

impl Reduce {
    pub fn new(result_type: ValueType, child: NodeId, aggr: Aggr, dimensions: Vec<String>) -> Self {
        Self {
            result_type,
            child,
            aggr,
            dimensions,
        }
    }

    pub fn child(&self) -> NodeId {
        self.child
    }

    pub fn aggr(&self) -> Aggr {
        self.aggr
    }

    /// The reduced dimensions; empty means all of them.
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    /// The dimensions actually removed from `child_type`.
    pub fn reduced_dimensions<'a>(&'a self, child_type: &'a ValueType) -> Vec<&'a str> {
        if self.dimensions.is_empty() {
            child_type.dimension_names()
        } else {
            self.dimensions.iter().map(String::as_str).collect()
        }
    }
}

struct ReduceParam {
    result_type: ValueType,
    /// Positions of the surviving mapped dimensions in the child address.
    kept: Vec<usize>,
    /// Offsets `[child, out]` within one subspace.
    dense: StridedLoop<2>,
    in_size: usize,
    out_size: usize,
}

impl ReduceParam {
    fn new(child: &ValueType, result_type: &ValueType) -> Self {
        let kept = child
            .mapped_dimensions()
            .enumerate()
            .filter(|(_, d)| result_type.dimension(&d.name).is_some())
            .map(|(i, _)| i)
            .collect();
        let dense = StridedLoop::new(child.indexed_dimensions().zip(child.dense_strides()).map(
            |(dim, stride)| {
                (
                    dim.size().unwrap_or(1),
                    [stride, indexed_stride(result_type, &dim.name).unwrap_or(0)],
                )
            },
        ));
        Self {
            result_type: result_type.clone(),
            kept,
            dense,
            in_size: child.dense_subspace_size(),
            out_size: result_type.dense_subspace_size(),
        }
    }
}

fn reduce_op<I: CellValue, O: CellValue, A: Aggregator>(state: &mut State<'_>, param: u64) {
    let p: &ReduceParam = state.param(param);
    let child = state.pop();
    let view = child.view();
    let cells = view.typed_cells::<I>();

    let mut index = AddressMap::new(p.kept.len());
    let mut aggrs: Vec<A> = Vec::new();
    if p.kept.is_empty() {
        // A result without mapped dimensions exists even for empty input.
        index.add(&[]);
        aggrs.resize_with(p.out_size, A::default);
    }
    let mut key = Vec::with_capacity(p.kept.len());
    for (subspace, address) in view.index().iter() {
        key.clear();
        key.extend(p.kept.iter().map(|&d| address[d]));
        let (out, added) = index.add(&key);
        if added {
            aggrs.resize_with(aggrs.len() + p.out_size, A::default);
        }
        let block = &cells[subspace * p.in_size..][..p.in_size];
        let targets = &mut aggrs[out * p.out_size..][..p.out_size];
        p.dense.for_each(|[i, o]| targets[o].sample(block[i].to_f64()));
    }

    let out_cells: Vec<O> = aggrs.iter().map(|a| O::from_f64(a.result())).collect();
    state.push_value(finish_value(&p.result_type, out_cells, index));
}

impl TensorFunction for Reduce {
    fn name(&self) -> &'static str {
        "reduce"
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
        let (ict, oct) = (child.cell_type(), self.result_type.cell_type());
        let function = dispatch_aggr!(
            self.aggr,
            A => select_cell_fn!(OpFunction; reduce_op; [ict, oct]; [A])
        );
        let param = ReduceParam::new(child, &self.result_type);
        Instruction::new(function, stash.create(param))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dump_details(&self) -> String {
        if self.dimensions.is_empty() {
            format!("({})", self.aggr)
        } else {
            format!("({}, {})", self.aggr, self.dimensions.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{eval, spec};
    use crate::Tree;
    use tensor_core::{Aggr, Label, TensorSpec, Value, ValueType};

    fn t(s: &str) -> ValueType {
        ValueType::from_spec(s)
    }

    fn reduce(input: &Value, aggr: Aggr, dims: &[&str]) -> Value {
        let mut tree = Tree::new();
        let child = tree.inject(input.value_type().clone(), 0);
        let root = tree.reduce(child, aggr, dims);
        eval(tree, root, &[input])
    }

    #[test]
    fn test_reduce_dense_rows_and_columns() {
        let m = Value::dense(t("tensor(x[2],y[3])"), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(reduce(&m, Aggr::Sum, &["y"]).cells().to_f64_vec(), vec![6.0, 15.0]);
        assert_eq!(
            reduce(&m, Aggr::Max, &["x"]).cells().to_f64_vec(),
            vec![4.0, 5.0, 6.0]
        );
        let all = reduce(&m, Aggr::Avg, &[]);
        assert!(all.value_type().is_double());
        assert_eq!(all.as_double(), 3.5);
    }

    #[test]
    fn test_reduce_groups_sparse_labels() {
        let input = TensorSpec::new("tensor(a{},b{})")
            .unwrap()
            .add([("a", "x"), ("b", "1")], 1.0)
            .add([("a", "x"), ("b", "2")], 2.0)
            .add([("a", "y"), ("b", "1")], 4.0)
            .to_value()
            .unwrap();
        let expected = TensorSpec::new("tensor(a{})")
            .unwrap()
            .add([("a", "x")], 2.0)
            .add([("a", "y")], 1.0);
        assert_eq!(spec(&reduce(&input, Aggr::Count, &["b"])), expected);
    }

    #[test]
    fn test_reduce_mixed_to_dense() {
        let input = TensorSpec::new("tensor(k{},x[2])")
            .unwrap()
            .add([("k", Label::from("a")), ("x", Label::from(0usize))], 1.0)
            .add([("k", Label::from("a")), ("x", Label::from(1usize))], 2.0)
            .add([("k", Label::from("b")), ("x", Label::from(0usize))], 10.0)
            .to_value()
            .unwrap();
        let result = reduce(&input, Aggr::Sum, &["k"]);
        assert_eq!(result.value_type(), &t("tensor(x[2])"));
        assert_eq!(result.cells().to_f64_vec(), vec![11.0, 2.0]);
    }

    #[test]
    fn test_empty_sparse_reduces_to_zero() {
        let empty = Value::empty(t("tensor(k{},x[2])")).unwrap();
        let result = reduce(&empty, Aggr::Max, &["k"]);
        assert_eq!(result.cells().to_f64_vec(), vec![0.0, 0.0]);
        assert_eq!(reduce(&empty, Aggr::Sum, &[]).as_double(), 0.0);
    }

    #[test]
    fn test_reduce_decays_cell_type() {
        let input = Value::dense(t("tensor<int8>(x[4])"), vec![1i8, 2, 3, 4]).unwrap();
        let result = reduce(&input, Aggr::Median, &[]);
        assert!(result.value_type().is_double());
        assert_eq!(result.as_double(), 2.5);

        let partial = Value::dense(t("tensor<int8>(x[2],y[2])"), vec![1i8, 2, 3, 4]).unwrap();
        let result = reduce(&partial, Aggr::Prod, &["x"]);
        assert_eq!(result.value_type(), &t("tensor<float>(y[2])"));
        assert_eq!(result.cells().to_f64_vec(), vec![3.0, 8.0]);
    }
}
