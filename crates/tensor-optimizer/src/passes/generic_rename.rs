// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Planned renames.
//!
//! Any rename left after [`super::StableRename`] moves data. The plan is
//! built once when the pass runs:
//!
//! - mapped dimensions: for each output address slot, the child slot it
//!   is read from;
//! - indexed dimensions: a [`StridedLoop`] over the output order whose
//!   offsets point into the child block. Runs that are contiguous in the
//!   child collapse into a single `(count, stride)` pair.

use crate::OptimizePass;
use std::any::Any;
use tensor_core::{select_cell_fn, AddressMap, CellValue, ValueType};
use tensor_ir::nodes::Rename;
use tensor_ir::plan::{finish_value, indexed_stride, StridedLoop};
use tensor_ir::{
    swap_child, Building, Instruction, NodeId, Nodes, OpFunction, ParamStash, State,
    TensorFunction, Tree,
};

#[derive(Debug, Clone, Default)]
pub struct GenericRename;

impl OptimizePass for GenericRename {
    fn name(&self) -> &'static str {
        "generic-rename"
    }

    fn optimize(&self, node: NodeId, tree: &mut Tree<Building>) -> NodeId {
        let nodes = tree.nodes();
        let Some(rename) = nodes.downcast::<Rename>(node) else {
            return node;
        };
        let child = rename.child();
        let result_type = nodes.result_type(node).clone();
        let plan = RenamePlan::new(rename, nodes.result_type(child), &result_type);
        tree.add(PlannedRename {
            result_type,
            child,
            plan,
        })
    }
}

/// Precomputed data movement of one rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    /// Child address slot feeding each output slot.
    pub address_sources: Vec<usize>,
    /// Child offsets in output row-major order.
    pub cells: StridedLoop<1>,
    pub subspace_size: usize,
}

impl RenamePlan {
    pub fn new(rename: &Rename, child: &ValueType, result: &ValueType) -> Self {
        let child_mapped = child.mapped_dimension_names();
        let address_sources = result
            .mapped_dimensions()
            .filter_map(|d| {
                let old = rename.source_name(&d.name);
                child_mapped.iter().position(|n| *n == old)
            })
            .collect();
        let cells = StridedLoop::new(result.indexed_dimensions().map(|d| {
            let old = rename.source_name(&d.name);
            (d.size().unwrap_or(1), [indexed_stride(child, old).unwrap_or(0)])
        }));
        Self {
            address_sources,
            cells,
            subspace_size: result.dense_subspace_size(),
        }
    }

    /// True if addresses are copied slot for slot.
    pub fn keeps_addresses(&self) -> bool {
        self.address_sources.iter().enumerate().all(|(i, &s)| i == s)
    }
}

#[derive(Debug)]
pub struct PlannedRename {
    result_type: ValueType,
    child: NodeId,
    plan: RenamePlan,
}

impl PlannedRename {
    pub fn plan(&self) -> &RenamePlan {
        &self.plan
    }
}

struct PlannedRenameParam {
    result_type: ValueType,
    plan: RenamePlan,
}

fn planned_rename_op<T: CellValue>(state: &mut State<'_>, param: u64) {
    let p: &PlannedRenameParam = state.param(param);
    let child = state.pop();
    let view = child.view();
    let cells = view.typed_cells::<T>();
    let plan = &p.plan;
    let size = plan.subspace_size;

    let index = if plan.keeps_addresses() {
        view.index().clone()
    } else {
        let mut index = AddressMap::with_capacity(plan.address_sources.len(), view.num_subspaces());
        let mut address = Vec::with_capacity(plan.address_sources.len());
        for (_, old) in view.index().iter() {
            address.clear();
            address.extend(plan.address_sources.iter().map(|&slot| old[slot]));
            index.add(&address);
        }
        index
    };

    let mut out = Vec::with_capacity(cells.len());
    for block in cells.chunks_exact(size) {
        plan.cells.for_each(|[src]| out.push(block[src]));
    }
    state.push_value(finish_value(&p.result_type, out, index));
}

impl TensorFunction for PlannedRename {
    fn name(&self) -> &'static str {
        "planned_rename"
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
        let function =
            select_cell_fn!(OpFunction; planned_rename_op; [self.result_type.cell_type()]);
        let param = PlannedRenameParam {
            result_type: self.result_type.clone(),
            plan: self.plan.clone(),
        };
        Instruction::new(function, stash.create(param))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dump_details(&self) -> String {
        format!("({} loops)", self.plan.cells.loops().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::compare;
    use tensor_core::{Label, TensorSpec, Value};

    fn t(spec: &str) -> ValueType {
        ValueType::from_spec(spec)
    }

    #[test]
    fn test_transpose_plan() {
        let mut tree = Tree::new();
        let a = tree.inject(t("tensor(x[2],y[3])"), 0);
        let root = tree.rename(a, &["x", "y"], &["y", "x"]);
        let new_root = GenericRename.optimize(root, &mut tree);
        let planned = tree.nodes().downcast::<PlannedRename>(new_root).unwrap();
        // Output x[3] walks child y (stride 1), output y[2] walks child x (stride 3).
        assert_eq!(planned.plan().cells.loops(), &[(3, [1]), (2, [3])]);
        assert!(planned.plan().keeps_addresses());
    }

    #[test]
    fn test_transpose_matches_generic_rename() {
        let m = Value::dense(t("tensor(x[2],y[3])"), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let result = compare(
            "generic-rename",
            |tree| {
                let a = tree.inject(t("tensor(x[2],y[3])"), 0);
                tree.rename(a, &["x", "y"], &["y", "x"])
            },
            &[&m],
        );
        assert_eq!(result.rewrites, 1);
        assert_eq!(result.root_name, "planned_rename");
        assert_eq!(result.optimized.cells().to_f64_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(result.optimized, result.reference);
    }

    #[test]
    fn test_mapped_slots_are_permuted() {
        let cell = |a: &str, b: &str, x: usize| {
            [("a", Label::from(a)), ("b", Label::from(b)), ("x", Label::from(x))]
        };
        let input = TensorSpec::new("tensor<int8>(a{},b{},x[2])")
            .unwrap()
            .add(cell("1", "2", 0), 5.0)
            .add(cell("1", "2", 1), 6.0)
            .add(cell("3", "4", 0), -7.0)
            .add(cell("3", "4", 1), 8.0)
            .to_value()
            .unwrap();
        let result = compare(
            "generic-rename",
            |tree| {
                let a = tree.inject(t("tensor<int8>(a{},b{},x[2])"), 0);
                tree.rename(a, &["a", "b"], &["b", "a"])
            },
            &[&input],
        );
        assert_eq!(result.rewrites, 1);
        assert_eq!(result.optimized, result.reference);
        assert_eq!(result.optimized.cell_type(), tensor_core::CellType::Int8);
    }

    #[test]
    fn test_contiguous_runs_collapse() {
        // Renaming the outer of three dimensions past the others keeps the
        // inner pair contiguous.
        let mut tree = Tree::new();
        let a = tree.inject(t("tensor(a[2],b[3],c[4])"), 0);
        let root = tree.rename(a, &["a"], &["z"]);
        let new_root = GenericRename.optimize(root, &mut tree);
        let planned = tree.nodes().downcast::<PlannedRename>(new_root).unwrap();
        assert_eq!(planned.plan().cells.loops(), &[(12, [1]), (2, [12])]);
    }
}
