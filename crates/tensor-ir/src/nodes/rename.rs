// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::plan::{finish_value, indexed_stride};
use crate::{
    swap_child, Instruction, NodeId, Nodes, OpFunction, ParamStash, State, TensorFunction,
};
use std::any::Any;
use tensor_core::{select_cell_fn, AddressMap, CellValue, ValueType};

/// Dimension renaming.
///
/// The generic kernel remaps every cell address individually; the
/// optimizer replaces it with a type-only reinterpretation or a planned
/// copy where possible.
#[derive(Debug)]
pub struct Rename {
    result_type: ValueType,
    child: NodeId,
    from: Vec<String>,
    to: Vec<String>,
}

impl Rename {
    pub fn new(result_type: ValueType, child: NodeId, from: Vec<String>, to: Vec<String>) -> Self {
        Self {
            result_type,
            child,
            from,
            to,
        }
    }

    pub fn child(&self) -> NodeId {
        self.child
    }

    pub fn from(&self) -> &[String] {
        &self.from
    }

    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// The child dimension that ends up named `name`.
    pub fn source_name<'a>(&'a self, name: &'a str) -> &'a str {
        match self.to.iter().position(|t| t == name) {
            Some(i) => &self.from[i],
            None => name,
        }
    }
}

struct RenameParam {
    result_type: ValueType,
    /// For each output mapped dimension, its position in the child address.
    sources: Vec<usize>,
    /// `(size, child stride)` per output indexed dimension, outermost first.
    dims: Vec<(usize, usize)>,
    size: usize,
}

fn rename_op<T: CellValue>(state: &mut State<'_>, param: u64) {
    let p: &RenameParam = state.param(param);
    let child = state.pop();
    let view = child.view();
    let cells = view.typed_cells::<T>();

    let mut index = AddressMap::with_capacity(p.sources.len(), view.num_subspaces());
    let mut out = Vec::with_capacity(cells.len());
    let mut address = Vec::with_capacity(p.sources.len());
    for (subspace, old) in view.index().iter() {
        address.clear();
        address.extend(p.sources.iter().map(|&d| old[d]));
        index.add(&address);
        let block = &cells[subspace * p.size..][..p.size];
        for cell in 0..p.size {
            let mut rest = cell;
            let mut src = 0;
            for &(size, stride) in p.dims.iter().rev() {
                src += (rest % size) * stride;
                rest /= size;
            }
            out.push(block[src]);
        }
    }
    state.push_value(finish_value(&p.result_type, out, index));
}

impl TensorFunction for Rename {
    fn name(&self) -> &'static str {
        "rename"
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
        let child_mapped = child.mapped_dimension_names();
        let sources = self
            .result_type
            .mapped_dimensions()
            .filter_map(|d| {
                let old = self.source_name(&d.name);
                child_mapped.iter().position(|n| *n == old)
            })
            .collect();
        let dims = self
            .result_type
            .indexed_dimensions()
            .map(|d| {
                let old = self.source_name(&d.name);
                (d.size().unwrap_or(1), indexed_stride(child, old).unwrap_or(0))
            })
            .collect();
        let param = RenameParam {
            result_type: self.result_type.clone(),
            sources,
            dims,
            size: self.result_type.dense_subspace_size(),
        };
        let function = select_cell_fn!(OpFunction; rename_op; [self.result_type.cell_type()]);
        Instruction::new(function, stash.create(param))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dump_details(&self) -> String {
        format!("({} -> {})", self.from.join(","), self.to.join(","))
    }
}
