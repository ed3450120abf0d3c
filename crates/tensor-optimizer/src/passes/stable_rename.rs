// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Renames that keep the dimension order.
//!
//! Mapped dimensions are stored as address slots and indexed dimensions as
//! row-major strides, both in sorted name order. A rename whose new names
//! sort the same way as the old ones leaves every slot and stride in place,
//! so only the type changes. Size-1 indexed dimensions have no stride and
//! are ignored when comparing orders.

use super::replace_type::{same_layout, ReplaceType};
use crate::OptimizePass;
use tensor_core::ValueType;
use tensor_ir::nodes::Rename;
use tensor_ir::{Building, NodeId, Tree};

#[derive(Debug, Clone, Default)]
pub struct StableRename;

impl OptimizePass for StableRename {
    fn name(&self) -> &'static str {
        "stable-rename"
    }

    fn optimize(&self, node: NodeId, tree: &mut Tree<Building>) -> NodeId {
        let nodes = tree.nodes();
        let Some(rename) = nodes.downcast::<Rename>(node) else {
            return node;
        };
        let child = nodes.result_type(rename.child());
        let result = nodes.result_type(node);
        if !same_layout(child, result) || !keeps_order(rename, child, result) {
            return node;
        }
        let (result_type, child) = (result.clone(), rename.child());
        tree.add(ReplaceType::new(result_type, child))
    }
}

fn keeps_order(rename: &Rename, child: &ValueType, result: &ValueType) -> bool {
    let mapped: Vec<&str> = result
        .mapped_dimensions()
        .map(|d| rename.source_name(&d.name))
        .collect();
    let indexed: Vec<&str> = result
        .nontrivial_indexed_dimensions()
        .map(|d| rename.source_name(&d.name))
        .collect();
    let child_indexed: Vec<&str> = child
        .nontrivial_indexed_dimensions()
        .map(|d| d.name.as_str())
        .collect();
    mapped == child.mapped_dimension_names() && indexed == child_indexed
}
