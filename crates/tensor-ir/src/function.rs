// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`TensorFunction`] trait implemented by every node kind.

use crate::{Instruction, NodeId, Nodes, ParamStash};
use std::any::Any;
use std::fmt;
use tensor_core::ValueType;

/// A node of the tensor-function tree.
///
/// Generic nodes live in [`crate::nodes`]; optimizer passes add specialized
/// nodes that implement the same trait with a cheaper `compile_self`.
pub trait TensorFunction: Send + Sync + fmt::Debug + 'static {
    /// Short kind name used in dumps and logs.
    fn name(&self) -> &'static str;

    fn result_type(&self) -> &ValueType;

    /// Appends the children in evaluation order.
    fn push_children(&self, children: &mut Vec<NodeId>);

    /// Replaces every reference to `old` with `new`.
    fn replace_child(&mut self, old: NodeId, new: NodeId);

    /// Produces the instruction for this node. Parameters the kernel needs
    /// at run time go into `stash`.
    fn compile_self(&self, nodes: &Nodes, stash: &mut ParamStash) -> Instruction;

    fn as_any(&self) -> &dyn Any;

    /// Extra information printed after the node name, e.g. `(mul)`.
    fn dump_details(&self) -> String {
        String::new()
    }
}

/// Replaces `old` with `new` in a child slot.
#[inline]
pub fn swap_child(slot: &mut NodeId, old: NodeId, new: NodeId) {
    if *slot == old {
        *slot = new;
    }
}
