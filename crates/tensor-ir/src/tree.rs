// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The node arena holding one expression.
//!
//! # Type-State Pattern
//!
//! ```text
//! Tree<Building>  : nodes may be added and children replaced.
//!       │  .freeze(root)
//!       ▼
//! Tree<Frozen>    : every reachable node has a concrete type; immutable.
//! ```
//!
//! Only a frozen tree can be compiled, so an error-typed node never
//! reaches compilation. Children are referenced by [`NodeId`] into the
//! arena; the whole tree is dropped at once.

use crate::nodes::{Concat, ConstValue, Inject, Join, Map, Merge, Reduce, Rename};
use crate::{IrError, TensorFunction};
use std::fmt::{self, Write as _};
use tensor_core::{Aggr, BinaryOp, UnaryOp, Value, ValueType};

/// Index of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Nodes ──────────────────────────────────────────────────────────

/// Flat storage of every node in a tree.
#[derive(Debug, Default)]
pub struct Nodes {
    nodes: Vec<Box<dyn TensorFunction>>,
}

impl Nodes {
    /// # Panics
    /// Panics if `id` was not produced by this tree.
    pub fn get(&self, id: NodeId) -> &dyn TensorFunction {
        self.nodes[id.index()].as_ref()
    }

    pub fn result_type(&self, id: NodeId) -> &ValueType {
        self.get(id).result_type()
    }

    /// The node as a concrete kind, if it is one.
    pub fn downcast<T: TensorFunction>(&self, id: NodeId) -> Option<&T> {
        self.get(id).as_any().downcast_ref::<T>()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        self.get(id).push_children(&mut children);
        children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Box<dyn TensorFunction>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
}

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: nodes can still be added and rewired.
#[derive(Debug, Clone)]
pub struct Building;

/// Marker: checked and immutable, with a fixed root.
#[derive(Debug, Clone)]
pub struct Frozen {
    root: NodeId,
}

/// Sealed trait for tree states.
pub trait TreeState: fmt::Debug {}
impl TreeState for Building {}
impl TreeState for Frozen {}

// ── Tree ───────────────────────────────────────────────────────────

/// An arena of tensor-function nodes.
#[derive(Debug)]
pub struct Tree<S: TreeState = Building> {
    nodes: Nodes,
    state: S,
}

impl<S: TreeState> Tree<S> {
    pub fn nodes(&self) -> &Nodes {
        &self.nodes
    }

    pub fn get(&self, id: NodeId) -> &dyn TensorFunction {
        self.nodes.get(id)
    }

    pub fn result_type(&self, id: NodeId) -> &ValueType {
        self.nodes.result_type(id)
    }

    /// Nodes reachable from `root`, children before parents. A node shared
    /// by several parents appears once per use.
    pub fn post_order_from(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut todo = vec![(root, false)];
        let mut children = Vec::new();
        while let Some((id, expanded)) = todo.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            todo.push((id, true));
            children.clear();
            self.nodes.get(id).push_children(&mut children);
            todo.extend(children.iter().rev().map(|&c| (c, false)));
        }
        order
    }

    /// Renders the subtree under `id`, one node per line.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.nodes.get(id);
        let _ = writeln!(
            out,
            "{:indent$}{}{} -> {}",
            "",
            node.name(),
            node.dump_details(),
            node.result_type(),
            indent = depth * 2
        );
        for child in self.nodes.children(id) {
            self.dump_into(child, depth + 1, out);
        }
    }
}

impl Default for Tree<Building> {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree<Building> {
    pub fn new() -> Self {
        Self {
            nodes: Nodes::default(),
            state: Building,
        }
    }

    /// Moves `node` into the arena.
    pub fn add<F: TensorFunction>(&mut self, node: F) -> NodeId {
        self.nodes.push(Box::new(node))
    }

    pub fn add_boxed(&mut self, node: Box<dyn TensorFunction>) -> NodeId {
        self.nodes.push(node)
    }

    /// Points `parent`'s references to `old` at `new`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        self.nodes.nodes[parent.index()].replace_child(old, new);
    }

    // ── Builders ───────────────────────────────────────────────────

    pub fn const_value(&mut self, value: Value) -> NodeId {
        self.add(ConstValue::new(value))
    }

    /// A placeholder for evaluation input number `slot`.
    pub fn inject(&mut self, value_type: ValueType, slot: usize) -> NodeId {
        self.add(Inject::new(value_type, slot))
    }

    pub fn join(&mut self, lhs: NodeId, rhs: NodeId, op: BinaryOp) -> NodeId {
        let result_type = ValueType::join(self.result_type(lhs), self.result_type(rhs));
        self.add(Join::new(result_type, lhs, rhs, op))
    }

    /// Reduces `dims` of `child`; an empty list reduces every dimension.
    pub fn reduce(&mut self, child: NodeId, aggr: Aggr, dims: &[&str]) -> NodeId {
        let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
        let result_type = self.result_type(child).reduce(&dims);
        self.add(Reduce::new(result_type, child, aggr, dims))
    }

    pub fn rename(&mut self, child: NodeId, from: &[&str], to: &[&str]) -> NodeId {
        let from: Vec<String> = from.iter().map(|d| d.to_string()).collect();
        let to: Vec<String> = to.iter().map(|d| d.to_string()).collect();
        let result_type = self.result_type(child).rename(&from, &to);
        self.add(Rename::new(result_type, child, from, to))
    }

    pub fn concat(&mut self, lhs: NodeId, rhs: NodeId, dimension: &str) -> NodeId {
        let result_type =
            ValueType::concat(self.result_type(lhs), self.result_type(rhs), dimension);
        self.add(Concat::new(result_type, lhs, rhs, dimension.to_string()))
    }

    pub fn map(&mut self, child: NodeId, op: UnaryOp) -> NodeId {
        let result_type = self.result_type(child).map();
        self.add(Map::new(result_type, child, op))
    }

    pub fn merge(&mut self, lhs: NodeId, rhs: NodeId, op: BinaryOp) -> NodeId {
        let result_type = ValueType::merge(self.result_type(lhs), self.result_type(rhs));
        self.add(Merge::new(result_type, lhs, rhs, op))
    }

    /// Checks every node reachable from `root` and seals the tree.
    pub fn freeze(self, root: NodeId) -> Result<Tree<Frozen>, IrError> {
        for id in self.post_order_from(root) {
            let node = self.nodes.get(id);
            let ty = node.result_type();
            if ty.is_error() || !ty.is_bound() {
                return Err(IrError::InvalidType {
                    node: id.index(),
                    name: node.name(),
                    result_type: ty.to_string(),
                });
            }
        }
        tracing::debug!(root = %root, nodes = self.nodes.len(), "tree frozen");
        Ok(Tree {
            nodes: self.nodes,
            state: Frozen { root },
        })
    }
}

impl Tree<Frozen> {
    pub fn root(&self) -> NodeId {
        self.state.root
    }

    /// Evaluation order of the whole expression.
    pub fn post_order(&self) -> Vec<NodeId> {
        self.post_order_from(self.root())
    }

    pub fn dump_root(&self) -> String {
        self.dump(self.root())
    }
}
