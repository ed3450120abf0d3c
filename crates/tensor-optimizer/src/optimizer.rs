// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The bottom-up driver that runs passes over a tree.

use crate::passes;
use crate::{OptimizePass, OptimizerError};
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use tensor_ir::{Building, NodeId, Tree};

/// Rewrites performed by one optimizer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    /// `(pass name, rewrites)` in pass order.
    pub rewrites: Vec<(&'static str, usize)>,
    /// Distinct nodes visited.
    pub nodes_visited: usize,
}

impl OptimizeReport {
    /// Rewrites performed by the named pass.
    pub fn count(&self, pass: &str) -> usize {
        self.rewrites
            .iter()
            .find(|(name, _)| *name == pass)
            .map_or(0, |&(_, count)| count)
    }

    pub fn total(&self) -> usize {
        self.rewrites.iter().map(|&(_, count)| count).sum()
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "Optimizer: {} rewrite(s) over {} node(s)\n",
            self.total(),
            self.nodes_visited
        );
        for (name, count) in self.rewrites.iter().filter(|(_, count)| *count > 0) {
            let _ = writeln!(s, "  {name:<28} {count}");
        }
        s
    }
}

/// An ordered list of passes.
///
/// Nodes are visited children first. Every pass is offered the current
/// node in turn, so a later pass sees the replacement an earlier pass
/// produced. A node shared by several parents is optimized once.
pub struct Optimizer {
    passes: Vec<Box<dyn OptimizePass>>,
}

impl Optimizer {
    /// An optimizer without passes; [`optimize`](Self::optimize) is a no-op.
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Every built-in pass, in the default order.
    pub fn with_default_passes() -> Self {
        Self {
            passes: passes::default_passes(),
        }
    }

    /// Built-in passes by name, in the order given. An empty list selects
    /// every pass.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, OptimizerError> {
        if names.is_empty() {
            return Ok(Self::with_default_passes());
        }
        let mut optimizer = Self::new();
        for name in names {
            let name = name.as_ref();
            if optimizer.passes.iter().any(|p| p.name() == name) {
                return Err(OptimizerError::DuplicatePass(name.to_string()));
            }
            let pass = passes::by_name(name).ok_or_else(|| OptimizerError::UnknownPass {
                name: name.to_string(),
                known: passes::NAMES.join(", "),
            })?;
            optimizer.passes.push(pass);
        }
        Ok(optimizer)
    }

    /// Appends a pass.
    pub fn with_pass(mut self, pass: Box<dyn OptimizePass>) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Optimizes the expression under `root` and returns the new root.
    pub fn optimize(&self, tree: &mut Tree<Building>, root: NodeId) -> NodeId {
        self.optimize_with_report(tree, root).0
    }

    pub fn optimize_with_report(
        &self,
        tree: &mut Tree<Building>,
        root: NodeId,
    ) -> (NodeId, OptimizeReport) {
        let mut report = OptimizeReport {
            rewrites: self.passes.iter().map(|p| (p.name(), 0)).collect(),
            nodes_visited: 0,
        };
        let mut done: HashMap<NodeId, NodeId> = HashMap::new();
        let mut todo = vec![(root, false)];
        while let Some((id, expanded)) = todo.pop() {
            if done.contains_key(&id) {
                continue;
            }
            let children = tree.nodes().children(id);
            if !expanded {
                todo.push((id, true));
                todo.extend(children.iter().rev().map(|&c| (c, false)));
                continue;
            }
            for child in children {
                let optimized = done.get(&child).copied().unwrap_or(child);
                if optimized != child {
                    tree.replace_child(id, child, optimized);
                }
            }
            let optimized = self.rewrite(id, tree, &mut report);
            report.nodes_visited += 1;
            done.insert(id, optimized);
        }

        let new_root = done.get(&root).copied().unwrap_or(root);
        tracing::debug!(
            rewrites = report.total(),
            nodes = report.nodes_visited,
            "optimizer finished"
        );
        (new_root, report)
    }

    fn rewrite(&self, node: NodeId, tree: &mut Tree<Building>, report: &mut OptimizeReport) -> NodeId {
        let mut current = node;
        for (pass, (_, count)) in self.passes.iter().zip(report.rewrites.iter_mut()) {
            let next = pass.optimize(current, tree);
            if next == current {
                continue;
            }
            debug_assert_eq!(tree.result_type(next), tree.result_type(current));
            tracing::debug!(
                pass = pass.name(),
                from = %current,
                to = %next,
                node = tree.get(next).name(),
                "rewrite"
            );
            *count += 1;
            current = next;
        }
        current
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::with_default_passes()
    }
}

impl fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Optimizer")
            .field("passes", &self.pass_names())
            .finish()
    }
}
