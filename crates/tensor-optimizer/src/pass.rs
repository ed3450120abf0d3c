// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`OptimizePass`] trait.

use tensor_ir::{Building, NodeId, Tree};

/// A rewrite rule applied to one node at a time.
///
/// `optimize` inspects `node` (whose children are already optimized) and
/// either returns it unchanged or adds a replacement to `tree` and returns
/// the new id. A replacement has exactly the same result type and reads
/// the same inputs; it only computes the value more cheaply.
///
/// Passes never fail. If any structural precondition is missing the pass
/// does nothing.
pub trait OptimizePass: Send + Sync {
    /// Name used in configuration and logs.
    fn name(&self) -> &'static str;

    fn optimize(&self, node: NodeId, tree: &mut Tree<Building>) -> NodeId;
}
