// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tree construction and instruction execution.

/// Errors that can occur when freezing a tree or running its instructions.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A node reachable from the root has an error or unbound result type.
    #[error("node #{node} ({name}) has unusable result type {result_type}")]
    InvalidType {
        node: usize,
        name: &'static str,
        result_type: String,
    },

    /// Execution finished with other than exactly one operand on the stack.
    #[error("evaluation finished with {depth} operands on the stack")]
    StackImbalance { depth: usize },
}
