// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the optimizer.

/// Errors raised while configuring an [`crate::Optimizer`].
///
/// Running the optimizer never fails: a pass that does not match leaves
/// the tree unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptimizerError {
    /// No built-in pass has this name.
    #[error("unknown optimizer pass '{name}' (known: {known})")]
    UnknownPass { name: String, known: String },

    /// The same pass was listed more than once.
    #[error("optimizer pass '{0}' listed twice")]
    DuplicatePass(String),
}
