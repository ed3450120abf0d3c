// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the evaluation arena.

/// Errors that can occur while allocating scratch memory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// The allocation would push live scratch memory past the budget.
    #[error("arena budget exceeded: requested {requested_bytes} bytes with {live_bytes} live (budget: {budget_bytes})")]
    OutOfBudget {
        requested_bytes: usize,
        live_bytes: usize,
        budget_bytes: usize,
    },

    /// Zero-length scratch buffers are never handed out.
    #[error("cannot allocate an empty scratch buffer")]
    ZeroSized,

    /// A budget string could not be parsed.
    #[error("invalid arena budget '{0}': expected a positive number with an optional K, M or G suffix")]
    InvalidBudget(String),
}
