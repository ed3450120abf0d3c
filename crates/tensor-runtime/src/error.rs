// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for compiling and evaluating tensor functions.

/// Errors that can occur while preparing or evaluating a function.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Freezing the tree or running its instructions failed.
    #[error("tensor function error: {0}")]
    Ir(#[from] tensor_ir::IrError),

    /// The configured pass list could not be resolved.
    #[error("optimizer error: {0}")]
    Optimizer(#[from] tensor_optimizer::OptimizerError),

    /// Encoded inputs or results could not be converted.
    #[error("codec error: {0}")]
    Codec(#[from] tensor_codec::CodecError),

    /// The same input slot is injected with two different types.
    #[error("input slot {slot} is injected as both {first} and {second}")]
    ConflictingInput {
        slot: usize,
        first: String,
        second: String,
    },

    /// Evaluation was called with the wrong number of inputs.
    #[error("expected {expected} inputs, got {actual}")]
    InputCount { expected: usize, actual: usize },

    /// An input value does not have the type its slot was compiled for.
    #[error("input {slot} has type {actual}, expected {expected}")]
    InputType {
        slot: usize,
        expected: String,
        actual: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
