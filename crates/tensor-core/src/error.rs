// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for value construction.
//!
//! Type-algebra failures are not errors: they produce the error type
//! (see [`ValueType::is_error`](crate::ValueType::is_error)).

use crate::CellType;

/// Errors that can occur while building values or parsing specs.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// A type spec string could not be parsed.
    #[error("invalid type spec '{spec}': {detail}")]
    InvalidTypeSpec { spec: String, detail: String },

    /// Values can only be built for valid, fully bound types.
    #[error("cannot build a value of type {0}")]
    UnbuildableType(String),

    /// The builder's cell type does not match the value type.
    #[error("cell type mismatch: type has {expected}, builder writes {actual}")]
    CellTypeMismatch { expected: CellType, actual: CellType },

    /// An address has the wrong number of labels.
    #[error("address has {actual} labels, type has {expected} mapped dimensions")]
    AddressLength { expected: usize, actual: usize },

    /// A cell address does not fit the type.
    #[error("invalid address {address}: {detail}")]
    InvalidAddress { address: String, detail: String },

    /// The cell buffer does not match the type and index.
    #[error("value has {actual} cells, expected {expected}")]
    CellCountMismatch { expected: usize, actual: usize },
}
