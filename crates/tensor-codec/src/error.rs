// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the binary codec.

/// Errors that can occur while encoding or decoding tensor values.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// The first byte is not a known shape tag.
    #[error("unknown tensor tag {0}")]
    UnknownTag(u8),

    /// The cell-type byte of an extended tag is not a known cell type.
    #[error("unknown cell type byte {0}")]
    UnknownCellType(u8),

    /// The input ended before a complete value was read.
    #[error("truncated input at offset {offset}: need {needed} bytes, {remaining} left")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A label or dimension name is not valid UTF-8.
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// Dimension names are not in canonical (sorted) order.
    #[error("dimension '{0}' is out of canonical order")]
    NonCanonicalDimensions(String),

    /// A dimension name occurs more than once.
    #[error("duplicate dimension '{0}'")]
    DuplicateDimension(String),

    /// An indexed dimension has size 0.
    #[error("indexed dimension '{0}' has size 0")]
    ZeroSizedDimension(String),

    /// The product of the indexed sizes does not fit in memory.
    #[error("dense subspace size overflows")]
    SizeOverflow,

    /// The decoded dimensions or cells do not form a valid value.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A sparse address occurs twice.
    #[error("duplicate address {0}")]
    DuplicateAddress(String),

    /// A value without mapped dimensions declared more than one subspace.
    #[error("{0} subspaces declared for a value without mapped dimensions")]
    TooManySubspaces(usize),

    /// Bytes remain after a complete value.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// A count or size cannot be represented by the variable-length integer.
    #[error("{0} is too large for the wire format")]
    ValueTooLarge(usize),
}
