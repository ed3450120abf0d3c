// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Type system and value model for dense, sparse and mixed tensors.
//!
//! This crate provides:
//! - [`CellType`]: the closed set of cell encodings (double, float,
//!   bfloat16, int8) and the [`CellValue`] bridge to Rust scalar types.
//! - [`ValueType`]: tensor type descriptors with the pure type algebra
//!   (`join`, `merge`, `reduce`, `rename`, `concat`, `map`).
//! - [`Value`]: immutable tensor values built through [`ValueBuilder`],
//!   indexed by an [`AddressMap`] of interned labels.
//! - [`TensorSpec`]: an order-independent reference form for tests and
//!   fixtures.
//! - Scalar operators ([`BinaryOp`], [`UnaryOp`]), aggregators ([`Aggr`])
//!   and native dense kernels ([`ops::linalg`]).
//!
//! # Design Goals
//! - Type errors are values, not panics: incompatible shapes produce the
//!   error type.
//! - Cell-type dispatch happens once per kernel through [`select_cell_fn!`].
//! - Clean error types via `thiserror`.

mod address_map;
mod cell_type;
mod error;
mod label;
pub mod ops;
mod spec;
mod type_spec;
mod value;
mod value_type;

pub use address_map::{AddressMap, View};
pub use cell_type::{CellType, CellValue};
pub use error::TensorError;
pub use label::{LabelHandle, LabelId, LabelRepo};
pub use ops::{
    Aggr, Aggregator, AvgAggr, BinaryOp, CountAggr, MaxAggr, MedianAggr, MinAggr, ProdAggr,
    SumAggr, UnaryOp,
};
pub use spec::{Address, Label, TensorSpec};
pub use value::{Cells, Value, ValueBuilder, ValueView};
pub use value_type::{DimKind, Dimension, ValueType};

pub use half::bf16;
