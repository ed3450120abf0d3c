// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scalar operators, aggregators and native dense kernels.
//!
//! Operators are closed enums resolved to plain function pointers (or to
//! statically dispatched aggregator types) when an instruction is compiled,
//! so the per-cell loops in the interpreter never match on an operator.

mod aggr;
mod binary;
pub mod linalg;
mod unary;

pub use aggr::{
    Aggr, Aggregator, AvgAggr, CountAggr, MaxAggr, MedianAggr, MinAggr, ProdAggr, SumAggr,
};
pub use binary::BinaryOp;
pub use unary::UnaryOp;
