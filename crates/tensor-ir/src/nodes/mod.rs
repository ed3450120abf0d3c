// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Generic node kinds.
//!
//! Each kind computes its result type at construction (through the
//! [`Tree`](crate::Tree) builders) and compiles into one instruction whose
//! kernel is chosen once from the input and output cell types.
//!
//! | Node | Children | Result |
//! |---|---|---|
//! | [`ConstValue`] | - | a fixed value |
//! | [`Inject`] | - | evaluation input `slot` |
//! | [`Join`] | lhs, rhs | `op(l, r)` over matching addresses |
//! | [`Reduce`] | child | aggregate over the removed dimensions |
//! | [`Rename`] | child | same cells under new dimension names |
//! | [`Concat`] | lhs, rhs | lhs then rhs along one indexed dimension |
//! | [`Map`] | child | `op(x)` per cell |
//! | [`Merge`] | lhs, rhs | union of subspaces, `op(l, r)` on overlap |

mod concat;
mod const_value;
mod inject;
mod join;
mod map;
mod merge;
mod reduce;
mod rename;

pub use concat::Concat;
pub use const_value::ConstValue;
pub use inject::Inject;
pub use join::Join;
pub use map::Map;
pub use merge::Merge;
pub use reduce::Reduce;
pub use rename::Rename;
