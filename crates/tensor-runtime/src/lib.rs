// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-runtime
//!
//! Interpreted execution of tensor-function trees.
//!
//! The runtime takes:
//! - A `Tree<Building>` from `tensor-ir` and its root.
//! - An [`EngineConfig`] selecting optimizer passes and the scratch budget.
//!
//! [`prepare`] optimizes, freezes and compiles the tree into an
//! [`InterpretedFunction`]: a flat instruction sequence plus the parameter
//! stash it reads. The function never changes after compilation and is
//! shared across threads; each thread evaluates it through its own
//! [`EvalContext`], which owns the operand stack and scratch arena.
//!
//! # Threading
//! ```text
//!                 ┌─ EvalContext (thread 1) ─▶ Value
//! Arc<Function> ──┼─ EvalContext (thread 2) ─▶ Value
//!                 └─ EvalContext (thread N) ─▶ Value
//! ```
//! Evaluation is synchronous and never blocks.

mod config;
mod context;
mod engine;
mod error;
mod metrics;

pub use config::EngineConfig;
pub use context::EvalContext;
pub use engine::{prepare, InterpretedFunction};
pub use error::RuntimeError;
pub use metrics::EvalMetrics;
