// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # eval-arena
//!
//! Transient memory for one tensor evaluation.
//!
//! Compiled expressions keep their long-lived data (constants, plans,
//! result types) in a build-time parameter stash. Everything an evaluation
//! needs only while it runs comes from an [`EvalArena`] owned by the
//! evaluating thread.
//!
//! # Key Components
//!
//! - [`MemoryBudget`]: cap on live scratch bytes, parsed from `"64M"` etc.
//! - [`EvalArena`]: hands out zeroed `f64` buffers from size-class free
//!   lists and tracks [`AllocationStats`].
//! - [`ScratchGuard`]: RAII handle that returns its buffer on drop.
//!
//! # Example
//! ```
//! use eval_arena::{EvalArena, MemoryBudget};
//!
//! let arena = EvalArena::new(MemoryBudget::from_mb(1));
//! let mut acc = arena.alloc_f64(16).unwrap();
//! acc[3] += 1.5;
//! assert_eq!(arena.allocated_bytes(), 128);
//! drop(acc);
//! arena.reset();
//! assert_eq!(arena.allocated_bytes(), 0);
//! ```

mod arena;
mod budget;
mod error;
mod stats;

pub use arena::{EvalArena, ScratchGuard};
pub use budget::MemoryBudget;
pub use error::ArenaError;
pub use stats::AllocationStats;
