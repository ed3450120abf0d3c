// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Single-threaded scratch arena.
//!
//! Each evaluation context owns one [`EvalArena`]. Kernels borrow zeroed
//! `f64` buffers from it for accumulators and intermediate rows; a
//! [`ScratchGuard`] hands its buffer back to the size-class free list when
//! dropped, so steady-state evaluation does not touch the heap for scratch
//! space.

use crate::{AllocationStats, ArenaError, MemoryBudget};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// Smallest size class, in cells.
const MIN_CLASS_CELLS: usize = 64;

const CELL_BYTES: usize = std::mem::size_of::<f64>();

fn size_class(len: usize) -> usize {
    len.max(MIN_CLASS_CELLS).next_power_of_two()
}

struct ArenaInner {
    budget: MemoryBudget,
    live_bytes: Cell<usize>,
    free: RefCell<HashMap<usize, Vec<Vec<f64>>>>,
    cached_bytes: Cell<usize>,
    stats: RefCell<AllocationStats>,
}

impl ArenaInner {
    fn give_back(&self, buffer: Vec<f64>, class: usize) {
        self.live_bytes
            .set(self.live_bytes.get() - buffer.len() * CELL_BYTES);
        self.cached_bytes
            .set(self.cached_bytes.get() + class * CELL_BYTES);
        self.free.borrow_mut().entry(class).or_default().push(buffer);
    }
}

/// Per-evaluation scratch allocator. Not `Send`: one arena per thread.
pub struct EvalArena {
    inner: Rc<ArenaInner>,
}

impl EvalArena {
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            inner: Rc::new(ArenaInner {
                budget,
                live_bytes: Cell::new(0),
                free: RefCell::new(HashMap::new()),
                cached_bytes: Cell::new(0),
                stats: RefCell::new(AllocationStats::default()),
            }),
        }
    }

    pub fn budget(&self) -> MemoryBudget {
        self.inner.budget
    }

    /// Borrows a zero-filled buffer of `len` cells.
    pub fn alloc_f64(&self, len: usize) -> Result<ScratchGuard, ArenaError> {
        if len == 0 {
            return Err(ArenaError::ZeroSized);
        }
        let inner = &self.inner;
        let requested_bytes = len.saturating_mul(CELL_BYTES);
        let live = inner.live_bytes.get();
        let budget_bytes = inner.budget.as_bytes();
        if requested_bytes > budget_bytes.saturating_sub(live) {
            inner.stats.borrow_mut().budget_failures += 1;
            tracing::warn!(
                requested_bytes,
                live_bytes = live,
                budget = %inner.budget,
                "evaluation arena budget exceeded"
            );
            return Err(ArenaError::OutOfBudget {
                requested_bytes,
                live_bytes: live,
                budget_bytes,
            });
        }

        let class = size_class(len);
        let recycled = inner
            .free
            .borrow_mut()
            .get_mut(&class)
            .and_then(|buffers| buffers.pop());
        let mut stats = inner.stats.borrow_mut();
        let data = match recycled {
            Some(mut buffer) => {
                inner
                    .cached_bytes
                    .set(inner.cached_bytes.get() - class * CELL_BYTES);
                buffer.clear();
                buffer.resize(len, 0.0);
                stats.reused += 1;
                buffer
            }
            None => {
                let mut buffer = Vec::with_capacity(class);
                buffer.resize(len, 0.0);
                buffer
            }
        };
        stats.allocations += 1;
        inner.live_bytes.set(live + requested_bytes);
        stats.peak_live_bytes = stats.peak_live_bytes.max(live + requested_bytes);

        Ok(ScratchGuard {
            data,
            class,
            arena: Some(Rc::clone(inner)),
        })
    }

    /// Bytes currently held by live guards.
    pub fn allocated_bytes(&self) -> usize {
        self.inner.live_bytes.get()
    }

    /// Bytes parked in the free lists.
    pub fn cached_bytes(&self) -> usize {
        self.inner.cached_bytes.get()
    }

    /// Marks the end of an evaluation. Cached buffers beyond the budget are
    /// released.
    pub fn reset(&self) {
        let inner = &self.inner;
        inner.stats.borrow_mut().resets += 1;
        if inner.live_bytes.get() != 0 {
            tracing::debug!(
                live_bytes = inner.live_bytes.get(),
                "scratch buffers still alive at arena reset"
            );
        }
        if inner.cached_bytes.get() > inner.budget.as_bytes() {
            inner.free.borrow_mut().clear();
            inner.cached_bytes.set(0);
        }
    }

    pub fn stats(&self) -> AllocationStats {
        self.inner.stats.borrow().clone()
    }
}

impl Default for EvalArena {
    fn default() -> Self {
        Self::new(MemoryBudget::default())
    }
}

impl fmt::Debug for EvalArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalArena")
            .field("budget", &self.inner.budget)
            .field("allocated_bytes", &self.allocated_bytes())
            .field("cached_bytes", &self.cached_bytes())
            .finish()
    }
}

/// A scratch buffer that returns to its arena on drop.
pub struct ScratchGuard {
    data: Vec<f64>,
    class: usize,
    arena: Option<Rc<ArenaInner>>,
}

impl ScratchGuard {
    /// A heap buffer outside any arena, used when the budget refuses a
    /// request.
    pub fn detached(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
            class: 0,
            arena: None,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.arena.is_none()
    }
}

impl Deref for ScratchGuard {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.data
    }
}

impl DerefMut for ScratchGuard {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if let Some(arena) = self.arena.take() {
            arena.give_back(std::mem::take(&mut self.data), self.class);
        }
    }
}

impl fmt::Debug for ScratchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchGuard")
            .field("len", &self.data.len())
            .field("detached", &self.is_detached())
            .finish()
    }
}
