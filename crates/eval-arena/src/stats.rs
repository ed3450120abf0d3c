// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arena usage counters.

/// Cumulative counters of one [`EvalArena`](crate::EvalArena).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AllocationStats {
    /// Successful scratch allocations.
    pub allocations: u64,
    /// Allocations served from a recycled buffer.
    pub reused: u64,
    /// Allocations that were refused by the budget.
    pub budget_failures: u64,
    /// Highest number of live scratch bytes seen.
    pub peak_live_bytes: usize,
    /// Number of arena resets (one per evaluation).
    pub resets: u64,
}

impl AllocationStats {
    /// Fraction of allocations served without touching the heap.
    pub fn reuse_ratio(&self) -> f64 {
        if self.allocations == 0 {
            0.0
        } else {
            self.reused as f64 / self.allocations as f64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} scratch allocations ({:.0}% reused), {} over budget, peak {} bytes, {} resets",
            self.allocations,
            self.reuse_ratio() * 100.0,
            self.budget_failures,
            self.peak_live_bytes,
            self.resets,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_ratio() {
        let mut stats = AllocationStats::default();
        assert_eq!(stats.reuse_ratio(), 0.0);
        stats.allocations = 4;
        stats.reused = 3;
        assert_eq!(stats.reuse_ratio(), 0.75);
        assert!(stats.summary().starts_with("4 scratch allocations (75% reused)"));
    }
}
