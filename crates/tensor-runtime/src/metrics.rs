// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Evaluation profiling metrics.
//!
//! [`EvalMetrics`] accumulates timing and scratch usage over the
//! evaluations of one [`EvalContext`](crate::EvalContext).

use eval_arena::AllocationStats;
use std::time::Duration;

/// Aggregate metrics of every evaluation run in one context.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct EvalMetrics {
    /// Completed evaluations, failed ones included.
    pub evaluations: u64,
    /// Evaluations that returned an error.
    pub failures: u64,
    pub total_duration: Duration,
    pub last_duration: Duration,
    pub max_duration: Duration,
    /// Highest number of live scratch bytes during any evaluation.
    pub peak_scratch_bytes: usize,
    /// Scratch requests refused by the arena budget.
    pub budget_failures: u64,
    /// Instructions executed per evaluation.
    pub instructions: usize,
}

impl EvalMetrics {
    /// Creates an empty metrics container for a function of
    /// `instructions` steps.
    pub fn new(instructions: usize) -> Self {
        Self {
            instructions,
            ..Default::default()
        }
    }

    /// Records one evaluation.
    pub fn record(&mut self, duration: Duration, failed: bool, arena: &AllocationStats) {
        self.evaluations += 1;
        if failed {
            self.failures += 1;
        }
        self.total_duration += duration;
        self.last_duration = duration;
        self.max_duration = self.max_duration.max(duration);
        self.peak_scratch_bytes = arena.peak_live_bytes;
        self.budget_failures = arena.budget_failures;
    }

    pub fn mean_duration(&self) -> Duration {
        match u32::try_from(self.evaluations) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_duration / n,
            Err(_) => Duration::from_secs_f64(
                self.total_duration.as_secs_f64() / self.evaluations as f64,
            ),
        }
    }

    /// Returns evaluations per second over the recorded time.
    pub fn evaluations_per_second(&self) -> f64 {
        let secs = self.total_duration.as_secs_f64();
        if secs <= 0.0 || self.evaluations == 0 {
            return 0.0;
        }
        self.evaluations as f64 / secs
    }

    /// Returns a human-readable summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "Evaluation: {} runs ({} failed), {} instructions, \
             {:.3}ms mean, {:.3}ms max, peak scratch {} bytes, \
             {} over budget ({:.1} eval/s)",
            self.evaluations,
            self.failures,
            self.instructions,
            self.mean_duration().as_secs_f64() * 1000.0,
            self.max_duration.as_secs_f64() * 1000.0,
            self.peak_scratch_bytes,
            self.budget_failures,
            self.evaluations_per_second(),
        )
    }
}
