// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reduce aggregators.
//!
//! [`Aggr`] names an aggregator at the IR level; each variant has a matching
//! [`Aggregator`] state type so reduce kernels can be instantiated per
//! aggregator and dispatched once at compile time.

use std::fmt;

/// Aggregation function of a reduce node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Aggr {
    Avg,
    Count,
    Prod,
    Sum,
    Max,
    Median,
    Min,
}

impl Aggr {
    pub const ALL: [Aggr; 7] = [
        Aggr::Avg,
        Aggr::Count,
        Aggr::Prod,
        Aggr::Sum,
        Aggr::Max,
        Aggr::Median,
        Aggr::Min,
    ];

    /// Aggregating a single value yields that value.
    pub fn is_ident(self) -> bool {
        !matches!(self, Aggr::Count)
    }

    /// Aggregates `values` (0 when empty).
    pub fn apply(self, values: impl IntoIterator<Item = f64>) -> f64 {
        fn run<A: Aggregator>(values: impl IntoIterator<Item = f64>) -> f64 {
            let mut aggr = A::default();
            for v in values {
                aggr.sample(v);
            }
            aggr.result()
        }
        match self {
            Aggr::Avg => run::<AvgAggr>(values),
            Aggr::Count => run::<CountAggr>(values),
            Aggr::Prod => run::<ProdAggr>(values),
            Aggr::Sum => run::<SumAggr>(values),
            Aggr::Max => run::<MaxAggr>(values),
            Aggr::Median => run::<MedianAggr>(values),
            Aggr::Min => run::<MinAggr>(values),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Aggr::Avg => "avg",
            Aggr::Count => "count",
            Aggr::Prod => "prod",
            Aggr::Sum => "sum",
            Aggr::Max => "max",
            Aggr::Median => "median",
            Aggr::Min => "min",
        }
    }
}

impl fmt::Display for Aggr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Running state of one aggregation.
pub trait Aggregator: Default + Send + 'static {
    const AGGR: Aggr;

    fn sample(&mut self, value: f64);

    /// Final value; 0 if nothing was sampled.
    fn result(&self) -> f64;
}

#[derive(Debug, Default)]
pub struct SumAggr(f64);

impl Aggregator for SumAggr {
    const AGGR: Aggr = Aggr::Sum;
    #[inline]
    fn sample(&mut self, value: f64) {
        self.0 += value;
    }
    fn result(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct CountAggr(u64);

impl Aggregator for CountAggr {
    const AGGR: Aggr = Aggr::Count;
    #[inline]
    fn sample(&mut self, _value: f64) {
        self.0 += 1;
    }
    fn result(&self) -> f64 {
        self.0 as f64
    }
}

#[derive(Debug, Default)]
pub struct AvgAggr {
    sum: f64,
    count: u64,
}

impl Aggregator for AvgAggr {
    const AGGR: Aggr = Aggr::Avg;
    #[inline]
    fn sample(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }
    fn result(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct ProdAggr(Option<f64>);

impl Aggregator for ProdAggr {
    const AGGR: Aggr = Aggr::Prod;
    #[inline]
    fn sample(&mut self, value: f64) {
        self.0 = Some(self.0.map_or(value, |p| p * value));
    }
    fn result(&self) -> f64 {
        self.0.unwrap_or(0.0)
    }
}

#[derive(Debug, Default)]
pub struct MaxAggr(Option<f64>);

impl Aggregator for MaxAggr {
    const AGGR: Aggr = Aggr::Max;
    #[inline]
    fn sample(&mut self, value: f64) {
        self.0 = Some(self.0.map_or(value, |m| m.max(value)));
    }
    fn result(&self) -> f64 {
        self.0.unwrap_or(0.0)
    }
}

#[derive(Debug, Default)]
pub struct MinAggr(Option<f64>);

impl Aggregator for MinAggr {
    const AGGR: Aggr = Aggr::Min;
    #[inline]
    fn sample(&mut self, value: f64) {
        self.0 = Some(self.0.map_or(value, |m| m.min(value)));
    }
    fn result(&self) -> f64 {
        self.0.unwrap_or(0.0)
    }
}

/// Median; the mean of the two middle values for an even count, NaN if any
/// sample is NaN.
#[derive(Debug, Default)]
pub struct MedianAggr(Vec<f64>);

impl Aggregator for MedianAggr {
    const AGGR: Aggr = Aggr::Median;
    fn sample(&mut self, value: f64) {
        self.0.push(value);
    }
    fn result(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        if self.0.iter().any(|v| v.is_nan()) {
            return f64::NAN;
        }
        let mut sorted = self.0.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            sorted[mid]
        } else {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        }
    }
}

/// Expands `$body` once per aggregator with `$A` bound to the matching
/// [`Aggregator`] type.
///
/// ```ignore
/// let f = dispatch_aggr!(aggr, A => select_cell_fn!(OpFn; reduce_op; [ict, oct]; [A]));
/// ```
#[macro_export]
macro_rules! dispatch_aggr {
    ($aggr:expr, $A:ident => $body:expr) => {
        match $aggr {
            $crate::Aggr::Avg => {
                type $A = $crate::AvgAggr;
                $body
            }
            $crate::Aggr::Count => {
                type $A = $crate::CountAggr;
                $body
            }
            $crate::Aggr::Prod => {
                type $A = $crate::ProdAggr;
                $body
            }
            $crate::Aggr::Sum => {
                type $A = $crate::SumAggr;
                $body
            }
            $crate::Aggr::Max => {
                type $A = $crate::MaxAggr;
                $body
            }
            $crate::Aggr::Median => {
                type $A = $crate::MedianAggr;
                $body
            }
            $crate::Aggr::Min => {
                type $A = $crate::MinAggr;
                $body
            }
        }
    };
}
