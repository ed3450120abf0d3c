// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise binary operators.

use std::fmt;

/// Binary operator applied cell by cell in joins and merges.
///
/// All operators are total: division by zero and similar cases follow IEEE
/// semantics instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Min,
    Max,
    /// Number of differing bits between the two values taken as `i8`.
    Hamming,
    Equal,
    Less,
    Greater,
    Atan2,
}

impl BinaryOp {
    /// Plain function implementing the operator.
    pub fn function(self) -> fn(f64, f64) -> f64 {
        match self {
            BinaryOp::Add => |a, b| a + b,
            BinaryOp::Sub => |a, b| a - b,
            BinaryOp::Mul => |a, b| a * b,
            BinaryOp::Div => |a, b| a / b,
            BinaryOp::Mod => |a, b| a % b,
            BinaryOp::Pow => f64::powf,
            BinaryOp::Min => f64::min,
            BinaryOp::Max => f64::max,
            BinaryOp::Hamming => hamming,
            BinaryOp::Equal => |a, b| f64::from(u8::from(a == b)),
            BinaryOp::Less => |a, b| f64::from(u8::from(a < b)),
            BinaryOp::Greater => |a, b| f64::from(u8::from(a > b)),
            BinaryOp::Atan2 => f64::atan2,
        }
    }

    /// Applies the operator to one pair of cells.
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        (self.function())(a, b)
    }

    /// `op(a, b) == op(b, a)` for all inputs.
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Mul
                | BinaryOp::Min
                | BinaryOp::Max
                | BinaryOp::Hamming
                | BinaryOp::Equal
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Pow => "pow",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
            BinaryOp::Hamming => "hamming",
            BinaryOp::Equal => "equal",
            BinaryOp::Less => "less",
            BinaryOp::Greater => "greater",
            BinaryOp::Atan2 => "atan2",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn hamming(a: f64, b: f64) -> f64 {
    let x = (a as i8) as u8;
    let y = (b as i8) as u8;
    (x ^ y).count_ones() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        assert_eq!(BinaryOp::Add.apply(2.0, 3.0), 5.0);
        assert_eq!(BinaryOp::Sub.apply(2.0, 3.0), -1.0);
        assert_eq!(BinaryOp::Mul.apply(2.0, 3.0), 6.0);
        assert_eq!(BinaryOp::Div.apply(3.0, 2.0), 1.5);
        assert_eq!(BinaryOp::Mod.apply(7.0, 4.0), 3.0);
        assert_eq!(BinaryOp::Pow.apply(2.0, 10.0), 1024.0);
    }

    #[test]
    fn test_division_by_zero_is_ieee() {
        assert_eq!(BinaryOp::Div.apply(1.0, 0.0), f64::INFINITY);
        assert!(BinaryOp::Div.apply(0.0, 0.0).is_nan());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(BinaryOp::Equal.apply(1.0, 1.0), 1.0);
        assert_eq!(BinaryOp::Less.apply(1.0, 2.0), 1.0);
        assert_eq!(BinaryOp::Greater.apply(1.0, 2.0), 0.0);
        assert_eq!(BinaryOp::Min.apply(1.0, 2.0), 1.0);
        assert_eq!(BinaryOp::Max.apply(1.0, 2.0), 2.0);
    }

    #[test]
    fn test_hamming() {
        assert_eq!(BinaryOp::Hamming.apply(0.0, 0.0), 0.0);
        assert_eq!(BinaryOp::Hamming.apply(1.0, 2.0), 2.0);
        // -1 as i8 is all ones.
        assert_eq!(BinaryOp::Hamming.apply(-1.0, 0.0), 8.0);
    }

    #[test]
    fn test_commutative_ops_commute() {
        let pairs = [(1.5, -2.0), (0.0, 3.0), (7.0, 7.0), (-5.0, 12.0)];
        for op in [
            BinaryOp::Add,
            BinaryOp::Mul,
            BinaryOp::Min,
            BinaryOp::Max,
            BinaryOp::Hamming,
            BinaryOp::Equal,
        ] {
            assert!(op.is_commutative());
            for (a, b) in pairs {
                assert_eq!(op.apply(a, b), op.apply(b, a), "{op}");
            }
        }
    }
}
