// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise unary operators.

use std::fmt;

/// Unary operator applied by map nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Neg,
    Abs,
    Exp,
    Log,
    Sqrt,
    Square,
    Relu,
    Sigmoid,
    /// 1 for zero, 0 otherwise.
    Not,
}

impl UnaryOp {
    pub fn function(self) -> fn(f64) -> f64 {
        match self {
            UnaryOp::Neg => |a| -a,
            UnaryOp::Abs => f64::abs,
            UnaryOp::Exp => f64::exp,
            UnaryOp::Log => f64::ln,
            UnaryOp::Sqrt => f64::sqrt,
            UnaryOp::Square => |a| a * a,
            UnaryOp::Relu => |a| a.max(0.0),
            UnaryOp::Sigmoid => |a| 1.0 / (1.0 + (-a).exp()),
            UnaryOp::Not => |a| f64::from(u8::from(a == 0.0)),
        }
    }

    #[inline]
    pub fn apply(self, a: f64) -> f64 {
        (self.function())(a)
    }

    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Abs => "abs",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Square => "square",
            UnaryOp::Relu => "relu",
            UnaryOp::Sigmoid => "sigmoid",
            UnaryOp::Not => "not",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
