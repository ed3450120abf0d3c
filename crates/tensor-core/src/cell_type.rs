// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor cell types.

use crate::Cells;
use half::bf16;
use std::fmt;

/// Enumerates the numeric types a tensor cell can hold.
///
/// The set is closed: every kernel in the engine is instantiated for each
/// variant and selected once, when an instruction is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CellType {
    /// 64-bit IEEE 754 floating point.
    Double,
    /// 32-bit IEEE 754 floating point.
    Float,
    /// 16-bit brain floating point.
    BFloat16,
    /// 8-bit signed integer holding a float value.
    Int8,
}

impl CellType {
    /// All cell types, in wire-id order.
    pub const ALL: [CellType; 4] = [
        CellType::Double,
        CellType::Float,
        CellType::BFloat16,
        CellType::Int8,
    ];

    /// Returns the size of a single cell in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            CellType::Double => 8,
            CellType::Float => 4,
            CellType::BFloat16 => 2,
            CellType::Int8 => 1,
        }
    }

    /// Returns the name used in type specs (`tensor<float>(x[3])`).
    pub fn as_str(self) -> &'static str {
        match self {
            CellType::Double => "double",
            CellType::Float => "float",
            CellType::BFloat16 => "bfloat16",
            CellType::Int8 => "int8",
        }
    }

    /// Parses a cell type name as it appears in type specs.
    pub fn from_name(name: &str) -> Option<CellType> {
        match name {
            "double" => Some(CellType::Double),
            "float" => Some(CellType::Float),
            "bfloat16" => Some(CellType::BFloat16),
            "int8" => Some(CellType::Int8),
            _ => None,
        }
    }

    /// Identifier used in the binary wire format.
    pub fn wire_id(self) -> u8 {
        match self {
            CellType::Double => 0,
            CellType::Float => 1,
            CellType::BFloat16 => 2,
            CellType::Int8 => 3,
        }
    }

    /// Inverse of [`wire_id`](Self::wire_id); unknown ids yield `None`.
    pub fn from_wire_id(id: u8) -> Option<CellType> {
        match id {
            0 => Some(CellType::Double),
            1 => Some(CellType::Float),
            2 => Some(CellType::BFloat16),
            3 => Some(CellType::Int8),
            _ => None,
        }
    }

    /// Whether native floating-point kernels exist for this type.
    pub fn is_floating(self) -> bool {
        matches!(self, CellType::Double | CellType::Float)
    }

    /// The common type of two inputs whose cells end up in the same value.
    ///
    /// Equal types are kept, `Double` absorbs everything, and any other
    /// combination meets at `Float`.
    pub fn unify(a: CellType, b: CellType) -> CellType {
        if a == b {
            a
        } else if a == CellType::Double || b == CellType::Double {
            CellType::Double
        } else {
            CellType::Float
        }
    }

    /// Storage-only types are widened to `Float` when values are computed.
    pub fn decay(self) -> CellType {
        match self {
            CellType::BFloat16 | CellType::Int8 => CellType::Float,
            other => other,
        }
    }

    /// Cell type of a computed (joined, mapped, reduced) result.
    pub fn join(a: CellType, b: CellType) -> CellType {
        CellType::unify(a, b).decay()
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bridge between Rust scalar types and [`CellType`].
///
/// Kernels are generic over `CellValue` and get instantiated once per cell
/// type; conversions go through `f64`, which represents every supported
/// cell value exactly.
pub trait CellValue: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The cell type this Rust type stores.
    const CELL_TYPE: CellType;

    /// Widens the cell to `f64`.
    fn to_f64(self) -> f64;

    /// Narrows an `f64` to this cell type (rounding or saturating).
    fn from_f64(value: f64) -> Self;

    /// Borrows the typed storage if `cells` holds this type.
    fn slice_of(cells: &Cells) -> Option<&[Self]>;

    /// Wraps a typed vector into [`Cells`].
    fn into_cells(cells: Vec<Self>) -> Cells;
}

impl CellValue for f64 {
    const CELL_TYPE: CellType = CellType::Double;
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }
    fn slice_of(cells: &Cells) -> Option<&[Self]> {
        match cells {
            Cells::Double(v) => Some(v),
            _ => None,
        }
    }
    fn into_cells(cells: Vec<Self>) -> Cells {
        Cells::Double(cells)
    }
}

impl CellValue for f32 {
    const CELL_TYPE: CellType = CellType::Float;
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
    fn slice_of(cells: &Cells) -> Option<&[Self]> {
        match cells {
            Cells::Float(v) => Some(v),
            _ => None,
        }
    }
    fn into_cells(cells: Vec<Self>) -> Cells {
        Cells::Float(cells)
    }
}

impl CellValue for bf16 {
    const CELL_TYPE: CellType = CellType::BFloat16;
    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }
    #[inline]
    fn from_f64(value: f64) -> Self {
        bf16::from_f64(value)
    }
    fn slice_of(cells: &Cells) -> Option<&[Self]> {
        match cells {
            Cells::BFloat16(v) => Some(v),
            _ => None,
        }
    }
    fn into_cells(cells: Vec<Self>) -> Cells {
        Cells::BFloat16(cells)
    }
}

impl CellValue for i8 {
    const CELL_TYPE: CellType = CellType::Int8;
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
    #[inline]
    fn from_f64(value: f64) -> Self {
        // `as` saturates and maps NaN to 0.
        value as i8
    }
    fn slice_of(cells: &Cells) -> Option<&[Self]> {
        match cells {
            Cells::Int8(v) => Some(v),
            _ => None,
        }
    }
    fn into_cells(cells: Vec<Self>) -> Cells {
        Cells::Int8(cells)
    }
}

/// Selects a monomorphized function for a list of run-time cell types.
///
/// The cell types are matched once and the resulting function pointer is
/// stored in a compiled instruction, so hot loops never branch on cell type.
///
/// ```ignore
/// let f = select_cell_fn!(OpFunction; join_op; [lhs_ct, rhs_ct, out_ct]);
/// let g = select_cell_fn!(OpFunction; reduce_op; [in_ct, out_ct]; [SumAggr]);
/// ```
#[macro_export]
macro_rules! select_cell_fn {
    ($fnty:ty; $f:ident; [$($ct:expr),+ $(,)?]) => {
        $crate::select_cell_fn!(@step $fnty; $f; []; [$($ct),+]; [])
    };
    ($fnty:ty; $f:ident; [$($ct:expr),+ $(,)?]; [$($extra:ty),* $(,)?]) => {
        $crate::select_cell_fn!(@step $fnty; $f; []; [$($ct),+]; [$($extra),*])
    };
    (@step $fnty:ty; $f:ident; [$($done:ty),*]; []; [$($extra:ty),*]) => {
        $f::<$($done,)* $($extra),*> as $fnty
    };
    (@step $fnty:ty; $f:ident; [$($done:ty),*]; [$ct:expr $(, $rest:expr)*]; [$($extra:ty),*]) => {
        match $ct {
            $crate::CellType::Double => {
                $crate::select_cell_fn!(@step $fnty; $f; [$($done,)* f64]; [$($rest),*]; [$($extra),*])
            }
            $crate::CellType::Float => {
                $crate::select_cell_fn!(@step $fnty; $f; [$($done,)* f32]; [$($rest),*]; [$($extra),*])
            }
            $crate::CellType::BFloat16 => {
                $crate::select_cell_fn!(@step $fnty; $f; [$($done,)* $crate::bf16]; [$($rest),*]; [$($extra),*])
            }
            $crate::CellType::Int8 => {
                $crate::select_cell_fn!(@step $fnty; $f; [$($done,)* i8]; [$($rest),*]; [$($extra),*])
            }
        }
    };
}
