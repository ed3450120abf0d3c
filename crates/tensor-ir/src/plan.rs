// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compile-time traversal plans shared by the kernels.
//!
//! A [`StridedLoop`] walks a dense block in row-major order while tracking
//! one offset per operand; adjacent loops that are contiguous for every
//! operand are fused into one `(count, stride)` pair when the plan is
//! built. A [`SparseJoinPlan`] describes how two addresses are matched on
//! their shared mapped dimensions and how the output address is assembled.

use tensor_core::{AddressMap, CellValue, LabelId, Value, ValueType};

/// Row-major traversal with `N` parallel offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StridedLoop<const N: usize> {
    loops: Vec<(usize, [usize; N])>,
}

impl<const N: usize> StridedLoop<N> {
    /// Builds a loop nest from `(size, strides)` pairs, outermost first.
    /// Size-1 loops are dropped and contiguous neighbours fused.
    pub fn new(dims: impl IntoIterator<Item = (usize, [usize; N])>) -> Self {
        let mut loops: Vec<(usize, [usize; N])> = Vec::new();
        for (size, strides) in dims {
            if size == 1 {
                continue;
            }
            if let Some(outer) = loops.last_mut() {
                if (0..N).all(|k| outer.1[k] == strides[k] * size) {
                    *outer = (outer.0 * size, strides);
                    continue;
                }
            }
            loops.push((size, strides));
        }
        Self { loops }
    }

    /// The `(count, strides)` pairs after fusion.
    pub fn loops(&self) -> &[(usize, [usize; N])] {
        &self.loops
    }

    /// Number of visited positions.
    pub fn count(&self) -> usize {
        self.loops.iter().map(|&(size, _)| size).product()
    }

    /// Calls `f` with the offsets of every position, in row-major order.
    pub fn for_each(&self, mut f: impl FnMut([usize; N])) {
        let Some((&(inner_size, inner_strides), outer)) = self.loops.split_last() else {
            f([0; N]);
            return;
        };
        let mut counters = vec![0usize; outer.len()];
        let mut base = [0usize; N];
        loop {
            let mut offsets = base;
            for _ in 0..inner_size {
                f(offsets);
                for k in 0..N {
                    offsets[k] += inner_strides[k];
                }
            }
            // Advance the outer odometer.
            let mut dim = outer.len();
            loop {
                if dim == 0 {
                    return;
                }
                dim -= 1;
                let (size, strides) = outer[dim];
                counters[dim] += 1;
                for k in 0..N {
                    base[k] += strides[k];
                }
                if counters[dim] < size {
                    break;
                }
                for k in 0..N {
                    base[k] -= strides[k] * size;
                }
                counters[dim] = 0;
            }
        }
    }
}

/// Row-major stride of the indexed dimension `name` in `ty`, if present.
pub fn indexed_stride(ty: &ValueType, name: &str) -> Option<usize> {
    ty.indexed_dimensions()
        .position(|d| d.name == name)
        .map(|pos| ty.dense_strides()[pos])
}

/// Where one output address label comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    Lhs(usize),
    Rhs(usize),
}

/// Matching of two sparse indexes on their shared mapped dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseJoinPlan {
    /// Positions of the shared dimensions in the lhs address.
    pub lhs_overlap: Vec<usize>,
    /// Positions of the same dimensions in the rhs address.
    pub rhs_overlap: Vec<usize>,
    /// One source per mapped dimension of the output.
    pub sources: Vec<LabelSource>,
}

impl SparseJoinPlan {
    pub fn new(lhs: &ValueType, rhs: &ValueType, out: &ValueType) -> Self {
        let lhs_names = lhs.mapped_dimension_names();
        let rhs_names = rhs.mapped_dimension_names();
        let mut lhs_overlap = Vec::new();
        let mut rhs_overlap = Vec::new();
        for (i, name) in lhs_names.iter().enumerate() {
            if let Some(j) = rhs_names.iter().position(|n| n == name) {
                lhs_overlap.push(i);
                rhs_overlap.push(j);
            }
        }
        let sources = out
            .mapped_dimension_names()
            .iter()
            .filter_map(|name| {
                lhs_names
                    .iter()
                    .position(|n| n == name)
                    .map(LabelSource::Lhs)
                    .or_else(|| rhs_names.iter().position(|n| n == name).map(LabelSource::Rhs))
            })
            .collect();
        Self {
            lhs_overlap,
            rhs_overlap,
            sources,
        }
    }

    /// Calls `f(lhs_subspace, rhs_subspace, output_address)` for every pair
    /// of subspaces that agree on the shared dimensions, in lhs order.
    pub fn for_each_match(
        &self,
        lhs: &AddressMap,
        rhs: &AddressMap,
        mut f: impl FnMut(usize, usize, &[LabelId]),
    ) {
        let rhs_view = rhs.view(&self.rhs_overlap);
        let mut key = Vec::with_capacity(self.lhs_overlap.len());
        let mut address = Vec::with_capacity(self.sources.len());
        for (l, lhs_address) in lhs.iter() {
            key.clear();
            key.extend(self.lhs_overlap.iter().map(|&d| lhs_address[d]));
            for &r in rhs_view.lookup(&key) {
                let rhs_address = rhs.address(r);
                address.clear();
                address.extend(self.sources.iter().map(|source| match *source {
                    LabelSource::Lhs(d) => lhs_address[d],
                    LabelSource::Rhs(d) => rhs_address[d],
                }));
                f(l, r, &address);
            }
        }
    }
}

/// Wraps kernel output into a value of the node's result type.
///
/// Kernels are selected from the result type and frozen trees only carry
/// concrete types, so assembly cannot fail for a compiled program.
pub fn finish_value<T: CellValue>(result_type: &ValueType, cells: Vec<T>, index: AddressMap) -> Value {
    match Value::from_parts(result_type.clone(), T::into_cells(cells), index) {
        Ok(value) => value,
        Err(err) => unreachable!("kernel produced an invalid {result_type}: {err}"),
    }
}

/// Converts one block of cells into another cell type.
#[inline]
pub fn convert_into<I: CellValue, O: CellValue>(src: &[I], dst: &mut [O]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = O::from_f64(s.to_f64());
    }
}
