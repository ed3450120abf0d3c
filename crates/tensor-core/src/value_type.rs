// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor type descriptors and the type algebra.
//!
//! A [`ValueType`] is either a cell type plus an ordered list of
//! [`Dimension`]s, or the error type. Type operations never fail loudly:
//! incompatible inputs produce the error type so callers can check
//! [`ValueType::is_error`] once at the end.
//!
//! Dimensions are kept in normalized order: mapped dimensions first, then
//! indexed dimensions, each group sorted by name. Cell layout inside a dense
//! subspace is row-major over the indexed dimensions in that order.

use crate::CellType;
use std::cmp::Ordering;
use std::fmt;

/// How a dimension is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimKind {
    /// Sparse dimension addressed by string labels.
    Mapped,
    /// Dense dimension with a fixed size.
    Indexed(usize),
    /// Dense dimension whose size is not known yet.
    Unbound,
}

/// A named tensor dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub name: String,
    pub kind: DimKind,
}

impl Dimension {
    /// Creates a mapped (sparse) dimension.
    pub fn mapped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DimKind::Mapped,
        }
    }

    /// Creates an indexed (dense) dimension of the given size.
    pub fn indexed(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            kind: DimKind::Indexed(size),
        }
    }

    /// Creates an indexed dimension with an abstract size.
    pub fn unbound(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DimKind::Unbound,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.kind == DimKind::Mapped
    }

    /// True for both bound and unbound dense dimensions.
    pub fn is_indexed(&self) -> bool {
        !self.is_mapped()
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.kind, DimKind::Indexed(_))
    }

    /// A bound indexed dimension of size 1.
    pub fn is_trivial(&self) -> bool {
        self.kind == DimKind::Indexed(1)
    }

    /// Size of an indexed dimension; mapped and unbound dimensions yield `None`.
    pub fn size(&self) -> Option<usize> {
        match self.kind {
            DimKind::Indexed(size) => Some(size),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DimKind::Mapped => write!(f, "{}{{}}", self.name),
            DimKind::Indexed(size) => write!(f, "{}[{size}]", self.name),
            DimKind::Unbound => write!(f, "{}[]", self.name),
        }
    }
}

fn dimension_order(a: &Dimension, b: &Dimension) -> Ordering {
    a.is_indexed()
        .cmp(&b.is_indexed())
        .then_with(|| a.name.cmp(&b.name))
}

/// Immutable tensor type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueType {
    cell_type: CellType,
    dimensions: Vec<Dimension>,
    error: bool,
}

impl ValueType {
    /// The error sentinel returned by failed type operations.
    pub fn error_type() -> Self {
        Self {
            cell_type: CellType::Double,
            dimensions: Vec::new(),
            error: true,
        }
    }

    /// The scalar type (`double`).
    pub fn double() -> Self {
        Self {
            cell_type: CellType::Double,
            dimensions: Vec::new(),
            error: false,
        }
    }

    /// Creates a normalized type, or the error type if the dimensions are
    /// invalid (duplicate names, empty names, zero-sized indexed dimensions).
    ///
    /// Scalars always get cell type `Double`.
    pub fn make(cell_type: CellType, mut dimensions: Vec<Dimension>) -> Self {
        dimensions.sort_by(dimension_order);
        let mut subspace_size: usize = 1;
        for (i, dim) in dimensions.iter().enumerate() {
            if dim.name.is_empty() || dim.kind == DimKind::Indexed(0) {
                return Self::error_type();
            }
            if dimensions[..i].iter().any(|d| d.name == dim.name) {
                return Self::error_type();
            }
            // Keeps dense_subspace_size and dense_strides from overflowing.
            match subspace_size.checked_mul(dim.size().unwrap_or(1)) {
                Some(size) => subspace_size = size,
                None => return Self::error_type(),
            }
        }
        let cell_type = if dimensions.is_empty() {
            CellType::Double
        } else {
            cell_type
        };
        Self {
            cell_type,
            dimensions,
            error: false,
        }
    }

    /// Parses a type spec such as `tensor<float>(x{},y[3])`.
    ///
    /// Malformed specs produce the error type.
    pub fn from_spec(spec: &str) -> Self {
        crate::type_spec::parse(spec).unwrap_or_else(|_| Self::error_type())
    }

    /// Returns the spec string for this type.
    pub fn to_spec(&self) -> String {
        self.to_string()
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// A scalar: no dimensions (and not an error).
    pub fn is_double(&self) -> bool {
        !self.error && self.dimensions.is_empty()
    }

    /// Has dimensions, all of them indexed.
    pub fn is_dense(&self) -> bool {
        !self.error && !self.dimensions.is_empty() && self.dimensions.iter().all(Dimension::is_indexed)
    }

    /// Has dimensions, all of them mapped.
    pub fn is_sparse(&self) -> bool {
        !self.error && !self.dimensions.is_empty() && self.dimensions.iter().all(Dimension::is_mapped)
    }

    /// Has both mapped and indexed dimensions.
    pub fn is_mixed(&self) -> bool {
        self.count_mapped_dimensions() > 0 && self.count_indexed_dimensions() > 0
    }

    /// True if every indexed dimension has a concrete size.
    pub fn is_bound(&self) -> bool {
        !self.error && self.dimensions.iter().all(|d| d.is_mapped() || d.is_bound())
    }

    pub fn count_mapped_dimensions(&self) -> usize {
        self.dimensions.iter().filter(|d| d.is_mapped()).count()
    }

    pub fn count_indexed_dimensions(&self) -> usize {
        self.dimensions.iter().filter(|d| d.is_indexed()).count()
    }

    /// Product of the indexed dimension sizes (1 when there are none).
    ///
    /// Unbound dimensions count as size 1; values always have bound types.
    pub fn dense_subspace_size(&self) -> usize {
        self.dimensions
            .iter()
            .filter_map(Dimension::size)
            .product()
    }

    pub fn mapped_dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.iter().filter(|d| d.is_mapped())
    }

    pub fn indexed_dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.iter().filter(|d| d.is_indexed())
    }

    /// Indexed dimensions with a size other than 1.
    pub fn nontrivial_indexed_dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.indexed_dimensions().filter(|d| !d.is_trivial())
    }

    pub fn mapped_dimension_names(&self) -> Vec<&str> {
        self.mapped_dimensions().map(|d| d.name.as_str()).collect()
    }

    pub fn dimension_names(&self) -> Vec<&str> {
        self.dimensions.iter().map(|d| d.name.as_str()).collect()
    }

    /// Position of the named dimension, if present.
    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Row-major strides of the indexed dimensions, in dimension order.
    pub fn dense_strides(&self) -> Vec<usize> {
        let sizes: Vec<usize> = self
            .indexed_dimensions()
            .map(|d| d.size().unwrap_or(1))
            .collect();
        let mut strides = vec![1usize; sizes.len()];
        for i in (0..sizes.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * sizes[i + 1];
        }
        strides
    }

    /// Same dimensions with a different cell type.
    pub fn with_cell_type(&self, cell_type: CellType) -> Self {
        if self.error {
            return Self::error_type();
        }
        Self::make(cell_type, self.dimensions.clone())
    }

    // ── Type algebra ──────────────────────────────────────────────

    /// Result type of an elementwise binary operation.
    pub fn join(a: &ValueType, b: &ValueType) -> ValueType {
        if a.error || b.error {
            return Self::error_type();
        }
        match union_dimensions(&a.dimensions, &b.dimensions) {
            Some(dims) => Self::make(CellType::join(a.cell_type, b.cell_type), dims),
            None => Self::error_type(),
        }
    }

    /// Result type of merging two values with identical dimensions.
    pub fn merge(a: &ValueType, b: &ValueType) -> ValueType {
        if a.error || b.error || a.dimensions != b.dimensions {
            return Self::error_type();
        }
        Self::make(CellType::unify(a.cell_type, b.cell_type), a.dimensions.clone())
    }

    /// Removes the named dimensions. An empty list removes all of them.
    pub fn reduce(&self, dims: &[String]) -> ValueType {
        if self.error {
            return Self::error_type();
        }
        if dims.iter().any(|name| self.dimension_index(name).is_none()) {
            return Self::error_type();
        }
        let kept: Vec<Dimension> = if dims.is_empty() {
            Vec::new()
        } else {
            self.dimensions
                .iter()
                .filter(|d| !dims.contains(&d.name))
                .cloned()
                .collect()
        };
        Self::make(self.cell_type.decay(), kept)
    }

    /// Bijective renaming of dimensions.
    pub fn rename(&self, from: &[String], to: &[String]) -> ValueType {
        if self.error || from.is_empty() || from.len() != to.len() {
            return Self::error_type();
        }
        for (i, name) in from.iter().enumerate() {
            if self.dimension_index(name).is_none() || from[..i].contains(name) {
                return Self::error_type();
            }
        }
        let dims: Vec<Dimension> = self
            .dimensions
            .iter()
            .map(|d| match from.iter().position(|f| *f == d.name) {
                Some(i) => Dimension {
                    name: to[i].clone(),
                    kind: d.kind,
                },
                None => d.clone(),
            })
            .collect();
        // `make` rejects the duplicates a colliding rename would create.
        Self::make(self.cell_type, dims)
    }

    /// Result type of concatenating `a` and `b` along `dim`.
    pub fn concat(a: &ValueType, b: &ValueType, dim: &str) -> ValueType {
        if a.error || b.error {
            return Self::error_type();
        }
        let size_of = |t: &ValueType| -> Option<DimKind> {
            match t.dimension(dim) {
                None => Some(DimKind::Indexed(1)),
                Some(d) if d.is_mapped() => None,
                Some(d) => Some(d.kind),
            }
        };
        let (Some(ka), Some(kb)) = (size_of(a), size_of(b)) else {
            return Self::error_type();
        };
        let concat_kind = match (ka, kb) {
            (DimKind::Indexed(x), DimKind::Indexed(y)) => match x.checked_add(y) {
                Some(size) => DimKind::Indexed(size),
                None => return Self::error_type(),
            },
            _ => DimKind::Unbound,
        };
        let strip = |t: &ValueType| -> Vec<Dimension> {
            t.dimensions
                .iter()
                .filter(|d| d.name != dim)
                .cloned()
                .collect()
        };
        match union_dimensions(&strip(a), &strip(b)) {
            Some(mut dims) => {
                dims.push(Dimension {
                    name: dim.to_string(),
                    kind: concat_kind,
                });
                Self::make(CellType::unify(a.cell_type, b.cell_type), dims)
            }
            None => Self::error_type(),
        }
    }

    /// Result type of an elementwise unary operation.
    pub fn map(&self) -> ValueType {
        if self.error {
            return Self::error_type();
        }
        Self::make(self.cell_type.decay(), self.dimensions.clone())
    }
}

/// Unions two normalized dimension lists; `None` on incompatible overlaps.
fn union_dimensions(a: &[Dimension], b: &[Dimension]) -> Option<Vec<Dimension>> {
    let mut result: Vec<Dimension> = a.to_vec();
    for dim in b {
        match result.iter_mut().find(|d| d.name == dim.name) {
            None => result.push(dim.clone()),
            Some(existing) => {
                existing.kind = match (existing.kind, dim.kind) {
                    (DimKind::Mapped, DimKind::Mapped) => DimKind::Mapped,
                    (DimKind::Indexed(x), DimKind::Indexed(y)) if x == y => DimKind::Indexed(x),
                    (DimKind::Indexed(x), DimKind::Unbound)
                    | (DimKind::Unbound, DimKind::Indexed(x)) => DimKind::Indexed(x),
                    (DimKind::Unbound, DimKind::Unbound) => DimKind::Unbound,
                    _ => return None,
                };
            }
        }
    }
    Some(result)
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.error {
            return f.write_str("error");
        }
        if self.dimensions.is_empty() {
            return f.write_str("double");
        }
        f.write_str("tensor")?;
        if self.cell_type != CellType::Double {
            write!(f, "<{}>", self.cell_type)?;
        }
        f.write_str("(")?;
        for (i, dim) in self.dimensions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{dim}")?;
        }
        f.write_str(")")
    }
}
