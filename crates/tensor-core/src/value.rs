// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime tensor values.
//!
//! A [`Value`] stores its cells as `num_subspaces × dense_subspace_size`
//! contiguous blocks, one block per address in its [`AddressMap`]. Values
//! are immutable once built; [`ValueBuilder`] is the only way to assemble
//! one subspace at a time.

use crate::{AddressMap, CellType, CellValue, LabelId, TensorError, ValueType};
use half::bf16;

/// Typed cell storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Cells {
    Double(Vec<f64>),
    Float(Vec<f32>),
    BFloat16(Vec<bf16>),
    Int8(Vec<i8>),
}

impl Cells {
    /// Zero-filled storage of `len` cells.
    pub fn zeros(cell_type: CellType, len: usize) -> Cells {
        match cell_type {
            CellType::Double => Cells::Double(vec![0.0; len]),
            CellType::Float => Cells::Float(vec![0.0; len]),
            CellType::BFloat16 => Cells::BFloat16(vec![bf16::ZERO; len]),
            CellType::Int8 => Cells::Int8(vec![0; len]),
        }
    }

    /// Converts `values` into storage of the given cell type.
    pub fn from_f64(cell_type: CellType, values: &[f64]) -> Cells {
        fn convert<T: CellValue>(values: &[f64]) -> Cells {
            T::into_cells(values.iter().map(|&v| T::from_f64(v)).collect())
        }
        match cell_type {
            CellType::Double => Cells::Double(values.to_vec()),
            CellType::Float => convert::<f32>(values),
            CellType::BFloat16 => convert::<bf16>(values),
            CellType::Int8 => convert::<i8>(values),
        }
    }

    pub fn cell_type(&self) -> CellType {
        match self {
            Cells::Double(_) => CellType::Double,
            Cells::Float(_) => CellType::Float,
            Cells::BFloat16(_) => CellType::BFloat16,
            Cells::Int8(_) => CellType::Int8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Cells::Double(v) => v.len(),
            Cells::Float(v) => v.len(),
            Cells::BFloat16(v) => v.len(),
            Cells::Int8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads one cell widened to `f64`.
    pub fn get_f64(&self, i: usize) -> f64 {
        match self {
            Cells::Double(v) => v[i],
            Cells::Float(v) => v[i] as f64,
            Cells::BFloat16(v) => v[i].to_f64(),
            Cells::Int8(v) => v[i] as f64,
        }
    }

    /// All cells widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.get_f64(i)).collect()
    }

    /// Typed access; `None` if `T` is not the stored cell type.
    pub fn typed<T: CellValue>(&self) -> Option<&[T]> {
        T::slice_of(self)
    }
}

/// An immutable tensor value.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    value_type: ValueType,
    cells: Cells,
    index: AddressMap,
}

impl Value {
    /// A scalar value.
    pub fn double(value: f64) -> Self {
        Self {
            value_type: ValueType::double(),
            cells: Cells::Double(vec![value]),
            index: AddressMap::dense(),
        }
    }

    /// Assembles a value from parts, checking every layout invariant.
    pub fn from_parts(
        value_type: ValueType,
        cells: Cells,
        index: AddressMap,
    ) -> Result<Self, TensorError> {
        check_buildable(&value_type)?;
        if cells.cell_type() != value_type.cell_type() {
            return Err(TensorError::CellTypeMismatch {
                expected: value_type.cell_type(),
                actual: cells.cell_type(),
            });
        }
        let mapped = value_type.count_mapped_dimensions();
        if index.num_mapped_dims() != mapped {
            return Err(TensorError::AddressLength {
                expected: mapped,
                actual: index.num_mapped_dims(),
            });
        }
        let subspace_size = value_type.dense_subspace_size();
        let expected = if mapped == 0 {
            subspace_size
        } else {
            index.size() * subspace_size
        };
        if cells.len() != expected || (mapped == 0 && index.size() != 1) {
            return Err(TensorError::CellCountMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            value_type,
            cells,
            index,
        })
    }

    /// A dense (or scalar) value from row-major cells.
    pub fn dense<T: CellValue>(value_type: ValueType, cells: Vec<T>) -> Result<Self, TensorError> {
        if value_type.count_mapped_dimensions() > 0 {
            return Err(TensorError::UnbuildableType(format!(
                "{value_type} (not dense)"
            )));
        }
        Self::from_parts(value_type, T::into_cells(cells), AddressMap::dense())
    }

    /// The empty value of a type: no subspaces if sparse or mixed, zeros if
    /// dense.
    pub fn empty(value_type: ValueType) -> Result<Self, TensorError> {
        check_buildable(&value_type)?;
        let mapped = value_type.count_mapped_dimensions();
        if mapped == 0 {
            let cells = Cells::zeros(value_type.cell_type(), value_type.dense_subspace_size());
            return Ok(Self {
                value_type,
                cells,
                index: AddressMap::dense(),
            });
        }
        Ok(Self {
            cells: Cells::zeros(value_type.cell_type(), 0),
            value_type,
            index: AddressMap::new(mapped),
        })
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn cell_type(&self) -> CellType {
        self.value_type.cell_type()
    }

    pub fn cells(&self) -> &Cells {
        &self.cells
    }

    pub fn index(&self) -> &AddressMap {
        &self.index
    }

    pub fn num_subspaces(&self) -> usize {
        self.index.size()
    }

    /// The first cell as `f64`; 0 for a value without cells.
    pub fn as_double(&self) -> f64 {
        if self.cells.is_empty() {
            0.0
        } else {
            self.cells.get_f64(0)
        }
    }

    /// Borrowed view with this value's own type.
    pub fn view(&self) -> ValueView<'_> {
        ValueView {
            value_type: &self.value_type,
            cells: &self.cells,
            index: &self.index,
        }
    }

    /// Consumes the value, keeping its storage under a new type.
    ///
    /// The caller guarantees that `value_type` has the same cell type and
    /// layout (same mapped dimension count and subspace size).
    pub fn retype(self, value_type: ValueType) -> Value {
        debug_assert_eq!(value_type.cell_type(), self.cells.cell_type());
        debug_assert_eq!(
            value_type.count_mapped_dimensions(),
            self.index.num_mapped_dims()
        );
        Value {
            value_type,
            cells: self.cells,
            index: self.index,
        }
    }
}

fn check_buildable(value_type: &ValueType) -> Result<(), TensorError> {
    if value_type.is_error() || !value_type.is_bound() {
        return Err(TensorError::UnbuildableType(value_type.to_string()));
    }
    Ok(())
}

/// A borrowed value, possibly seen through a different (layout-compatible)
/// type.
#[derive(Debug, Clone, Copy)]
pub struct ValueView<'a> {
    value_type: &'a ValueType,
    cells: &'a Cells,
    index: &'a AddressMap,
}

impl<'a> ValueView<'a> {
    pub fn value_type(&self) -> &'a ValueType {
        self.value_type
    }

    pub fn cells(&self) -> &'a Cells {
        self.cells
    }

    pub fn index(&self) -> &'a AddressMap {
        self.index
    }

    pub fn num_subspaces(&self) -> usize {
        self.index.size()
    }

    /// Typed cells.
    ///
    /// # Panics
    /// Panics if `T` is not the stored cell type. Kernels are selected from
    /// the node's input types, so a mismatch is a compiler bug.
    pub fn typed_cells<T: CellValue>(&self) -> &'a [T] {
        match T::slice_of(self.cells) {
            Some(cells) => cells,
            None => panic!(
                "kernel for {} cells applied to {} value",
                T::CELL_TYPE,
                self.cells.cell_type()
            ),
        }
    }

    pub fn as_double(&self) -> f64 {
        if self.cells.is_empty() {
            0.0
        } else {
            self.cells.get_f64(0)
        }
    }

    /// Same storage seen through another type.
    pub fn with_type(self, value_type: &'a ValueType) -> ValueView<'a> {
        ValueView {
            value_type,
            cells: self.cells,
            index: self.index,
        }
    }

    /// Copies the viewed data into an owned value of the view's type.
    pub fn to_value(&self) -> Value {
        Value {
            value_type: self.value_type.clone(),
            cells: self.cells.clone(),
            index: self.index.clone(),
        }
    }
}

/// Incremental construction of a [`Value`].
#[derive(Debug)]
pub struct ValueBuilder<T: CellValue> {
    value_type: ValueType,
    subspace_size: usize,
    index: AddressMap,
    cells: Vec<T>,
}

impl<T: CellValue> ValueBuilder<T> {
    /// Starts a value of `value_type`, reserving room for
    /// `expected_subspaces` subspaces.
    pub fn new(value_type: ValueType, expected_subspaces: usize) -> Result<Self, TensorError> {
        check_buildable(&value_type)?;
        if T::CELL_TYPE != value_type.cell_type() {
            return Err(TensorError::CellTypeMismatch {
                expected: value_type.cell_type(),
                actual: T::CELL_TYPE,
            });
        }
        let subspace_size = value_type.dense_subspace_size();
        let mapped = value_type.count_mapped_dimensions();
        Ok(Self {
            subspace_size,
            index: AddressMap::with_capacity(mapped, expected_subspaces),
            cells: Vec::with_capacity(expected_subspaces * subspace_size),
            value_type,
        })
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn subspace_size(&self) -> usize {
        self.subspace_size
    }

    /// Adds (or revisits) the subspace at `address` and returns its cells.
    /// New subspaces start zero-filled.
    ///
    /// # Panics
    /// Panics if the address length differs from the mapped dimension count.
    pub fn add_subspace(&mut self, address: &[LabelId]) -> &mut [T] {
        let added = self.index.add(address);
        self.subspace_cells(added)
    }

    fn subspace_cells(&mut self, (subspace, added): (usize, bool)) -> &mut [T] {
        if added {
            self.cells
                .resize(self.cells.len() + self.subspace_size, T::default());
        }
        let start = subspace * self.subspace_size;
        &mut self.cells[start..start + self.subspace_size]
    }

    /// Checked variant of [`add_subspace`](Self::add_subspace) taking label
    /// strings.
    pub fn add_labels(&mut self, labels: &[&str]) -> Result<&mut [T], TensorError> {
        let expected = self.index.num_mapped_dims();
        if labels.len() != expected {
            return Err(TensorError::AddressLength {
                expected,
                actual: labels.len(),
            });
        }
        let added = self.index.add_labels(labels);
        Ok(self.subspace_cells(added))
    }

    /// Finishes the value. A dense value with no subspace added gets a
    /// zero-filled one.
    pub fn build(mut self) -> Value {
        if self.index.num_mapped_dims() == 0 && self.index.is_empty() {
            self.add_subspace(&[]);
        }
        Value {
            value_type: self.value_type,
            cells: T::into_cells(self.cells),
            index: self.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(spec: &str) -> ValueType {
        ValueType::from_spec(spec)
    }

    #[test]
    fn test_dense_value() {
        let v = Value::dense(t("tensor<float>(x[2],y[2])"), vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(v.num_subspaces(), 1);
        assert_eq!(v.cells().typed::<f32>(), Some(&[1.0f32, 2.0, 3.0, 4.0][..]));
        assert_eq!(v.cells().get_f64(3), 4.0);
    }

    #[test]
    fn test_dense_wrong_size() {
        let err = Value::dense(t("tensor(x[3])"), vec![1.0f64, 2.0]).unwrap_err();
        assert!(matches!(err, TensorError::CellCountMismatch { expected: 3, actual: 2 }));
    }

    #[test]
    fn test_builder_cell_type_mismatch() {
        let err = ValueBuilder::<f32>::new(t("tensor(x[3])"), 1).unwrap_err();
        assert!(matches!(err, TensorError::CellTypeMismatch { .. }));
    }

    #[test]
    fn test_builder_rejects_unbound_type() {
        assert!(ValueBuilder::<f64>::new(t("tensor(x[])"), 1).is_err());
        assert!(ValueBuilder::<f64>::new(ValueType::error_type(), 1).is_err());
    }

    #[test]
    fn test_mixed_builder() {
        let mut builder = ValueBuilder::<f64>::new(t("tensor(k{},x[2])"), 2).unwrap();
        builder.add_labels(&["a"]).unwrap().copy_from_slice(&[1.0, 2.0]);
        builder.add_labels(&["b"]).unwrap()[1] = 5.0;
        // Revisiting returns the same block.
        builder.add_labels(&["a"]).unwrap()[0] += 10.0;
        let v = builder.build();
        assert_eq!(v.num_subspaces(), 2);
        assert_eq!(v.cells().to_f64_vec(), vec![11.0, 2.0, 0.0, 5.0]);
        assert_eq!(v.index().lookup_labels(&["b"]), Some(1));
    }

    #[test]
    fn test_builder_address_length() {
        let mut builder = ValueBuilder::<f64>::new(t("tensor(k{},l{})"), 1).unwrap();
        assert!(builder.add_labels(&["a"]).is_err());
    }

    #[test]
    fn test_empty_values() {
        let sparse = Value::empty(t("tensor(x{})")).unwrap();
        assert_eq!(sparse.num_subspaces(), 0);
        assert!(sparse.cells().is_empty());

        let dense = Value::empty(t("tensor<int8>(x[3])")).unwrap();
        assert_eq!(dense.cells(), &Cells::Int8(vec![0, 0, 0]));
    }

    #[test]
    fn test_dense_builder_without_subspace() {
        let v = ValueBuilder::<f64>::new(t("tensor(x[2])"), 1).unwrap().build();
        assert_eq!(v.cells(), &Cells::Double(vec![0.0, 0.0]));
    }

    #[test]
    fn test_view_with_type() {
        let v = Value::dense(t("tensor(x[2])"), vec![1.0, 2.0]).unwrap();
        let renamed = t("tensor(y[2])");
        let view = v.view().with_type(&renamed);
        assert_eq!(view.value_type(), &renamed);
        assert_eq!(view.typed_cells::<f64>(), &[1.0, 2.0]);
        assert_eq!(view.to_value().value_type(), &renamed);
    }

    #[test]
    fn test_from_f64_conversion() {
        let cells = Cells::from_f64(CellType::Int8, &[1.0, -2.0, 3.5]);
        assert_eq!(cells, Cells::Int8(vec![1, -2, 3]));
        assert_eq!(Cells::from_f64(CellType::BFloat16, &[0.5]).get_f64(0), 0.5);
    }

    #[test]
    fn test_scalar() {
        let v = Value::double(4.5);
        assert!(v.value_type().is_double());
        assert_eq!(v.as_double(), 4.5);
    }
}
