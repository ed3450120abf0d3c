// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bytes → value.
//!
//! Decoding is strict: dimension names must arrive in canonical order,
//! every declared length must fit in the remaining input, and addresses
//! must be unique. A failed decode never yields a value and leaves the
//! reader where it started.

use crate::wire::{read_cell_type, Reader, Shape, WireCell};
use crate::CodecError;
use std::cmp::Ordering;
use tensor_core::{select_cell_fn, AddressMap, CellType, Cells, Dimension, Value, ValueType};

type DecodeCellsFn =
    fn(&mut Reader<'_>, &ValueType, Shape) -> Result<(Cells, AddressMap), CodecError>;

/// Decodes exactly one value from `bytes`; trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    let mut reader = Reader::new(bytes);
    let value = decode_from(&mut reader)?;
    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }
    Ok(value)
}

/// Decodes the next value from `reader`, consuming exactly its bytes.
///
/// On error the reader is rewound to where it started.
pub fn decode_from(reader: &mut Reader<'_>) -> Result<Value, CodecError> {
    let start = reader.position();
    let result = read_value(reader);
    if result.is_err() {
        reader.rewind(start);
    }
    result
}

fn read_value(reader: &mut Reader<'_>) -> Result<Value, CodecError> {
    let (shape, typed) = Shape::from_tag(reader.read_u8()?)?;
    let wire_cell_type = if typed {
        read_cell_type(reader)?
    } else {
        CellType::Double
    };

    let mut dims = Vec::new();
    if shape != Shape::Dense {
        let count = reader.read_varint()?;
        let mut names = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            names.push(reader.read_string()?);
        }
        check_canonical(&names)?;
        dims.extend(names.into_iter().map(Dimension::mapped));
    }
    if shape != Shape::Sparse {
        let count = reader.read_varint()?;
        let mut names = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            let name = reader.read_string()?;
            let size = reader.read_varint()?;
            if size == 0 {
                return Err(CodecError::ZeroSizedDimension(name.to_string()));
            }
            names.push(name);
            dims.push(Dimension::indexed(name, size));
        }
        check_canonical(&names)?;
    }
    for (i, dim) in dims.iter().enumerate() {
        if dims[..i].iter().any(|d| d.name == dim.name) {
            return Err(CodecError::DuplicateDimension(dim.name.clone()));
        }
    }
    let mut subspace_size: usize = 1;
    for size in dims.iter().filter_map(Dimension::size) {
        subspace_size = subspace_size
            .checked_mul(size)
            .ok_or(CodecError::SizeOverflow)?;
    }

    let value_type = ValueType::make(wire_cell_type, dims);
    if value_type.is_error() {
        return Err(CodecError::InvalidValue("malformed dimension list".into()));
    }
    // Cells are read in the declared cell type even for scalars, whose type
    // is always double.
    let read_cells = select_cell_fn!(DecodeCellsFn; read_subspaces; [wire_cell_type]);
    let (mut cells, index) = read_cells(reader, &value_type, shape)?;
    if cells.cell_type() != value_type.cell_type() {
        cells = Cells::from_f64(value_type.cell_type(), &cells.to_f64_vec());
    }
    Value::from_parts(value_type, cells, index).map_err(|e| CodecError::InvalidValue(e.to_string()))
}

fn check_canonical(names: &[&str]) -> Result<(), CodecError> {
    for pair in names.windows(2) {
        match pair[0].cmp(pair[1]) {
            Ordering::Less => {}
            Ordering::Equal => return Err(CodecError::DuplicateDimension(pair[1].to_string())),
            Ordering::Greater => {
                return Err(CodecError::NonCanonicalDimensions(pair[1].to_string()))
            }
        }
    }
    Ok(())
}

fn read_block<T: WireCell>(
    reader: &mut Reader<'_>,
    len: usize,
    cells: &mut Vec<T>,
) -> Result<(), CodecError> {
    let bytes = len.checked_mul(T::WIRE_SIZE).ok_or(CodecError::SizeOverflow)?;
    let block = reader.take(bytes)?;
    cells.extend(block.chunks_exact(T::WIRE_SIZE).map(T::read));
    Ok(())
}

fn read_subspaces<T: WireCell>(
    reader: &mut Reader<'_>,
    value_type: &ValueType,
    shape: Shape,
) -> Result<(Cells, AddressMap), CodecError> {
    let subspace_size = value_type.dense_subspace_size();
    if shape == Shape::Dense {
        let mut cells = Vec::with_capacity(subspace_size.min(reader.remaining()));
        read_block(reader, subspace_size, &mut cells)?;
        return Ok((T::into_cells(cells), AddressMap::dense()));
    }

    let count = reader.read_varint()?;
    let num_mapped = value_type.count_mapped_dimensions();
    if num_mapped == 0 && count > 1 {
        return Err(CodecError::TooManySubspaces(count));
    }
    // Every subspace needs at least one byte per label and its cells.
    let min_subspace_bytes = num_mapped + subspace_size.saturating_mul(T::WIRE_SIZE);
    reader.ensure(count.saturating_mul(min_subspace_bytes))?;

    let mut index = AddressMap::with_capacity(num_mapped, count);
    let mut cells = Vec::with_capacity(count * subspace_size);
    let mut labels: Vec<&str> = Vec::with_capacity(num_mapped);
    for _ in 0..count {
        labels.clear();
        for _ in 0..num_mapped {
            labels.push(reader.read_string()?);
        }
        let (_, added) = index.add_labels(&labels);
        if !added {
            return Err(CodecError::DuplicateAddress(format!("{{{}}}", labels.join(","))));
        }
        read_block(reader, subspace_size, &mut cells)?;
    }
    if num_mapped == 0 && count == 0 {
        // A value without mapped dimensions always has its one subspace.
        cells.resize(subspace_size, T::from_f64(0.0));
        index = AddressMap::dense();
    }
    Ok((T::into_cells(cells), index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tag_and_cell_type() {
        assert_eq!(decode(&[4]), Err(CodecError::UnknownTag(4)));
        assert_eq!(decode(&[6, 9, 0]), Err(CodecError::UnknownCellType(9)));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(decode(&[]), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = vec![2, 0];
        bytes.extend_from_slice(&1.5f64.to_be_bytes());
        bytes.push(0);
        assert_eq!(decode(&bytes), Err(CodecError::TrailingBytes(1)));
    }

    #[test]
    fn test_non_canonical_dimension_order() {
        // tensor(y[1],x[1]) written in the wrong order.
        let bytes = [2, 2, 1, b'y', 1, 1, b'x', 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            decode(&bytes),
            Err(CodecError::NonCanonicalDimensions("x".into()))
        );
    }

    #[test]
    fn test_duplicate_dimension_across_groups() {
        // Mixed with mapped x and indexed x.
        let bytes = [3, 1, 1, b'x', 1, 1, b'x', 1, 0];
        assert_eq!(
            decode(&bytes),
            Err(CodecError::DuplicateDimension("x".into()))
        );
    }

    #[test]
    fn test_zero_sized_dimension() {
        let bytes = [2, 1, 1, b'x', 0];
        assert_eq!(
            decode(&bytes),
            Err(CodecError::ZeroSizedDimension("x".into()))
        );
    }

    #[test]
    fn test_duplicate_address() {
        let mut bytes = vec![1, 1, 1, b'x', 2];
        for _ in 0..2 {
            bytes.extend_from_slice(&[1, b'a']);
            bytes.extend_from_slice(&1.0f64.to_be_bytes());
        }
        assert_eq!(
            decode(&bytes),
            Err(CodecError::DuplicateAddress("{a}".into()))
        );
    }

    #[test]
    fn test_declared_count_beyond_input() {
        // Claims 100 subspaces but carries none.
        let bytes = [1, 1, 1, b'x', 100];
        assert!(matches!(decode(&bytes), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_sparse_without_dimensions_is_scalar() {
        let mut bytes = vec![1, 0, 1];
        bytes.extend_from_slice(&2.5f64.to_be_bytes());
        let value = decode(&bytes).unwrap();
        assert!(value.value_type().is_double());
        assert_eq!(value.as_double(), 2.5);

        let empty = decode(&[1, 0, 0]).unwrap();
        assert_eq!(empty.as_double(), 0.0);

        assert_eq!(decode(&[1, 0, 2]), Err(CodecError::TooManySubspaces(2)));
    }

    #[test]
    fn test_typed_scalar_becomes_double() {
        let mut bytes = vec![6, 1, 0];
        bytes.extend_from_slice(&0.25f32.to_be_bytes());
        let value = decode(&bytes).unwrap();
        assert_eq!(value.cell_type(), CellType::Double);
        assert_eq!(value.as_double(), 0.25);
    }

    #[test]
    fn test_failed_decode_rewinds_reader() {
        let bytes = [2, 1, 1, b'x', 2, 0x3f];
        let mut reader = Reader::new(&bytes);
        assert!(decode_from(&mut reader).is_err());
        assert_eq!(reader.position(), 0);
    }
}
