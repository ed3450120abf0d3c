// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Value → bytes.

use crate::wire::{write_string, write_varint, Format, Shape, WireCell};
use crate::CodecError;
use tensor_core::{select_cell_fn, CellType, Value};

type EncodeCellsFn = fn(&Value, Shape, &mut Vec<u8>) -> Result<(), CodecError>;

/// Encodes `value` with [`Format::Compact`].
pub fn encode(value: &Value) -> Result<Vec<u8>, CodecError> {
    encode_with(value, Format::Compact)
}

/// Encodes `value` with an explicit tag format.
pub fn encode_with(value: &Value, format: Format) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    encode_into(value, format, &mut out)?;
    Ok(out)
}

/// Appends the encoding of `value` to `out`. On error `out` is left as it
/// was.
pub fn encode_into(value: &Value, format: Format, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let start = out.len();
    let result = write_value(value, format, out);
    if result.is_err() {
        out.truncate(start);
    }
    result
}

fn write_value(value: &Value, format: Format, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let value_type = value.value_type();
    let shape = match (
        value_type.count_mapped_dimensions(),
        value_type.count_indexed_dimensions(),
    ) {
        (0, _) => Shape::Dense,
        (_, 0) => Shape::Sparse,
        _ => Shape::Mixed,
    };
    let cell_type = value.cell_type();
    let typed = format == Format::Extended || cell_type != CellType::Double;
    out.push(shape.tag(typed));
    if typed {
        out.push(cell_type.wire_id());
    }

    if shape != Shape::Dense {
        write_varint(out, value_type.count_mapped_dimensions())?;
        for dim in value_type.mapped_dimensions() {
            write_string(out, &dim.name)?;
        }
    }
    if shape != Shape::Sparse {
        write_varint(out, value_type.count_indexed_dimensions())?;
        for dim in value_type.indexed_dimensions() {
            write_string(out, &dim.name)?;
            write_varint(out, dim.size().unwrap_or(1))?;
        }
    }
    let encode_cells = select_cell_fn!(EncodeCellsFn; write_subspaces; [cell_type]);
    encode_cells(value, shape, out)
}

fn write_subspaces<T: WireCell>(
    value: &Value,
    shape: Shape,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let cells = value.view().typed_cells::<T>();
    let subspace_size = value.value_type().dense_subspace_size();
    if shape == Shape::Dense {
        for &cell in cells {
            cell.write(out);
        }
        return Ok(());
    }
    write_varint(out, value.num_subspaces())?;
    for (subspace, address) in value.index().iter() {
        for label in address {
            write_string(out, &label.text())?;
        }
        let start = subspace * subspace_size;
        for &cell in &cells[start..start + subspace_size] {
            cell.write(out);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::ValueType;

    #[test]
    fn test_scalar_is_dense_with_no_dims() {
        let bytes = encode(&Value::double(1.0)).unwrap();
        assert_eq!(bytes, vec![2, 0, 0x3f, 0xf0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_non_double_forces_extended_tag() {
        let value = Value::dense(ValueType::from_spec("tensor<int8>(x[2])"), vec![1i8, -1]).unwrap();
        let bytes = encode(&value).unwrap();
        assert_eq!(bytes, vec![6, 3, 1, 1, b'x', 2, 0x01, 0xff]);
    }

    #[test]
    fn test_extended_format_for_double() {
        let value = Value::dense(ValueType::from_spec("tensor(x[1])"), vec![0.0f64]).unwrap();
        let bytes = encode_with(&value, Format::Extended).unwrap();
        assert_eq!(&bytes[..2], &[6, 0]);
    }

    #[test]
    fn test_encode_into_appends() {
        let mut out = vec![0xaa];
        encode_into(&Value::double(0.0), Format::Compact, &mut out).unwrap();
        assert_eq!(out.len(), 1 + 2 + 8);
        assert_eq!(out[0], 0xaa);
    }
}
