// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Wire-format tests: exact byte layouts and encode/decode properties.

use proptest::prelude::*;
use tensor_codec::{decode, decode_from, encode, encode_with, CodecError, Format, Reader};
use tensor_core::{
    AddressMap, CellType, Cells, Label, LabelRepo, TensorSpec, Value, ValueBuilder, ValueType,
};

fn be_doubles(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

#[test]
fn dense_matrix_layout() {
    let ty = ValueType::from_spec("tensor(x[3],y[2])");
    let value = Value::dense(ty, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();

    let mut expected = vec![2, 2, 1, b'x', 3, 1, b'y', 2];
    expected.extend(be_doubles(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    assert_eq!(encode(&value).unwrap(), expected);
}

#[test]
fn sparse_matrix_layout_keeps_insertion_order() {
    let ty = ValueType::from_spec("tensor(x{},y{})");
    let mut builder = ValueBuilder::<f64>::new(ty, 3).unwrap();
    builder.add_labels(&["a", "a"]).unwrap()[0] = 1.0;
    builder.add_labels(&["a", "b"]).unwrap()[0] = 2.0;
    builder.add_labels(&["b", "a"]).unwrap()[0] = 3.0;
    let value = builder.build();

    let mut expected = vec![1, 2, 1, b'x', 1, b'y', 3];
    for (x, y, cell) in [(b'a', b'a', 1.0), (b'a', b'b', 2.0), (b'b', b'a', 3.0)] {
        expected.extend_from_slice(&[1, x, 1, y]);
        expected.extend(be_doubles(&[cell]));
    }
    assert_eq!(encode(&value).unwrap(), expected);
    assert_eq!(decode(&expected).unwrap(), value);
}

#[test]
fn mixed_float_layout() {
    let ty = ValueType::from_spec("tensor<float>(k{},x[2])");
    let mut builder = ValueBuilder::<f32>::new(ty, 1).unwrap();
    builder
        .add_labels(&["key"])
        .unwrap()
        .copy_from_slice(&[0.5, -1.0]);
    let value = builder.build();

    let mut expected = vec![7, 1, 1, 1, b'k', 1, 1, b'x', 2, 1, 3, b'k', b'e', b'y'];
    expected.extend_from_slice(&0.5f32.to_be_bytes());
    expected.extend_from_slice(&(-1.0f32).to_be_bytes());
    assert_eq!(encode(&value).unwrap(), expected);
    assert_eq!(decode(&expected).unwrap(), value);
}

#[test]
fn long_labels_use_four_byte_lengths() {
    let label = "l".repeat(200);
    let ty = ValueType::from_spec("tensor(x{})");
    let mut builder = ValueBuilder::<f64>::new(ty, 1).unwrap();
    builder.add_labels(&[label.as_str()]).unwrap()[0] = 1.0;
    let bytes = encode(&builder.build()).unwrap();
    // tag, 1 dim, "x", 1 subspace, then the 4-byte length 200.
    assert_eq!(&bytes[..9], &[1, 1, 1, b'x', 1, 0x80, 0, 0, 200]);
    assert_eq!(&*decode(&bytes).unwrap().index().address(0)[0].text(), label.as_str());
}

fn encoded_sparse(labels: &[&str]) -> Vec<u8> {
    let ty = ValueType::from_spec("tensor(doc{})");
    let mut builder = ValueBuilder::<f64>::new(ty, labels.len()).unwrap();
    for label in labels {
        builder.add_labels(&[*label]).unwrap()[0] = 1.0;
    }
    encode(&builder.build()).unwrap()
}

#[test]
fn decoded_labels_are_released_with_their_values() {
    let repo = LabelRepo::global();
    let names: Vec<String> = (0..1000).map(|i| format!("released-doc-{i}")).collect();
    let encoded: Vec<Vec<u8>> = names.iter().map(|n| encoded_sparse(&[n.as_str()])).collect();
    assert!(names.iter().all(|n| repo.find(n).is_none()));

    let values: Vec<Value> = encoded.iter().map(|b| decode(b).unwrap()).collect();
    assert!(names.iter().all(|n| repo.ref_count(n) == 1));
    drop(values);
    assert!(names.iter().all(|n| repo.find(n).is_none()));
}

#[test]
fn failed_decode_releases_its_labels() {
    let repo = LabelRepo::global();
    let mut bytes = encoded_sparse(&["failed-decode-a", "failed-decode-b"]);
    bytes.truncate(bytes.len() - 4);
    assert!(matches!(decode(&bytes), Err(CodecError::Truncated { .. })));
    assert_eq!(repo.find("failed-decode-a"), None);
    assert_eq!(repo.find("failed-decode-b"), None);
}

#[test]
fn legacy_and_extended_tags_decode_to_the_same_value() {
    let spec = TensorSpec::new("tensor(k{},x[2])")
        .unwrap()
        .add([("k", Label::from("a")), ("x", Label::from(1usize))], 4.0);
    let value = spec.to_value().unwrap();
    let compact = encode(&value).unwrap();
    let extended = encode_with(&value, Format::Extended).unwrap();
    assert_eq!(compact[0], 3);
    assert_eq!(&extended[..2], &[7, 0]);
    assert_eq!(decode(&compact).unwrap(), decode(&extended).unwrap());
}

#[test]
fn unknown_cell_type_byte_is_rejected() {
    for byte in [4u8, 7, 0x80, 0xff] {
        assert_eq!(decode(&[5, byte, 0, 0]), Err(CodecError::UnknownCellType(byte)));
    }
}

#[test]
fn reader_consumes_exactly_one_value_at_a_time() {
    let first = encode(&Value::double(1.0)).unwrap();
    let second = encode(&TensorSpec::new("tensor(x{})").unwrap().to_value().unwrap()).unwrap();
    let mut stream = first.clone();
    stream.extend_from_slice(&second);

    let mut reader = Reader::new(&stream);
    assert_eq!(decode_from(&mut reader).unwrap().as_double(), 1.0);
    assert_eq!(reader.position(), first.len());
    let empty = decode_from(&mut reader).unwrap();
    assert_eq!(empty.num_subspaces(), 0);
    assert!(reader.is_empty());
}

#[test]
fn every_truncation_fails() {
    let spec = TensorSpec::new("tensor<bfloat16>(k{},x[3])")
        .unwrap()
        .add([("k", Label::from("a")), ("x", Label::from(0usize))], 1.0)
        .add([("k", Label::from("b")), ("x", Label::from(2usize))], -2.0);
    let bytes = encode(&spec.to_value().unwrap()).unwrap();
    for len in 0..bytes.len() {
        assert!(decode(&bytes[..len]).is_err(), "prefix of {len} bytes decoded");
    }
}

// ── Properties ─────────────────────────────────────────────────────

const LABELS: [&str; 4] = ["a", "b", "c", "dd"];

fn arb_value() -> impl Strategy<Value = Value> {
    (
        0usize..4,
        any::<bool>(),
        any::<bool>(),
        0usize..4,
        0usize..4,
        prop::collection::vec((0usize..4, 0usize..4), 0..6),
        prop::collection::vec(-8i8..8, 64),
    )
        .prop_map(|(ct, has_a, has_b, x, y, addresses, seed)| {
            let cell_type = CellType::ALL[ct];
            let mut dims = Vec::new();
            if has_a {
                dims.push(tensor_core::Dimension::mapped("a"));
            }
            if has_b {
                dims.push(tensor_core::Dimension::mapped("b"));
            }
            if x > 0 {
                dims.push(tensor_core::Dimension::indexed("x", x));
            }
            if y > 0 {
                dims.push(tensor_core::Dimension::indexed("y", y));
            }
            let ty = ValueType::make(cell_type, dims);
            let mapped = ty.count_mapped_dimensions();
            let mut index = if mapped == 0 {
                AddressMap::dense()
            } else {
                AddressMap::new(mapped)
            };
            if mapped > 0 {
                for (i, j) in addresses {
                    let address: Vec<&str> = [i, j][..mapped].iter().map(|&l| LABELS[l]).collect();
                    index.add_labels(&address);
                }
            }
            let len = index.size() * ty.dense_subspace_size();
            let raw: Vec<f64> = (0..len).map(|i| seed[i % seed.len()] as f64).collect();
            let cells = Cells::from_f64(ty.cell_type(), &raw);
            Value::from_parts(ty, cells, index).unwrap()
        })
}

proptest! {
    #[test]
    fn round_trip(value in arb_value(), extended in any::<bool>()) {
        let format = if extended { Format::Extended } else { Format::Compact };
        let bytes = encode_with(&value, format).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn re_encode_is_byte_identical(value in arb_value()) {
        let bytes = encode(&value).unwrap();
        let again = encode(&decode(&bytes).unwrap()).unwrap();
        prop_assert_eq!(again, bytes);
    }
}
