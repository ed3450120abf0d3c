// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-codec
//!
//! Binary serialization of tensor [`Value`](tensor_core::Value)s.
//!
//! # Wire Format
//!
//! ```text
//! tag:u8 [cell_type:u8] body
//!
//! tag 1 / 5  sparse  n_mapped names.. n_subspaces (labels.. cell)..
//! tag 2 / 6  dense   n_indexed (name size).. cells..
//! tag 3 / 7  mixed   n_mapped names.. n_indexed (name size).. n_subspaces (labels.. cells..)..
//! ```
//!
//! Tags 1–3 imply double cells; tags 5–7 carry a cell-type byte
//! (0 double, 1 float, 2 bfloat16, 3 int8). Counts, sizes and string
//! lengths use the 1-or-4 byte integer encoding; cells are big-endian.
//!
//! # Example
//! ```
//! use tensor_core::{Value, ValueType};
//!
//! let ty = ValueType::from_spec("tensor(x[2])");
//! let value = Value::dense(ty, vec![1.0f64, 2.0]).unwrap();
//! let bytes = tensor_codec::encode(&value).unwrap();
//! assert_eq!(tensor_codec::decode(&bytes).unwrap(), value);
//! ```

mod decode;
mod encode;
mod error;
mod wire;

pub use decode::{decode, decode_from};
pub use encode::{encode, encode_into, encode_with};
pub use error::CodecError;
pub use wire::{Format, Reader, MAX_VARINT};
