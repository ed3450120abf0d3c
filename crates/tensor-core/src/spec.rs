// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layout-independent reference form of a tensor.
//!
//! A [`TensorSpec`] lists cells by full address (mapped and indexed labels),
//! so two values with different subspace order or cell type compare by
//! content. It is the form used in tests and in JSON fixtures:
//!
//! ```json
//! {"type": "tensor(x{},y[2])",
//!  "cells": [{"address": {"x": "a", "y": 1}, "value": 2.5}]}
//! ```

use crate::{Cells, TensorError, Value, ValueBuilder, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One coordinate of a cell address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    /// Index along an indexed dimension.
    Indexed(usize),
    /// Label along a mapped dimension.
    Mapped(String),
}

impl From<&str> for Label {
    fn from(label: &str) -> Self {
        Label::Mapped(label.to_string())
    }
}

impl From<String> for Label {
    fn from(label: String) -> Self {
        Label::Mapped(label)
    }
}

impl From<usize> for Label {
    fn from(index: usize) -> Self {
        Label::Indexed(index)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Indexed(i) => write!(f, "{i}"),
            Label::Mapped(s) => f.write_str(s),
        }
    }
}

/// Full cell address: dimension name to label.
pub type Address = BTreeMap<String, Label>;

/// Order-independent tensor contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpecRepr", into = "SpecRepr")]
pub struct TensorSpec {
    value_type: ValueType,
    cells: BTreeMap<Address, f64>,
}

#[derive(Serialize, Deserialize)]
struct CellRepr {
    address: Address,
    value: f64,
}

#[derive(Serialize, Deserialize)]
struct SpecRepr {
    #[serde(rename = "type")]
    value_type: String,
    #[serde(default)]
    cells: Vec<CellRepr>,
}

impl TryFrom<SpecRepr> for TensorSpec {
    type Error = TensorError;

    fn try_from(repr: SpecRepr) -> Result<Self, Self::Error> {
        let value_type = crate::type_spec::parse(&repr.value_type)?;
        let mut spec = TensorSpec::from_type(value_type);
        for cell in repr.cells {
            spec.cells.insert(cell.address, cell.value);
        }
        Ok(spec)
    }
}

impl From<TensorSpec> for SpecRepr {
    fn from(spec: TensorSpec) -> Self {
        SpecRepr {
            value_type: spec.value_type.to_string(),
            cells: spec
                .cells
                .into_iter()
                .map(|(address, value)| CellRepr { address, value })
                .collect(),
        }
    }
}

impl TensorSpec {
    /// An empty spec; `type_spec` must parse.
    pub fn new(type_spec: &str) -> Result<Self, TensorError> {
        Ok(Self::from_type(crate::type_spec::parse(type_spec)?))
    }

    pub fn from_type(value_type: ValueType) -> Self {
        Self {
            value_type,
            cells: BTreeMap::new(),
        }
    }

    /// Adds (or overwrites) one cell.
    pub fn add<I, K, L>(mut self, address: I, value: f64) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<Label>,
    {
        let address = address
            .into_iter()
            .map(|(k, l)| (k.into(), l.into()))
            .collect();
        self.cells.insert(address, value);
        self
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn cells(&self) -> &BTreeMap<Address, f64> {
        &self.cells
    }

    /// Extracts every cell of `value`.
    pub fn from_value(value: &Value) -> Self {
        let value_type = value.value_type();
        let mapped: Vec<&str> = value_type
            .mapped_dimensions()
            .map(|d| d.name.as_str())
            .collect();
        let indexed: Vec<(&str, usize)> = value_type
            .indexed_dimensions()
            .map(|d| (d.name.as_str(), d.size().unwrap_or(1)))
            .collect();
        let strides = value_type.dense_strides();
        let subspace_size = value_type.dense_subspace_size();

        let mut cells = BTreeMap::new();
        for (subspace, labels) in value.index().iter() {
            let mut base = Address::new();
            for (name, label) in mapped.iter().zip(labels) {
                base.insert(name.to_string(), Label::Mapped(label.text().to_string()));
            }
            for offset in 0..subspace_size {
                let mut address = base.clone();
                for (&(name, size), &stride) in indexed.iter().zip(&strides) {
                    address.insert(name.to_string(), Label::Indexed((offset / stride) % size));
                }
                let cell = value.cells().get_f64(subspace * subspace_size + offset);
                cells.insert(address, cell);
            }
        }
        Self {
            value_type: value_type.clone(),
            cells,
        }
    }

    /// Builds a value; dense cells not listed are zero.
    pub fn to_value(&self) -> Result<Value, TensorError> {
        let value_type = &self.value_type;
        let strides = value_type.dense_strides();
        let mut builder = ValueBuilder::<f64>::new(
            value_type.with_cell_type(crate::CellType::Double),
            self.cells.len(),
        )?;
        for (address, &cell) in &self.cells {
            if address.len() != value_type.dimensions().len() {
                return Err(invalid_address(address, "wrong number of labels"));
            }
            let mut labels = Vec::with_capacity(value_type.count_mapped_dimensions());
            for dim in value_type.mapped_dimensions() {
                match address.get(&dim.name) {
                    Some(Label::Mapped(label)) => labels.push(label.as_str()),
                    _ => return Err(invalid_address(address, "expected a mapped label")),
                }
            }
            let mut offset = 0;
            for (dim, stride) in value_type.indexed_dimensions().zip(&strides) {
                match address.get(&dim.name) {
                    Some(&Label::Indexed(i)) if i < dim.size().unwrap_or(0) => {
                        offset += i * stride;
                    }
                    _ => return Err(invalid_address(address, "index out of range")),
                }
            }
            builder.add_labels(&labels)?[offset] = cell;
        }
        let value = builder.build();
        if value_type.cell_type() == crate::CellType::Double {
            return Ok(value);
        }
        let cells = Cells::from_f64(value_type.cell_type(), &value.cells().to_f64_vec());
        Value::from_parts(value_type.clone(), cells, value.index().clone())
    }

    /// Same type and addresses, with cells equal within a relative
    /// `tolerance` (NaN equals NaN).
    pub fn approx_eq(&self, other: &TensorSpec, tolerance: f64) -> bool {
        if self.value_type != other.value_type || self.cells.len() != other.cells.len() {
            return false;
        }
        self.cells.iter().all(|(address, &a)| match other.cells.get(address) {
            Some(&b) => {
                a == b
                    || (a.is_nan() && b.is_nan())
                    || (a - b).abs() <= tolerance * (1.0 + a.abs().max(b.abs()))
            }
            None => false,
        })
    }
}

fn invalid_address(address: &Address, detail: &str) -> TensorError {
    let rendered: Vec<String> = address.iter().map(|(k, v)| format!("{k}:{v}")).collect();
    TensorError::InvalidAddress {
        address: format!("{{{}}}", rendered.join(",")),
        detail: detail.to_string(),
    }
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spec({})", self.value_type)?;
        for (address, value) in &self.cells {
            let rendered: Vec<String> = address.iter().map(|(k, v)| format!("{k}:{v}")).collect();
            write!(f, " {{{}}}={value}", rendered.join(","))?;
        }
        Ok(())
    }
}
