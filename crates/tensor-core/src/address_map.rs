// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sparse index: mapping from mapped-dimension addresses to subspaces.
//!
//! Addresses are stored flat (`num_mapped_dims` labels per subspace) in
//! insertion order, with a hash map from full address to subspace number.
//! A [`View`] groups subspaces by a subset of the mapped dimensions so that
//! kernels can look up partial addresses.
//!
//! The index holds one reference per stored label in the [`LabelRepo`],
//! released when the index is dropped.

use crate::{LabelHandle, LabelId, LabelRepo};
use std::collections::HashMap;

/// Index over the subspaces of one value.
#[derive(Debug, PartialEq, Eq)]
pub struct AddressMap {
    num_mapped_dims: usize,
    labels: Vec<LabelId>,
    lookup: HashMap<Box<[LabelId]>, usize>,
}

impl AddressMap {
    /// Creates an empty index for addresses of `num_mapped_dims` labels.
    pub fn new(num_mapped_dims: usize) -> Self {
        Self::with_capacity(num_mapped_dims, 0)
    }

    pub fn with_capacity(num_mapped_dims: usize, subspaces: usize) -> Self {
        Self {
            num_mapped_dims,
            labels: Vec::with_capacity(subspaces * num_mapped_dims),
            lookup: HashMap::with_capacity(subspaces),
        }
    }

    /// The trivial index of a dense value: exactly one empty address.
    pub fn dense() -> Self {
        let mut map = Self::with_capacity(0, 1);
        map.add(&[]);
        map
    }

    pub fn num_mapped_dims(&self) -> usize {
        self.num_mapped_dims
    }

    /// Number of subspaces.
    pub fn size(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Adds an address; returns its subspace and whether it was new.
    ///
    /// # Panics
    /// Panics if `address` does not have `num_mapped_dims` labels.
    pub fn add(&mut self, address: &[LabelId]) -> (usize, bool) {
        assert_eq!(
            address.len(),
            self.num_mapped_dims,
            "address length must match the number of mapped dimensions"
        );
        if let Some(&subspace) = self.lookup.get(address) {
            return (subspace, false);
        }
        let subspace = self.lookup.len();
        LabelRepo::global().retain(address);
        self.labels.extend_from_slice(address);
        self.lookup.insert(address.into(), subspace);
        (subspace, true)
    }

    /// [`add`](Self::add) for an address given as strings.
    pub fn add_labels(&mut self, labels: &[&str]) -> (usize, bool) {
        let handles: Vec<LabelHandle> = labels.iter().map(|l| LabelHandle::new(l)).collect();
        let address: Vec<LabelId> = handles.iter().map(LabelHandle::id).collect();
        self.add(&address)
    }

    /// Full-address lookup.
    pub fn lookup(&self, address: &[LabelId]) -> Option<usize> {
        self.lookup.get(address).copied()
    }

    /// Full-address lookup by label strings. Never interns.
    pub fn lookup_labels(&self, labels: &[&str]) -> Option<usize> {
        let repo = LabelRepo::global();
        let address = labels
            .iter()
            .map(|l| repo.find(l))
            .collect::<Option<Vec<LabelId>>>()?;
        self.lookup(&address)
    }

    /// Labels of one subspace, in mapped-dimension order.
    pub fn address(&self, subspace: usize) -> &[LabelId] {
        let start = subspace * self.num_mapped_dims;
        &self.labels[start..start + self.num_mapped_dims]
    }

    /// Iterates `(subspace, address)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[LabelId])> + '_ {
        (0..self.size()).map(move |i| (i, self.address(i)))
    }

    /// Builds a view keyed by the mapped dimensions at `dims` (positions
    /// within the address).
    pub fn view(&self, dims: &[usize]) -> View<'_> {
        View::new(self, dims)
    }
}

impl Clone for AddressMap {
    fn clone(&self) -> Self {
        LabelRepo::global().retain(&self.labels);
        Self {
            num_mapped_dims: self.num_mapped_dims,
            labels: self.labels.clone(),
            lookup: self.lookup.clone(),
        }
    }
}

impl Drop for AddressMap {
    fn drop(&mut self) {
        LabelRepo::global().release(&self.labels);
    }
}

/// Partial-address lookup over an [`AddressMap`].
#[derive(Debug)]
pub struct View<'a> {
    map: &'a AddressMap,
    lookup_dims: Vec<usize>,
    rest_dims: Vec<usize>,
    groups: HashMap<Vec<LabelId>, Vec<usize>>,
}

impl<'a> View<'a> {
    fn new(map: &'a AddressMap, dims: &[usize]) -> Self {
        let lookup_dims = dims.to_vec();
        let rest_dims = (0..map.num_mapped_dims())
            .filter(|d| !dims.contains(d))
            .collect();
        let mut groups: HashMap<Vec<LabelId>, Vec<usize>> = HashMap::new();
        for (subspace, address) in map.iter() {
            let key = lookup_dims.iter().map(|&d| address[d]).collect();
            groups.entry(key).or_default().push(subspace);
        }
        Self {
            map,
            lookup_dims,
            rest_dims,
            groups,
        }
    }

    pub fn lookup_dims(&self) -> &[usize] {
        &self.lookup_dims
    }

    /// Subspaces whose labels on the view dimensions equal `partial`,
    /// in insertion order. A miss yields an empty slice.
    pub fn lookup(&self, partial: &[LabelId]) -> &[usize] {
        self.groups.get(partial).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Labels of `subspace` on the dimensions not covered by the view.
    pub fn rest_labels(&self, subspace: usize) -> impl Iterator<Item = LabelId> + '_ {
        let address = self.map.address(subspace);
        self.rest_dims.iter().map(move |&d| address[d])
    }
}
