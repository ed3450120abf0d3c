// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Process-wide interning of sparse labels.
//!
//! Mapped-dimension labels are compared and hashed constantly by the sparse
//! kernels, so every label string is interned into a [`LabelId`].
//!
//! # Ownership
//!
//! Entries are reference counted. A [`LabelHandle`] holds one reference, and
//! an [`AddressMap`](crate::AddressMap) holds one per stored label; the
//! entry is removed when its last holder goes away and its slot is reused.
//! A bare `LabelId` is therefore only meaningful while something holds it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Id of an interned label string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(u32);

impl LabelId {
    /// The label string.
    ///
    /// # Panics
    /// Panics if nothing holds the label any more.
    pub fn text(self) -> Arc<str> {
        LabelRepo::global().resolve(self)
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

// ── LabelHandle ────────────────────────────────────────────────────

/// An owned reference to an interned label.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct LabelHandle {
    id: LabelId,
}

impl LabelHandle {
    /// Interns `label` and holds it until the handle is dropped.
    pub fn new(label: &str) -> Self {
        Self {
            id: LabelRepo::global().acquire(label),
        }
    }

    pub fn id(&self) -> LabelId {
        self.id
    }

    pub fn text(&self) -> Arc<str> {
        self.id.text()
    }
}

impl Clone for LabelHandle {
    fn clone(&self) -> Self {
        LabelRepo::global().retain(&[self.id]);
        Self { id: self.id }
    }
}

impl Drop for LabelHandle {
    fn drop(&mut self) {
        LabelRepo::global().release(&[self.id]);
    }
}

// ── LabelRepo ──────────────────────────────────────────────────────

struct Entry {
    text: Arc<str>,
    refs: AtomicUsize,
}

#[derive(Default)]
struct RepoInner {
    ids: HashMap<Arc<str>, LabelId>,
    entries: Vec<Option<Entry>>,
    free: Vec<u32>,
}

impl RepoInner {
    fn entry(&self, id: LabelId) -> &Entry {
        match self.entries.get(id.0 as usize).and_then(Option::as_ref) {
            Some(entry) => entry,
            None => panic!("label #{} is not held", id.0),
        }
    }
}

/// The label interner shared by all values in the process.
pub struct LabelRepo {
    inner: RwLock<RepoInner>,
}

impl LabelRepo {
    /// Returns the global repository.
    pub fn global() -> &'static LabelRepo {
        static REPO: OnceLock<LabelRepo> = OnceLock::new();
        REPO.get_or_init(|| LabelRepo {
            inner: RwLock::new(RepoInner::default()),
        })
    }

    /// Interns `label` and takes one reference to it.
    fn acquire(&self, label: &str) -> LabelId {
        {
            let inner = self.read();
            if let Some(&id) = inner.ids.get(label) {
                inner.entry(id).refs.fetch_add(1, Ordering::Relaxed);
                return id;
            }
        }
        let mut guard = self.write();
        let inner = &mut *guard;
        if let Some(&id) = inner.ids.get(label) {
            inner.entry(id).refs.fetch_add(1, Ordering::Relaxed);
            return id;
        }
        let text: Arc<str> = Arc::from(label);
        let entry = Entry {
            text: Arc::clone(&text),
            refs: AtomicUsize::new(1),
        };
        let id = match inner.free.pop() {
            Some(slot) => {
                inner.entries[slot as usize] = Some(entry);
                LabelId(slot)
            }
            None => {
                inner.entries.push(Some(entry));
                LabelId((inner.entries.len() - 1) as u32)
            }
        };
        inner.ids.insert(text, id);
        id
    }

    /// Takes one more reference to each of `ids`, which must be held.
    pub fn retain(&self, ids: &[LabelId]) {
        if ids.is_empty() {
            return;
        }
        let inner = self.read();
        for &id in ids {
            inner.entry(id).refs.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drops one reference to each of `ids` and removes the entries that
    /// are no longer held.
    pub fn release(&self, ids: &[LabelId]) {
        if ids.is_empty() {
            return;
        }
        let mut unused = Vec::new();
        {
            let inner = self.read();
            for &id in ids {
                if inner.entry(id).refs.fetch_sub(1, Ordering::AcqRel) == 1 {
                    unused.push(id);
                }
            }
        }
        if unused.is_empty() {
            return;
        }
        let mut guard = self.write();
        let inner = &mut *guard;
        for id in unused {
            // The label may have been acquired again, or removed already,
            // since its count reached zero.
            let slot = &mut inner.entries[id.0 as usize];
            if !slot
                .as_ref()
                .is_some_and(|entry| entry.refs.load(Ordering::Acquire) == 0)
            {
                continue;
            }
            if let Some(entry) = slot.take() {
                inner.ids.remove(&entry.text);
                inner.free.push(id.0);
            }
        }
    }

    /// Looks up a held label without taking a reference.
    pub fn find(&self, label: &str) -> Option<LabelId> {
        self.read().ids.get(label).copied()
    }

    /// Number of references to `label`; zero when it is not interned.
    pub fn ref_count(&self, label: &str) -> usize {
        let inner = self.read();
        inner
            .ids
            .get(label)
            .map_or(0, |&id| inner.entry(id).refs.load(Ordering::Acquire))
    }

    fn resolve(&self, id: LabelId) -> Arc<str> {
        Arc::clone(&self.read().entry(id).text)
    }

    /// Number of labels currently interned.
    pub fn len(&self) -> usize {
        self.read().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Counts are only changed through atomics or under the write lock, so
    // a poisoned lock still holds consistent data.
    fn read(&self) -> RwLockReadGuard<'_, RepoInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RepoInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
