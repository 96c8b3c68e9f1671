//! Persistent indices: stable handles to model entries.

use std::cmp::Ordering;

use slotmap::{Key, KeyData};

use super::index::ModelIndex;
use super::traits::ItemModel;

/// A handle to one model entry that survives unrelated mutations.
///
/// The handle stores the entry's identity, not its position: inserting or
/// removing siblings does not affect it, and the entry's current position is
/// recovered with [`ItemModel::resolve`]. Once the entry itself is removed
/// the handle is invalid forever. Models issue identities from a
/// generation-tagged slot map, so a handle to a freed slot never resolves to
/// a newer entry that reuses the slot.
///
/// Persistent indices are plain `Copy` values. The adapter stores them as
/// registry keys; the model never hands out references to its storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersistentIndex {
    internal_id: u64,
    column: usize,
}

impl PersistentIndex {
    /// Creates a handle from a model-specific identity.
    #[inline]
    pub const fn new(internal_id: u64, column: usize) -> Self {
        Self { internal_id, column }
    }

    /// Creates a handle from a slot-map key.
    #[inline]
    pub fn from_key<K: Key>(key: K, column: usize) -> Self {
        Self::new(key.data().as_ffi(), column)
    }

    /// The persistent handle for a transient index, if it is valid.
    pub fn from_index(index: &ModelIndex) -> Option<Self> {
        index
            .is_valid()
            .then(|| Self::new(index.internal_id(), index.column()))
    }

    #[inline]
    pub fn internal_id(&self) -> u64 {
        self.internal_id
    }

    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Recovers the slot-map key this handle was created from.
    #[inline]
    pub fn key<K: Key>(&self) -> K {
        KeyData::from_ffi(self.internal_id).into()
    }

    /// Current position of the entry, or an invalid index if it is gone.
    pub fn resolve(&self, model: &dyn ItemModel) -> ModelIndex {
        model.resolve(self)
    }

    /// Whether the entry still exists in `model`.
    pub fn is_valid_in(&self, model: &dyn ItemModel) -> bool {
        model.resolve(self).is_valid()
    }

    /// Orders two siblings by their current position in `model`.
    ///
    /// Returns `None` when either entry is gone or they do not share a parent.
    pub fn cmp_position(&self, other: &Self, model: &dyn ItemModel) -> Option<Ordering> {
        let a = model.resolve(self);
        let b = model.resolve(other);
        if !a.is_valid() || !b.is_valid() || a.parent() != b.parent() {
            return None;
        }
        Some(a.row().cmp(&b.row()).then(a.column().cmp(&b.column())))
    }
}
