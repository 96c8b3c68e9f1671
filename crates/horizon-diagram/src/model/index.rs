//! Transient addresses of model entries.
//!
//! A [`ModelIndex`] names an entry by where it sits right now: row and
//! column under a parent chain, plus the model's own identity for the
//! entry. Rows shift as siblings come and go, so an index is only good
//! until the next structural change. Keep a
//! [`PersistentIndex`](super::PersistentIndex) to hold on to an entry.

use std::hash::{Hash, Hasher};

/// An entry's current position in an [`ItemModel`](super::ItemModel).
///
/// The invalid index doubles as the model root when passed as a parent.
///
/// ```ignore
/// let class = model.index(0, 0, &package);
/// assert_eq!(class.parent(), package);
/// assert!(class.is_descendant_of(&package));
/// ```
#[derive(Clone)]
pub struct ModelIndex {
    row: usize,
    column: usize,
    parent: Option<Box<ModelIndex>>,
    internal_id: u64,
    valid: bool,
}

impl Default for ModelIndex {
    fn default() -> Self {
        Self::invalid()
    }
}

impl ModelIndex {
    #[inline]
    pub const fn invalid() -> Self {
        Self {
            row: 0,
            column: 0,
            parent: None,
            internal_id: 0,
            valid: false,
        }
    }

    /// Builds a valid index. Models call this; `internal_id` must stay
    /// unique to the entry for as long as the entry exists.
    #[inline]
    pub fn new(row: usize, column: usize, parent: ModelIndex, internal_id: u64) -> Self {
        Self {
            row,
            column,
            parent: parent.is_valid().then(|| Box::new(parent)),
            internal_id,
            valid: true,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// The parent entry; invalid at the top level.
    #[inline]
    pub fn parent(&self) -> ModelIndex {
        self.parent.as_deref().cloned().unwrap_or_else(ModelIndex::invalid)
    }

    #[inline]
    pub fn internal_id(&self) -> u64 {
        self.internal_id
    }

    /// Parent, grandparent and so on up to the top level.
    pub fn ancestors(&self) -> impl Iterator<Item = &ModelIndex> + '_ {
        std::iter::successors(self.parent.as_deref(), |index| index.parent.as_deref())
    }

    /// Number of ancestors; 0 at the top level and for invalid indices.
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// Whether `ancestor` lies on this entry's parent chain. Never true
    /// when either index is invalid.
    pub fn is_descendant_of(&self, ancestor: &ModelIndex) -> bool {
        self.is_valid()
            && ancestor.is_valid()
            && self.ancestors().any(|a| a.internal_id == ancestor.internal_id)
    }
}

impl std::fmt::Debug for ModelIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_valid() {
            return write!(f, "ModelIndex(invalid)");
        }
        f.debug_struct("ModelIndex")
            .field("row", &self.row)
            .field("column", &self.column)
            .field("depth", &self.depth())
            .field("internal_id", &self.internal_id)
            .finish()
    }
}

impl PartialEq for ModelIndex {
    fn eq(&self, other: &Self) -> bool {
        match (self.valid, other.valid) {
            (false, false) => true,
            (true, true) => {
                self.internal_id == other.internal_id
                    && self.row == other.row
                    && self.column == other.column
                    && self.parent == other.parent
            }
            _ => false,
        }
    }
}

impl Eq for ModelIndex {}

impl Hash for ModelIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.valid.hash(state);
        if self.valid {
            // The parent chain follows from the entry identity.
            (self.row, self.column, self.internal_id).hash(state);
        }
    }
}
