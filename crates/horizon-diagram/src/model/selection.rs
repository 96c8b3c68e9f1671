//! Selection state shared between the model and the diagram scene.
//!
//! [`SelectionModel`] tracks which entries are selected, the current
//! (keyboard focus) entry and the anchor used for range extension. Entries
//! are held by [`PersistentIndex`], so selection survives sibling insertions
//! and removals.
//!
//! # Example
//!
//! ```
//! use horizon_diagram::model::{PersistentIndex, SelectionFlags, SelectionMode, SelectionModel};
//!
//! let mut selection = SelectionModel::new();
//! selection.set_selection_mode(SelectionMode::ExtendedSelection);
//!
//! let a = PersistentIndex::new(1, 0);
//! selection.select(a, SelectionFlags::CLEAR_AND_SELECT);
//! assert!(selection.is_selected(&a));
//!
//! selection.selection_changed.connect(|(selected, deselected)| {
//!     println!("Selection changed: +{} -{}", selected.len(), deselected.len());
//! });
//! ```

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use horizon_diagram_core::logging::targets;
use horizon_diagram_core::Signal;

use super::persistent::PersistentIndex;

/// How many entries may be selected at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Nothing can be selected.
    NoSelection,
    /// At most one entry is selected (default).
    #[default]
    SingleSelection,
    /// Any number of entries; each operation adds or removes.
    MultiSelection,
    /// Any number of entries; plain clicks replace, modifiers extend.
    ExtendedSelection,
}

/// Flags controlling selection operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionFlags {
    /// Clear existing selection before applying the operation.
    pub clear: bool,
    pub select: bool,
    pub deselect: bool,
    pub toggle: bool,
    /// Set as current index (keyboard focus).
    pub current: bool,
    /// Update the anchor for range extension.
    pub anchor: bool,
}

impl SelectionFlags {
    pub const NONE: Self = Self::empty();

    pub const CLEAR: Self = Self {
        clear: true,
        ..Self::empty()
    };

    pub const SELECT: Self = Self {
        select: true,
        ..Self::empty()
    };

    pub const DESELECT: Self = Self {
        deselect: true,
        ..Self::empty()
    };

    pub const TOGGLE: Self = Self {
        toggle: true,
        ..Self::empty()
    };

    pub const CLEAR_AND_SELECT: Self = Self {
        clear: true,
        select: true,
        ..Self::empty()
    };

    pub const CURRENT: Self = Self {
        current: true,
        ..Self::empty()
    };

    pub const SELECT_CURRENT: Self = Self {
        select: true,
        current: true,
        ..Self::empty()
    };

    pub const CLEAR_SELECT_CURRENT: Self = Self {
        clear: true,
        select: true,
        current: true,
        ..Self::empty()
    };

    const fn empty() -> Self {
        Self {
            clear: false,
            select: false,
            deselect: false,
            toggle: false,
            current: false,
            anchor: false,
        }
    }

    pub fn with_current(mut self) -> Self {
        self.current = true;
        self
    }

    pub fn with_anchor(mut self) -> Self {
        self.anchor = true;
        self
    }

    fn changes_selection(&self) -> bool {
        self.clear || self.select || self.deselect || self.toggle
    }
}

/// Manages selection state for a diagram scene.
///
/// # Signals
///
/// - `selection_changed`: `(selected, deselected)` after every effective change
/// - `current_changed`: `(new, old)` when the current index moves
pub struct SelectionModel {
    mode: SelectionMode,
    current: Option<PersistentIndex>,
    anchor: Option<PersistentIndex>,
    /// Selected entries in selection order.
    selected: IndexSet<PersistentIndex>,

    /// Emitted when selection changes. Args: (selected, deselected)
    pub selection_changed: Signal<(Vec<PersistentIndex>, Vec<PersistentIndex>)>,

    /// Emitted when the current index changes. Args: (new, old)
    pub current_changed: Signal<(Option<PersistentIndex>, Option<PersistentIndex>)>,
}

impl Default for SelectionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::with_mode(SelectionMode::default())
    }

    pub fn with_mode(mode: SelectionMode) -> Self {
        Self {
            mode,
            current: None,
            anchor: None,
            selected: IndexSet::new(),
            selection_changed: Signal::new(),
            current_changed: Signal::new(),
        }
    }

    // =========================================================================
    // Selection Mode
    // =========================================================================

    pub fn selection_mode(&self) -> SelectionMode {
        self.mode
    }

    /// Sets the selection mode.
    ///
    /// Existing selection is kept; subsequent operations follow the new mode.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    // =========================================================================
    // Current Index and Anchor
    // =========================================================================

    pub fn current_index(&self) -> Option<PersistentIndex> {
        self.current
    }

    /// Sets the current index and applies `flags` to it.
    pub fn set_current_index(&mut self, index: Option<PersistentIndex>, flags: SelectionFlags) {
        let old = std::mem::replace(&mut self.current, index);
        if old != index {
            self.current_changed.emit((index, old));
        }

        if flags.changes_selection() {
            match index {
                Some(index) => self.select(index, flags),
                None if flags.clear => self.clear_selection(),
                None => {}
            }
        }

        if flags.anchor {
            self.anchor = index;
        }
    }

    pub fn anchor_index(&self) -> Option<PersistentIndex> {
        self.anchor
    }

    pub fn set_anchor_index(&mut self, index: Option<PersistentIndex>) {
        self.anchor = index;
    }

    // =========================================================================
    // Selection Queries
    // =========================================================================

    pub fn is_selected(&self, index: &PersistentIndex) -> bool {
        self.selected.contains(index)
    }

    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Selected entries in selection order.
    pub fn selected_indices(&self) -> Vec<PersistentIndex> {
        self.selected.iter().copied().collect()
    }

    // =========================================================================
    // Selection Operations
    // =========================================================================

    /// Applies `flags` to a single entry.
    pub fn select(&mut self, index: PersistentIndex, flags: SelectionFlags) {
        self.select_many([index], flags);
    }

    /// Applies `flags` to every entry in `indices` as one change.
    ///
    /// `clear` empties the selection first, then `toggle`, `select` or
    /// `deselect` applies to each entry. At most one `selection_changed`
    /// emission results. In single-selection mode only the last selected
    /// entry survives.
    pub fn select_many<I>(&mut self, indices: I, flags: SelectionFlags)
    where
        I: IntoIterator<Item = PersistentIndex>,
    {
        if self.mode == SelectionMode::NoSelection {
            return;
        }

        let before = self.selected.clone();

        if flags.clear {
            self.selected.clear();
        }

        for index in indices {
            if flags.toggle {
                if !self.selected.shift_remove(&index) {
                    self.selected.insert(index);
                }
            } else if flags.select {
                self.selected.insert(index);
            } else if flags.deselect {
                self.selected.shift_remove(&index);
            }
        }

        if self.mode == SelectionMode::SingleSelection && self.selected.len() > 1 {
            let keep = self.selected.pop();
            self.selected.clear();
            self.selected.extend(keep);
        }

        self.emit_difference(&before);
    }

    /// Drops entries from the selection and from current/anchor.
    ///
    /// Used when entries are about to disappear from the model.
    pub fn forget<'a, I>(&mut self, indices: I)
    where
        I: IntoIterator<Item = &'a PersistentIndex>,
    {
        let before = self.selected.clone();
        for index in indices {
            self.selected.shift_remove(index);
            if self.current == Some(*index) {
                self.current = None;
                self.current_changed.emit((None, Some(*index)));
            }
            if self.anchor == Some(*index) {
                self.anchor = None;
            }
        }
        self.emit_difference(&before);
    }

    /// Clears all selection.
    pub fn clear_selection(&mut self) {
        if self.selected.is_empty() {
            return;
        }
        let deselected: Vec<_> = self.selected.drain(..).collect();
        self.selection_changed.emit((Vec::new(), deselected));
    }

    /// Clears selection, current and anchor.
    pub fn clear(&mut self) {
        self.clear_selection();
        self.set_current_index(None, SelectionFlags::NONE);
        self.anchor = None;
    }

    /// Resets the selection model (called when the scene is reset).
    pub fn reset(&mut self) {
        self.clear();
    }

    fn emit_difference(&self, before: &IndexSet<PersistentIndex>) {
        let selected: Vec<_> = self.selected.difference(before).copied().collect();
        let deselected: Vec<_> = before.difference(&self.selected).copied().collect();
        if selected.is_empty() && deselected.is_empty() {
            return;
        }
        tracing::trace!(
            target: targets::SELECTION,
            selected = selected.len(),
            deselected = deselected.len(),
            "selection changed"
        );
        self.selection_changed.emit((selected, deselected));
    }
}
