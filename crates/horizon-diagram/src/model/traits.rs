//! The model side of the scene protocol.
//!
//! [`ItemModel`] is what a scene reads: rows under a parent, data by role,
//! and resolution of persistent handles. [`ModelSignals`] is what it
//! listens to.

use horizon_diagram_core::Signal;

use super::index::ModelIndex;
use super::persistent::PersistentIndex;
use super::role::{ItemData, ItemRole};

/// Per-entry capabilities reported by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemFlags {
    pub selectable: bool,
    pub enabled: bool,
}

impl ItemFlags {
    /// Selectable and enabled.
    pub fn new() -> Self {
        Self {
            selectable: true,
            enabled: true,
        }
    }

    /// Neither selectable nor enabled; reported for entries that are gone.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    /// Whether a region or keyboard selection may pick the entry.
    pub fn can_select(&self) -> bool {
        self.selectable && self.enabled
    }
}

/// A hierarchical model a diagram scene can mirror.
///
/// # Notification contract
///
/// Structural changes are announced through [`ModelSignals`]:
///
/// - `rows_about_to_be_removed` fires before the rows go away, while
///   indices to them still resolve;
/// - `rows_inserted` fires once the new rows exist.
///
/// Slots query the model, so no storage lock may be held while emitting.
pub trait ItemModel: Send + Sync {
    fn row_count(&self, parent: &ModelIndex) -> usize;

    fn column_count(&self, parent: &ModelIndex) -> usize;

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData;

    /// The entry at `(row, column)` under `parent`; invalid when out of range.
    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex;

    fn parent(&self, index: &ModelIndex) -> ModelIndex;

    fn signals(&self) -> &ModelSignals;

    /// Where the entry behind `persistent` sits now.
    ///
    /// Invalid once the entry is removed. A handle never resolves to an
    /// entry other than the one it was issued for.
    fn resolve(&self, persistent: &PersistentIndex) -> ModelIndex;

    /// Stores `value` under `role`. Read-only models keep the default.
    fn set_data(&self, _index: &ModelIndex, _value: ItemData, _role: ItemRole) -> bool {
        false
    }

    fn flags(&self, _index: &ModelIndex) -> ItemFlags {
        ItemFlags::new()
    }

    fn display_text(&self, index: &ModelIndex) -> Option<String> {
        self.data(index, ItemRole::Display).into_string()
    }

    /// Handle that survives structural changes; `None` for invalid indices.
    fn persistent_index(&self, index: &ModelIndex) -> Option<PersistentIndex> {
        PersistentIndex::from_index(index)
    }
}

/// Row ranges as `(parent, first, last)`, `last` inclusive.
pub type RowRange = (ModelIndex, usize, usize);

/// Change notifications of an [`ItemModel`].
#[derive(Default)]
pub struct ModelSignals {
    pub rows_about_to_be_inserted: Signal<RowRange>,
    pub rows_inserted: Signal<RowRange>,
    /// The rows still resolve while this fires.
    pub rows_about_to_be_removed: Signal<RowRange>,
    pub rows_removed: Signal<RowRange>,
    /// `(top_left, bottom_right, roles)`; no roles means every role.
    pub data_changed: Signal<(ModelIndex, ModelIndex, Vec<ItemRole>)>,
    pub model_about_to_reset: Signal<()>,
    pub model_reset: Signal<()>,
}

impl ModelSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announces rows `first..=last` under `parent`, runs `insert`, then
    /// reports them inserted.
    pub fn emit_rows_inserted<F>(&self, parent: ModelIndex, first: usize, last: usize, insert: F)
    where
        F: FnOnce(),
    {
        self.rows_about_to_be_inserted.emit((parent.clone(), first, last));
        insert();
        self.rows_inserted.emit((parent, first, last));
    }

    /// Announces the removal of rows `first..=last` under `parent`, runs
    /// `remove`, then reports them removed.
    pub fn emit_rows_removed<F>(&self, parent: ModelIndex, first: usize, last: usize, remove: F)
    where
        F: FnOnce(),
    {
        self.rows_about_to_be_removed.emit((parent.clone(), first, last));
        remove();
        self.rows_removed.emit((parent, first, last));
    }

    /// `data_changed` for one entry.
    pub fn emit_data_changed_single(&self, index: ModelIndex, roles: Vec<ItemRole>) {
        self.data_changed.emit((index.clone(), index, roles));
    }

    /// Brackets a wholesale change with the two reset signals.
    pub fn emit_reset<F>(&self, reset: F)
    where
        F: FnOnce(),
    {
        self.model_about_to_reset.emit(());
        reset();
        self.model_reset.emit(());
    }
}
