//! Observer interface for model change notifications.

use super::index::ModelIndex;
use super::role::ItemRole;

/// Receives structural and data notifications from an item model.
///
/// This is the explicit form of the model's signal contract. Callers must
/// respect the ordering the model guarantees:
///
/// 1. [`rows_about_to_be_removed`](Self::rows_about_to_be_removed) is called
///    while the doomed rows still exist and their indices still resolve.
///    Observers must release everything tied to those rows before returning.
/// 2. [`rows_removed`](Self::rows_removed) follows once the rows are gone.
/// 3. [`rows_inserted`](Self::rows_inserted) is called after the new rows
///    exist and can be queried.
///
/// Handlers run synchronously to completion and must not block.
pub trait ModelObserver {
    /// Rows `first..=last` were inserted under `parent`.
    fn rows_inserted(&mut self, parent: &ModelIndex, first: usize, last: usize);

    /// Rows `first..=last` under `parent` are about to be removed.
    fn rows_about_to_be_removed(&mut self, parent: &ModelIndex, first: usize, last: usize);

    /// Rows `first..=last` under `parent` have been removed.
    fn rows_removed(&mut self, _parent: &ModelIndex, _first: usize, _last: usize) {}

    /// Data in the rectangle `top_left..=bottom_right` changed.
    ///
    /// An empty `roles` slice means any role may have changed.
    fn data_changed(&mut self, top_left: &ModelIndex, bottom_right: &ModelIndex, roles: &[ItemRole]);

    /// The whole model was reset; every previously issued index is gone.
    fn model_reset(&mut self);
}
