//! Item model layer.
//!
//! A diagram scene observes a hierarchical [`ItemModel`]. This module holds
//! the model-side vocabulary:
//!
//! - [`ModelIndex`]: transient address of an entry (row, column, parent)
//! - [`PersistentIndex`]: stable handle that survives unrelated mutations
//! - [`ItemModel`] and [`ModelSignals`]: queries and change notifications
//! - [`ModelObserver`]: explicit observer form of the notification contract
//! - [`TreeModel`]: a ready-made slot-map backed tree
//! - [`SelectionModel`]: shared selection state

mod index;
mod observer;
mod persistent;
mod role;
mod selection;
mod traits;
mod tree_model;

pub use index::ModelIndex;
pub use observer::ModelObserver;
pub use persistent::PersistentIndex;
pub use role::{ItemData, ItemRole};
pub use selection::{SelectionFlags, SelectionMode, SelectionModel};
pub use traits::{ItemFlags, ItemModel, ModelSignals};
pub use tree_model::{NodeKey, TreeDataExtractor, TreeModel, TreeNodeData};
