//! Hierarchical tree model implementation.
//!
//! `TreeModel` stores nodes in a generation-tagged slot map. Node keys double
//! as persistent identities: a [`PersistentIndex`] built from a removed node's
//! key never resolves again, even after the slot is reused.

use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};

use horizon_diagram_core::logging::targets;

use super::index::ModelIndex;
use super::persistent::PersistentIndex;
use super::role::{ItemData, ItemRole};
use super::traits::{ItemFlags, ItemModel, ModelSignals};

new_key_type! {
    /// Identifies a node in a [`TreeModel`].
    pub struct NodeKey;
}

/// Trait for node data that provides its own display information.
pub trait TreeNodeData: Send + Sync {
    /// Primary label for this node.
    fn display(&self) -> ItemData;

    fn tooltip(&self) -> ItemData {
        ItemData::None
    }

    /// Data for any other role.
    fn data(&self, _role: ItemRole) -> ItemData {
        ItemData::None
    }

    /// Stores `value` under `role`. Returns `true` if the node accepted it.
    fn set_data(&mut self, _role: ItemRole, _value: ItemData) -> bool {
        false
    }

    fn flags(&self) -> ItemFlags {
        ItemFlags::new()
    }
}

impl TreeNodeData for String {
    fn display(&self) -> ItemData {
        ItemData::from(self.as_str())
    }
}

struct TreeNode<T> {
    data: T,
    children: Vec<NodeKey>,
    parent: Option<NodeKey>,
}

struct TreeStorage<T> {
    nodes: SlotMap<NodeKey, TreeNode<T>>,
    root_children: Vec<NodeKey>,
}

impl<T> TreeStorage<T> {
    fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root_children: Vec::new(),
        }
    }

    /// Children of `parent`, or `None` if `parent` names a missing node.
    fn children_of(&self, parent: Option<NodeKey>) -> Option<&[NodeKey]> {
        match parent {
            None => Some(&self.root_children),
            Some(key) => self.nodes.get(key).map(|n| n.children.as_slice()),
        }
    }

    fn children_of_mut(&mut self, parent: Option<NodeKey>) -> Option<&mut Vec<NodeKey>> {
        match parent {
            None => Some(&mut self.root_children),
            Some(key) => self.nodes.get_mut(key).map(|n| &mut n.children),
        }
    }

    fn parent_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|n| n.parent)
    }

    fn row_of(&self, key: NodeKey) -> Option<usize> {
        let parent = self.nodes.get(key)?.parent;
        self.children_of(parent)?
            .iter()
            .position(|&child| child == key)
    }

    fn insert(&mut self, parent: Option<NodeKey>, row: usize, data: T) -> Option<NodeKey> {
        let len = self.children_of(parent)?.len();
        if row > len {
            return None;
        }
        let key = self.nodes.insert(TreeNode {
            data,
            children: Vec::new(),
            parent,
        });
        self.children_of_mut(parent)?.insert(row, key);
        Some(key)
    }

    fn detach(&mut self, key: NodeKey) {
        let parent = self.parent_of(key);
        if let Some(siblings) = self.children_of_mut(parent) {
            siblings.retain(|&child| child != key);
        }
    }

    fn remove_subtree(&mut self, key: NodeKey) -> Option<T> {
        let node = self.nodes.remove(key)?;
        for child in node.children {
            self.remove_subtree(child);
        }
        Some(node.data)
    }
}

/// Function mapping a node's data to a role value.
pub type TreeDataExtractor<T> = Arc<dyn Fn(&T, ItemRole) -> ItemData + Send + Sync>;
type TreeDataSetter<T> = Arc<dyn Fn(&mut T, ItemRole, ItemData) -> bool + Send + Sync>;
type TreeFlagsFn<T> = Arc<dyn Fn(&T) -> ItemFlags + Send + Sync>;

/// A hierarchical model of typed nodes.
///
/// # Example
///
/// ```
/// use horizon_diagram::model::{ItemModel, ModelIndex, TreeModel};
///
/// let model = TreeModel::<String>::new();
/// let package = model.add_root("package".to_string());
/// model.add_child(package, "ClassA".to_string());
///
/// let package_index = model.index_for_key(package);
/// assert_eq!(model.row_count(&package_index), 1);
/// ```
pub struct TreeModel<T> {
    storage: RwLock<TreeStorage<T>>,
    column_count: usize,
    extractor: TreeDataExtractor<T>,
    setter: Option<TreeDataSetter<T>>,
    flags: Option<TreeFlagsFn<T>>,
    signals: ModelSignals,
}

impl<T: TreeNodeData + 'static> TreeModel<T> {
    /// Creates a new empty tree model reading data through [`TreeNodeData`].
    pub fn new() -> Self {
        let mut model = Self::with_extractor(|node: &T, role: ItemRole| match role {
            ItemRole::Display => node.display(),
            ItemRole::ToolTip => node.tooltip(),
            _ => node.data(role),
        });
        model.setter = Some(Arc::new(|node: &mut T, role: ItemRole, value: ItemData| {
            node.set_data(role, value)
        }));
        model.flags = Some(Arc::new(|node: &T| node.flags()));
        model
    }
}

impl<T: TreeNodeData + 'static> Default for TreeModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> TreeModel<T> {
    /// Creates a new tree model with a custom data extractor.
    ///
    /// Such a model is read-only through [`ItemModel::set_data`] and reports
    /// default flags for every node.
    pub fn with_extractor<F>(extractor: F) -> Self
    where
        F: Fn(&T, ItemRole) -> ItemData + Send + Sync + 'static,
    {
        Self {
            storage: RwLock::new(TreeStorage::new()),
            column_count: 1,
            extractor: Arc::new(extractor),
            setter: None,
            flags: None,
            signals: ModelSignals::new(),
        }
    }

    /// Sets the number of columns.
    pub fn set_column_count(&mut self, count: usize) {
        self.column_count = count.max(1);
    }

    /// Appends a top-level node and returns its key.
    pub fn add_root(&self, data: T) -> NodeKey {
        let row = self.root_count();
        // Inserting at the end of the root list cannot fail.
        self.insert_node(None, row, data)
            .unwrap_or_default()
    }

    /// Appends a child under `parent`.
    ///
    /// Returns `None` if the parent doesn't exist.
    pub fn add_child(&self, parent: NodeKey, data: T) -> Option<NodeKey> {
        let row = self.storage.read().nodes.get(parent)?.children.len();
        self.insert_node(Some(parent), row, data)
    }

    /// Inserts a node at `row` under `parent` (`None` for top level).
    ///
    /// Returns `None` if the parent doesn't exist or `row` is past the end.
    pub fn insert_child(&self, parent: Option<NodeKey>, row: usize, data: T) -> Option<NodeKey> {
        self.insert_node(parent, row, data)
    }

    fn insert_node(&self, parent: Option<NodeKey>, row: usize, data: T) -> Option<NodeKey> {
        let parent_index = {
            let storage = self.storage.read();
            if row > storage.children_of(parent)?.len() {
                return None;
            }
            match parent {
                Some(p) => self.create_index_for_key(&storage, p, 0)?,
                None => ModelIndex::invalid(),
            }
        };

        let mut inserted = None;
        self.signals.emit_rows_inserted(parent_index, row, row, || {
            inserted = self.storage.write().insert(parent, row, data);
        });
        tracing::trace!(target: targets::MODEL, key = ?inserted, row, "node inserted");
        inserted
    }

    /// Removes a node and all its descendants.
    ///
    /// Returns the removed node's data, or `None` if the node doesn't exist.
    pub fn remove(&self, key: NodeKey) -> Option<T> {
        let (row, parent_index) = {
            let storage = self.storage.read();
            let row = storage.row_of(key)?;
            let parent_index = match storage.parent_of(key) {
                Some(p) => self.create_index_for_key(&storage, p, 0)?,
                None => ModelIndex::invalid(),
            };
            (row, parent_index)
        };

        let mut removed = None;
        self.signals.emit_rows_removed(parent_index, row, row, || {
            let mut storage = self.storage.write();
            storage.detach(key);
            removed = storage.remove_subtree(key);
        });
        removed
    }

    /// Removes rows `first..=last` under `parent` with a single notification.
    ///
    /// Returns the removed nodes' data in row order, or `None` if the parent
    /// is missing or the range is out of bounds.
    pub fn remove_rows(&self, parent: Option<NodeKey>, first: usize, last: usize) -> Option<Vec<T>> {
        let (doomed, parent_index) = {
            let storage = self.storage.read();
            let children = storage.children_of(parent)?;
            if first > last || last >= children.len() {
                return None;
            }
            let doomed = children[first..=last].to_vec();
            let parent_index = match parent {
                Some(p) => self.create_index_for_key(&storage, p, 0)?,
                None => ModelIndex::invalid(),
            };
            (doomed, parent_index)
        };

        let mut removed = Vec::with_capacity(doomed.len());
        self.signals.emit_rows_removed(parent_index, first, last, || {
            let mut storage = self.storage.write();
            if let Some(children) = storage.children_of_mut(parent) {
                children.drain(first..=last);
            }
            removed.extend(doomed.into_iter().filter_map(|key| storage.remove_subtree(key)));
        });
        Some(removed)
    }

    /// Clears all nodes from the tree.
    pub fn clear(&self) {
        self.signals.emit_reset(|| {
            let mut storage = self.storage.write();
            storage.nodes.clear();
            storage.root_children.clear();
        });
    }

    pub fn root_count(&self) -> usize {
        self.storage.read().root_children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.read().root_children.is_empty()
    }

    /// Whether `key` names a live node.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.storage.read().nodes.contains_key(key)
    }

    /// Keys of the children of `parent` (`None` for top level), in row order.
    pub fn children(&self, parent: Option<NodeKey>) -> Vec<NodeKey> {
        self.storage
            .read()
            .children_of(parent)
            .map(<[NodeKey]>::to_vec)
            .unwrap_or_default()
    }

    /// Provides read access to a node's data.
    pub fn with_node<F, R>(&self, key: NodeKey, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        let storage = self.storage.read();
        storage.nodes.get(key).map(|node| f(&node.data))
    }

    /// Provides mutable access to a node's data.
    ///
    /// Emits `data_changed` for the node's whole row after modification.
    pub fn modify_node<F, R>(&self, key: NodeKey, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let (result, top_left, bottom_right) = {
            let mut storage = self.storage.write();
            let node = storage.nodes.get_mut(key)?;
            let result = f(&mut node.data);
            let top_left = self.create_index_for_key(&storage, key, 0)?;
            let bottom_right = self.create_index_for_key(&storage, key, self.column_count - 1)?;
            (result, top_left, bottom_right)
        };
        self.signals
            .data_changed
            .emit((top_left, bottom_right, Vec::new()));
        Some(result)
    }

    /// Current index of the node, or an invalid index if it is gone.
    pub fn index_for_key(&self, key: NodeKey) -> ModelIndex {
        let storage = self.storage.read();
        self.create_index_for_key(&storage, key, 0)
            .unwrap_or_else(ModelIndex::invalid)
    }

    /// Node key addressed by `index`, if the node still exists.
    pub fn key_for_index(&self, index: &ModelIndex) -> Option<NodeKey> {
        let key = Self::key_of(index)?;
        self.contains(key).then_some(key)
    }

    /// Persistent handle for a node's first column.
    pub fn persistent_for_key(&self, key: NodeKey) -> PersistentIndex {
        PersistentIndex::from_key(key, 0)
    }

    fn key_of(index: &ModelIndex) -> Option<NodeKey> {
        PersistentIndex::from_index(index).map(|p| p.key())
    }

    fn create_index_for_key(
        &self,
        storage: &TreeStorage<T>,
        key: NodeKey,
        column: usize,
    ) -> Option<ModelIndex> {
        let row = storage.row_of(key)?;
        let parent_index = match storage.parent_of(key) {
            Some(p) => self.create_index_for_key(storage, p, 0)?,
            None => ModelIndex::invalid(),
        };
        Some(ModelIndex::new(
            row,
            column,
            parent_index,
            PersistentIndex::from_key(key, column).internal_id(),
        ))
    }

    /// Resolves a parent index to a storage parent. `None` when the parent
    /// index names a node that no longer exists.
    fn parent_key(storage: &TreeStorage<T>, parent: &ModelIndex) -> Option<Option<NodeKey>> {
        if !parent.is_valid() {
            return Some(None);
        }
        let key = Self::key_of(parent)?;
        storage.nodes.contains_key(key).then_some(Some(key))
    }
}

impl<T: Send + Sync + 'static> ItemModel for TreeModel<T> {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        let storage = self.storage.read();
        Self::parent_key(&storage, parent)
            .and_then(|p| storage.children_of(p).map(<[NodeKey]>::len))
            .unwrap_or(0)
    }

    fn column_count(&self, _parent: &ModelIndex) -> usize {
        self.column_count
    }

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
        let Some(key) = Self::key_of(index) else {
            return ItemData::None;
        };
        let storage = self.storage.read();
        match storage.nodes.get(key) {
            Some(node) => (self.extractor)(&node.data, role),
            None => ItemData::None,
        }
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if column >= self.column_count {
            return ModelIndex::invalid();
        }
        let storage = self.storage.read();
        let Some(parent_key) = Self::parent_key(&storage, parent) else {
            return ModelIndex::invalid();
        };
        match storage
            .children_of(parent_key)
            .and_then(|children| children.get(row))
        {
            Some(&child) => ModelIndex::new(
                row,
                column,
                parent.clone(),
                PersistentIndex::from_key(child, column).internal_id(),
            ),
            None => ModelIndex::invalid(),
        }
    }

    fn parent(&self, index: &ModelIndex) -> ModelIndex {
        let Some(key) = Self::key_of(index) else {
            return ModelIndex::invalid();
        };
        let storage = self.storage.read();
        storage
            .parent_of(key)
            .and_then(|p| self.create_index_for_key(&storage, p, 0))
            .unwrap_or_else(ModelIndex::invalid)
    }

    fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    fn resolve(&self, persistent: &PersistentIndex) -> ModelIndex {
        if persistent.column() >= self.column_count {
            return ModelIndex::invalid();
        }
        let storage = self.storage.read();
        self.create_index_for_key(&storage, persistent.key(), persistent.column())
            .unwrap_or_else(ModelIndex::invalid)
    }

    fn set_data(&self, index: &ModelIndex, value: ItemData, role: ItemRole) -> bool {
        let Some(setter) = &self.setter else {
            return false;
        };
        let Some(key) = Self::key_of(index) else {
            return false;
        };
        let accepted = {
            let mut storage = self.storage.write();
            match storage.nodes.get_mut(key) {
                Some(node) => setter(&mut node.data, role, value),
                None => false,
            }
        };
        if accepted {
            self.signals
                .emit_data_changed_single(index.clone(), vec![role]);
        }
        accepted
    }

    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        let Some(key) = Self::key_of(index) else {
            return ItemFlags::disabled();
        };
        let storage = self.storage.read();
        match (storage.nodes.get(key), &self.flags) {
            (Some(node), Some(flags)) => flags(&node.data),
            (Some(_), None) => ItemFlags::new(),
            (None, _) => ItemFlags::disabled(),
        }
    }
}

static_assertions::assert_impl_all!(TreeModel<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_tree_model_basic() {
        let model = TreeModel::<String>::new();
        let root = model.add_root("Root".to_string());
        let child1 = model.add_child(root, "Child 1".to_string()).unwrap();
        model.add_child(root, "Child 2".to_string()).unwrap();

        assert_eq!(model.root_count(), 1);
        let root_index = model.index(0, 0, &ModelIndex::invalid());
        assert_eq!(model.row_count(&root_index), 2);
        assert_eq!(model.display_text(&root_index), Some("Root".to_string()));

        let child_index = model.index(0, 0, &root_index);
        assert_eq!(model.parent(&child_index), root_index);
        assert_eq!(model.key_for_index(&child_index), Some(child1));
        assert_eq!(model.index_for_key(child1), child_index);
    }

    #[test]
    fn test_insert_child_at_row() {
        let model = TreeModel::<String>::new();
        let a = model.add_root("a".to_string());
        let c = model.add_root("c".to_string());
        let b = model.insert_child(None, 1, "b".to_string()).unwrap();

        assert_eq!(model.children(None), vec![a, b, c]);
        assert!(model.insert_child(None, 9, "x".to_string()).is_none());
    }

    #[test]
    fn test_resolve_tracks_position_and_detects_removal() {
        let model = TreeModel::<String>::new();
        let a = model.add_root("a".to_string());
        let b = model.add_root("b".to_string());
        let handle = model.persistent_for_key(b);

        assert_eq!(model.resolve(&handle).row(), 1);
        model.remove(a);
        assert_eq!(model.resolve(&handle).row(), 0);

        model.remove(b);
        assert!(!model.resolve(&handle).is_valid());

        // A new node may reuse the slot but never the identity.
        let reused = model.add_root("reused".to_string());
        assert_ne!(model.persistent_for_key(reused), handle);
        assert!(!model.resolve(&handle).is_valid());
    }

    #[test]
    fn test_remove_subtree() {
        let model = TreeModel::<String>::new();
        let root = model.add_root("root".to_string());
        let child = model.add_child(root, "child".to_string()).unwrap();
        let grandchild = model.add_child(child, "grandchild".to_string()).unwrap();

        assert_eq!(model.remove(child), Some("child".to_string()));
        assert!(!model.contains(grandchild));
        assert!(model.contains(root));
    }

    #[test]
    fn test_removal_notifies_before_delete() {
        let model = Arc::new(TreeModel::<String>::new());
        let root = model.add_root("root".to_string());
        for n in 0..5 {
            model.add_child(root, format!("c{n}")).unwrap();
        }

        let observed = Arc::new(Mutex::new(Vec::new()));
        let slot_model = model.clone();
        let observed_clone = observed.clone();
        model
            .signals()
            .rows_about_to_be_removed
            .connect(move |(parent, first, last)| {
                // The doomed rows must still be queryable.
                let labels: Vec<_> = (*first..=*last)
                    .map(|row| {
                        let index = slot_model.index(row, 0, parent);
                        slot_model.display_text(&index).unwrap_or_default()
                    })
                    .collect();
                observed_clone.lock().push(labels);
            });

        let removed = model.remove_rows(Some(root), 2, 4).unwrap();
        assert_eq!(removed, vec!["c2", "c3", "c4"]);
        assert_eq!(*observed.lock(), vec![vec!["c2", "c3", "c4"]]);
        assert_eq!(model.children(Some(root)).len(), 2);
    }

    #[test]
    fn test_insertion_is_bracketed_by_notifications() {
        let model = Arc::new(TreeModel::<String>::new());
        let root = model.add_root("root".to_string());

        let observed = Arc::new(Mutex::new(Vec::new()));
        for (stage, signal) in [
            ("about", &model.signals().rows_about_to_be_inserted),
            ("done", &model.signals().rows_inserted),
        ] {
            let slot_model = model.clone();
            let observed = observed.clone();
            signal.connect(move |(parent, first, _)| {
                let rows = slot_model.row_count(parent);
                observed.lock().push((stage, *first, rows));
            });
        }

        model.add_child(root, "a".to_string()).unwrap();
        assert_eq!(*observed.lock(), vec![("about", 0, 0), ("done", 0, 1)]);

        // A rejected insertion announces nothing.
        assert!(model.insert_child(Some(root), 5, "late".to_string()).is_none());
        assert_eq!(observed.lock().len(), 2);
    }

    #[test]
    fn test_remove_rows_rejects_bad_range() {
        let model = TreeModel::<String>::new();
        model.add_root("a".to_string());
        assert!(model.remove_rows(None, 0, 3).is_none());
        assert!(model.remove_rows(None, 1, 0).is_none());
        assert_eq!(model.root_count(), 1);
    }

    #[test]
    fn test_modify_node_emits_data_changed() {
        let model = TreeModel::<String>::new();
        let key = model.add_root("before".to_string());
        let changed = Arc::new(Mutex::new(Vec::new()));

        let changed_clone = changed.clone();
        model.signals().data_changed.connect(move |(tl, br, _)| {
            changed_clone.lock().push((tl.row(), br.row()));
        });

        model.modify_node(key, |label| *label = "after".to_string());
        assert_eq!(*changed.lock(), vec![(0, 0)]);
        assert_eq!(model.with_node(key, Clone::clone), Some("after".to_string()));
    }

    #[test]
    fn test_extra_columns_widen_data_changed() {
        let mut model = TreeModel::<String>::new();
        model.set_column_count(2);
        let key = model.add_root("row".to_string());
        let changed = Arc::new(Mutex::new(Vec::new()));

        let changed_clone = changed.clone();
        model.signals().data_changed.connect(move |(tl, br, _)| {
            changed_clone.lock().push((tl.column(), br.column()));
        });

        assert!(model.index(0, 1, &ModelIndex::invalid()).is_valid());
        assert!(!model.index(0, 2, &ModelIndex::invalid()).is_valid());
        model.modify_node(key, |label| label.push('*'));
        assert_eq!(*changed.lock(), vec![(0, 1)]);
    }

    #[test]
    fn test_stale_parent_index_has_no_rows() {
        let model = TreeModel::<String>::new();
        let root = model.add_root("root".to_string());
        model.add_child(root, "child".to_string());
        let stale = model.index_for_key(root);
        model.remove(root);

        assert_eq!(model.row_count(&stale), 0);
        assert!(!model.index(0, 0, &stale).is_valid());
        assert!(model.data(&stale, ItemRole::Display).is_none());
    }

    #[test]
    fn test_extractor_model() {
        struct Record {
            name: &'static str,
        }
        let model = TreeModel::with_extractor(|r: &Record, role| match role {
            ItemRole::Display => ItemData::from(r.name),
            _ => ItemData::None,
        });
        model.add_root(Record { name: "n" });
        let index = model.index(0, 0, &ModelIndex::invalid());
        assert_eq!(model.display_text(&index), Some("n".to_string()));
        assert!(!model.set_data(&index, ItemData::from("x"), ItemRole::Display));
        assert!(model.flags(&index).selectable);
    }
}
