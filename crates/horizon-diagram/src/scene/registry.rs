//! The element registry: a one-to-one map between persistent indices and
//! graphical elements.
//!
//! Elements live in a slot map keyed by [`ElementId`]. A second map from
//! [`PersistentIndex`] to `ElementId` keeps entries in traversal order
//! (pre-order over the materialized subtree, siblings by row), which is
//! also the tie-breaking paint order.

use indexmap::IndexMap;
use slotmap::SlotMap;

use horizon_diagram_core::logging::targets;

use super::element::{ElementId, GraphicalElement};
use crate::error::RegistryError;
use crate::model::PersistentIndex;

/// Owns every graphical element of a scene.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    elements: SlotMap<ElementId, GraphicalElement>,
    order: IndexMap<PersistentIndex, ElementId>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, index: &PersistentIndex) -> bool {
        self.order.contains_key(index)
    }

    /// The element registered for `index`.
    pub fn lookup(&self, index: &PersistentIndex) -> Option<&GraphicalElement> {
        let id = *self.order.get(index)?;
        self.elements.get(id)
    }

    pub fn lookup_mut(&mut self, index: &PersistentIndex) -> Option<&mut GraphicalElement> {
        let id = *self.order.get(index)?;
        self.elements.get_mut(id)
    }

    pub fn element_id(&self, index: &PersistentIndex) -> Option<ElementId> {
        self.order.get(index).copied()
    }

    pub fn get(&self, id: ElementId) -> Option<&GraphicalElement> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut GraphicalElement> {
        self.elements.get_mut(id)
    }

    /// Reverse lookup: the index an element represents.
    pub fn index_of(&self, id: ElementId) -> Option<PersistentIndex> {
        self.elements.get(id).map(|element| element.index)
    }

    /// Traversal position of `index`.
    pub fn position_of(&self, index: &PersistentIndex) -> Option<usize> {
        self.order.get_index_of(index)
    }

    /// The entry at a traversal position.
    pub fn at_position(&self, position: usize) -> Option<(ElementId, &GraphicalElement)> {
        let (_, &id) = self.order.get_index(position)?;
        self.elements.get(id).map(|element| (id, element))
    }

    /// Registers `element` for `index` after every existing entry.
    pub fn insert(
        &mut self,
        index: PersistentIndex,
        element: GraphicalElement,
    ) -> Result<ElementId, RegistryError> {
        let position = self.len();
        self.insert_at(position, index, element)
    }

    /// Registers `element` for `index` at a traversal position.
    ///
    /// Positions past the end append.
    pub fn insert_at(
        &mut self,
        position: usize,
        index: PersistentIndex,
        mut element: GraphicalElement,
    ) -> Result<ElementId, RegistryError> {
        if self.order.contains_key(&index) {
            return Err(RegistryError::AlreadyRegistered(index));
        }
        element.index = index;
        let id = self.elements.insert(element);
        let position = position.min(self.order.len());
        self.order.shift_insert(position, index, id);
        tracing::trace!(target: targets::REGISTRY, ?index, ?id, position, "element registered");
        Ok(id)
    }

    /// Unregisters `index` and hands back its element.
    pub fn remove(
        &mut self,
        index: &PersistentIndex,
    ) -> Result<(ElementId, GraphicalElement), RegistryError> {
        let id = self
            .order
            .shift_remove(index)
            .ok_or(RegistryError::NotRegistered(*index))?;
        let element = self
            .elements
            .remove(id)
            .ok_or(RegistryError::NotRegistered(*index))?;
        tracing::trace!(target: targets::REGISTRY, ?index, ?id, "element unregistered");
        Ok((id, element))
    }

    /// Drains every entry in traversal order.
    pub fn clear(&mut self) -> Vec<(ElementId, GraphicalElement)> {
        let drained: Vec<_> = self
            .order
            .drain(..)
            .filter_map(|(_, id)| self.elements.remove(id).map(|element| (id, element)))
            .collect();
        self.elements.clear();
        drained
    }

    /// Entries in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &GraphicalElement)> + '_ {
        self.order
            .values()
            .filter_map(|&id| self.elements.get(id).map(|element| (id, element)))
    }

    /// Registered indices in traversal order.
    pub fn indices(&self) -> impl Iterator<Item = &PersistentIndex> + '_ {
        self.order.keys()
    }

    /// One past the last position of the subtree starting at `position`.
    ///
    /// Descendants follow their ancestor directly in traversal order and
    /// carry a greater depth.
    pub fn subtree_end(&self, position: usize) -> usize {
        let Some((_, root)) = self.at_position(position) else {
            return self.len();
        };
        let depth = root.depth();
        let mut end = position + 1;
        while let Some((_, element)) = self.at_position(end) {
            if element.depth() <= depth {
                break;
            }
            end += 1;
        }
        end
    }

    /// Registered children of `parent` (`None` for the scene root) in row order.
    ///
    /// Walks the parent's subtree range, stepping over each child's own
    /// subtree.
    pub fn children_of(&self, parent: Option<PersistentIndex>) -> Vec<PersistentIndex> {
        let (mut position, end) = match parent {
            Some(key) => match self.position_of(&key) {
                Some(start) => (start + 1, self.subtree_end(start)),
                None => return Vec::new(),
            },
            None => (0, self.len()),
        };
        let mut children = Vec::new();
        while position < end {
            let Some((_, element)) = self.at_position(position) else {
                break;
            };
            children.push(element.index);
            position = self.subtree_end(position);
        }
        children
    }

    /// Entries back to front: ascending z-value, then traversal order.
    pub fn paint_order(&self) -> Vec<(ElementId, &GraphicalElement)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|(_, a), (_, b)| a.z_value().total_cmp(&b.z_value()));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_diagram_geometry::Rect;

    fn element(depth: usize) -> GraphicalElement {
        GraphicalElement::new(Rect::new(0.0, 0.0, 10.0, 10.0)).with_parent(None, depth)
    }

    fn child(parent: PersistentIndex, depth: usize) -> GraphicalElement {
        GraphicalElement::new(Rect::new(0.0, 0.0, 10.0, 10.0)).with_parent(Some(parent), depth)
    }

    fn pi(id: u64) -> PersistentIndex {
        PersistentIndex::new(id, 0)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = ElementRegistry::new();
        let id = registry.insert(pi(1), element(0)).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.element_id(&pi(1)), Some(id));
        assert_eq!(registry.index_of(id), Some(pi(1)));
        assert_eq!(registry.lookup(&pi(1)).map(|e| e.index()), Some(pi(1)));
        assert!(registry.lookup(&pi(2)).is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut registry = ElementRegistry::new();
        registry.insert(pi(1), element(0)).unwrap();
        assert_eq!(
            registry.insert(pi(1), element(0)),
            Err(RegistryError::AlreadyRegistered(pi(1)))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_missing() {
        let mut registry = ElementRegistry::new();
        assert_eq!(
            registry.remove(&pi(3)).map(|(id, _)| id),
            Err(RegistryError::NotRegistered(pi(3)))
        );
    }

    #[test]
    fn test_insert_at_keeps_traversal_order() {
        let mut registry = ElementRegistry::new();
        registry.insert(pi(1), element(0)).unwrap();
        registry.insert(pi(3), element(0)).unwrap();
        registry.insert_at(1, pi(2), element(0)).unwrap();
        registry.insert_at(99, pi(4), element(0)).unwrap();

        let order: Vec<_> = registry.indices().copied().collect();
        assert_eq!(order, vec![pi(1), pi(2), pi(3), pi(4)]);
        assert_eq!(registry.position_of(&pi(3)), Some(2));
    }

    #[test]
    fn test_remove_frees_element() {
        let mut registry = ElementRegistry::new();
        let id = registry.insert(pi(1), element(0)).unwrap();
        registry.insert(pi(2), element(0)).unwrap();

        let (removed_id, removed) = registry.remove(&pi(1)).unwrap();
        assert_eq!(removed_id, id);
        assert_eq!(removed.index(), pi(1));
        assert!(registry.get(id).is_none());
        assert_eq!(registry.position_of(&pi(2)), Some(0));
    }

    #[test]
    fn test_subtree_end() {
        let mut registry = ElementRegistry::new();
        // a, a/x, a/x/y, b
        registry.insert(pi(1), element(0)).unwrap();
        registry.insert(pi(2), element(1)).unwrap();
        registry.insert(pi(3), element(2)).unwrap();
        registry.insert(pi(4), element(0)).unwrap();

        assert_eq!(registry.subtree_end(0), 3);
        assert_eq!(registry.subtree_end(1), 3);
        assert_eq!(registry.subtree_end(3), 4);
        assert_eq!(registry.subtree_end(10), 4);
    }

    #[test]
    fn test_children_of_skips_grandchildren() {
        let mut registry = ElementRegistry::new();
        // a { a1 { a11 } a2 } b
        registry.insert(pi(1), element(0)).unwrap();
        registry.insert(pi(2), child(pi(1), 1)).unwrap();
        registry.insert(pi(3), child(pi(2), 2)).unwrap();
        registry.insert(pi(4), child(pi(1), 1)).unwrap();
        registry.insert(pi(5), element(0)).unwrap();

        assert_eq!(registry.children_of(None), vec![pi(1), pi(5)]);
        assert_eq!(registry.children_of(Some(pi(1))), vec![pi(2), pi(4)]);
        assert_eq!(registry.children_of(Some(pi(2))), vec![pi(3)]);
        assert!(registry.children_of(Some(pi(5))).is_empty());
        assert!(registry.children_of(Some(pi(9))).is_empty());
    }

    #[test]
    fn test_paint_order_by_z_then_traversal() {
        let mut registry = ElementRegistry::new();
        registry.insert(pi(1), element(0).with_z_value(1.0)).unwrap();
        registry.insert(pi(2), element(0)).unwrap();
        registry.insert(pi(3), element(0)).unwrap();

        let order: Vec<_> = registry.paint_order().iter().map(|(_, e)| e.index()).collect();
        assert_eq!(order, vec![pi(2), pi(3), pi(1)]);
    }

    #[test]
    fn test_clear_drains_everything() {
        let mut registry = ElementRegistry::new();
        let a = registry.insert(pi(1), element(0)).unwrap();
        let b = registry.insert(pi(2), element(0)).unwrap();

        let drained: Vec<_> = registry.clear().into_iter().map(|(id, _)| id).collect();
        assert_eq!(drained, vec![a, b]);
        assert!(registry.is_empty());
        assert!(registry.get(a).is_none());
    }
}
