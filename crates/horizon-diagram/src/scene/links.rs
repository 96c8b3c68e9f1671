//! Connectors between elements.
//!
//! A scene links every element to its parent element and to the sibling
//! that follows it in row order. Links are derived from the registry's
//! traversal order and recomputed whenever the structure changes; the
//! canvas draws them as branch lines.

use std::collections::HashMap;

use super::element::ElementId;
use super::registry::ElementRegistry;
use crate::model::PersistentIndex;

/// How the two ends of a [`SceneLink`] are related.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// From a parent element to one of its children.
    Child,
    /// From an element to the next sibling in row order.
    Sibling,
}

/// A connector between two elements of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneLink {
    pub kind: LinkKind,
    pub from: ElementId,
    pub to: ElementId,
}

impl SceneLink {
    pub fn new(kind: LinkKind, from: ElementId, to: ElementId) -> Self {
        Self { kind, from, to }
    }
}

/// Parent-to-child and sibling-to-sibling links of every registered
/// element, in traversal order.
///
/// Entries directly under the scene root have no parent element; they are
/// only linked to each other.
pub(crate) fn collect_links(registry: &ElementRegistry) -> Vec<SceneLink> {
    let mut links = Vec::with_capacity(registry.len() * 2);
    let mut last_child: HashMap<Option<PersistentIndex>, ElementId> = HashMap::new();

    for (id, element) in registry.iter() {
        let parent = element.parent();
        if let Some(parent_id) = parent.and_then(|key| registry.element_id(&key)) {
            links.push(SceneLink::new(LinkKind::Child, parent_id, id));
        }
        if let Some(previous) = last_child.insert(parent, id) {
            links.push(SceneLink::new(LinkKind::Sibling, previous, id));
        }
    }
    links
}
