//! Graphical elements: the on-canvas objects that stand for model entries.

use slotmap::new_key_type;

use horizon_diagram_geometry::{Point, Rect, Size};

use crate::model::{ItemModel, ItemRole, ModelIndex, PersistentIndex};

new_key_type! {
    /// Identifies an element in an [`ElementRegistry`](super::ElementRegistry).
    ///
    /// The canvas holds these ids instead of references to elements, so a
    /// destroyed element leaves nothing dangling behind.
    pub struct ElementId;
}

/// Display content copied from the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementContent {
    /// Text from the `Display` role.
    pub label: String,
    pub tooltip: Option<String>,
    /// Value of the `ElementKind` role (e.g. "class", "package").
    pub kind: Option<String>,
    /// Icon or glyph name from the `Decoration` role.
    pub decoration: Option<String>,
}

impl ElementContent {
    /// Reads the content roles of `index`.
    pub fn from_model(model: &dyn ItemModel, index: &ModelIndex) -> Self {
        Self {
            label: model
                .data(index, ItemRole::Display)
                .into_string()
                .unwrap_or_default(),
            tooltip: model.data(index, ItemRole::ToolTip).into_string(),
            kind: model.data(index, ItemRole::ElementKind).into_string(),
            decoration: model.data(index, ItemRole::Decoration).into_string(),
        }
    }
}

/// The visual representation of one model entry.
///
/// Elements are owned by the registry. Every element knows the persistent
/// index it represents, its parent entry and its depth below the scene root.
#[derive(Debug, Clone)]
pub struct GraphicalElement {
    pub(crate) index: PersistentIndex,
    parent: Option<PersistentIndex>,
    depth: usize,
    rect: Rect,
    z_value: f32,
    visible: bool,
    selected: bool,
    content: ElementContent,
    revision: u64,
}

impl GraphicalElement {
    /// Creates a visible element covering `rect`.
    ///
    /// The persistent index is assigned when the element is registered.
    pub fn new(rect: Rect) -> Self {
        Self {
            index: PersistentIndex::new(0, 0),
            parent: None,
            depth: 0,
            rect,
            z_value: 0.0,
            visible: true,
            selected: false,
            content: ElementContent::default(),
            revision: 0,
        }
    }

    /// Sets the parent entry and depth (0 for entries directly under the root).
    pub fn with_parent(mut self, parent: Option<PersistentIndex>, depth: usize) -> Self {
        self.parent = parent;
        self.depth = depth;
        self
    }

    pub fn with_z_value(mut self, z: f32) -> Self {
        self.z_value = z;
        self
    }

    pub fn with_content(mut self, content: ElementContent) -> Self {
        self.content = content;
        self
    }

    /// The model entry this element represents.
    pub fn index(&self) -> PersistentIndex {
        self.index
    }

    /// The parent entry, or `None` for entries directly under the scene root.
    pub fn parent(&self) -> Option<PersistentIndex> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bounding rectangle in scene coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    pub fn z_value(&self) -> f32 {
        self.z_value
    }

    pub fn set_z_value(&mut self, z: f32) {
        self.z_value = z;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Mirrors the entry's state in the scene's selection model.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn content(&self) -> &ElementContent {
        &self.content
    }

    pub fn label(&self) -> &str {
        &self.content.label
    }

    /// Number of times the element has been refreshed from the model.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the content and bumps the revision.
    pub fn refresh(&mut self, content: ElementContent) {
        self.content = content;
        self.revision += 1;
    }
}

/// Geometry the model asks for through the `Position` and `SizeHint` roles.
pub(crate) fn model_geometry(model: &dyn ItemModel, index: &ModelIndex) -> (Option<Point>, Option<Size>) {
    let position = model.data(index, ItemRole::Position).as_point();
    let size = model
        .data(index, ItemRole::SizeHint)
        .as_size()
        .filter(|size| !size.is_empty());
    (position, size)
}
