//! The diagram scene: keeps graphical elements in step with an item model.
//!
//! [`DiagramScene`] observes an [`ItemModel`] through the [`ModelObserver`]
//! protocol and owns the [`ElementRegistry`] that maps every materialized
//! entry to exactly one [`GraphicalElement`]. It also answers the
//! canvas-side questions that need the mapping in reverse: what is under a
//! point, where is an entry drawn, which entries does a rubber band cover.
//!
//! # Materialized subtree
//!
//! The scene mirrors the subtree below its root index (the whole model when
//! no root is set). Entries directly under the root have depth 0 and no
//! parent element. Elements are kept in traversal order: pre-order, siblings
//! by row.
//!
//! # Coordinates
//!
//! Element rectangles, hit-test points and selection regions are all in
//! scene coordinates. The canvas viewport is a window onto the scene.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use horizon_diagram_core::logging::{span_names, targets};
use horizon_diagram_core::{PerfSpan, ThreadAffinity};
use horizon_diagram_geometry::{Point, Rect, Region};

use super::canvas::{Canvas, ScrollHint};
use super::element::{model_geometry, ElementContent, ElementId, GraphicalElement};
use super::interaction::{directional_score, CursorAction, KeyboardModifiers, SelectionCommand};
use super::links::{collect_links, SceneLink};
use super::registry::ElementRegistry;
use crate::config::SceneConfig;
use crate::error::{RegistryError, SceneError, SceneResult};
use crate::model::{
    ItemModel, ItemRole, ModelIndex, ModelObserver, PersistentIndex, SelectionFlags,
    SelectionMode, SelectionModel,
};

/// A canvas-backed view of an item model.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_diagram::prelude::*;
///
/// let model = Arc::new(TreeModel::<String>::new());
/// let a = model.add_root("a".to_string());
///
/// let mut scene = DiagramScene::new(model.clone(), SceneCanvas::default(), SceneConfig::default())?;
/// assert_eq!(scene.registry().len(), 1);
///
/// let rect = scene.visual_rect(&model.index_for_key(a)).unwrap();
/// assert_eq!(scene.index_at(rect.center()), model.index_for_key(a));
/// # Ok::<(), horizon_diagram::SceneError>(())
/// ```
pub struct DiagramScene<C: Canvas> {
    model: Arc<dyn ItemModel>,
    registry: ElementRegistry,
    canvas: C,
    selection: SelectionModel,
    root: Option<PersistentIndex>,
    config: SceneConfig,
    affinity: ThreadAffinity,
    links: Vec<SceneLink>,
    /// Rightmost child rectangle per parent entry, filled on demand.
    rightmost: HashMap<Option<PersistentIndex>, Rect>,
    /// Set when the root was removed; the rebuild runs on `rows_removed`.
    rebuild_pending: bool,
}

impl<C: Canvas> DiagramScene<C> {
    /// Creates a scene over the whole model and materializes it.
    pub fn new(model: Arc<dyn ItemModel>, canvas: C, config: SceneConfig) -> SceneResult<Self> {
        config.validate()?;
        let mut scene = Self {
            model,
            registry: ElementRegistry::new(),
            canvas,
            selection: SelectionModel::with_mode(config.selection_mode),
            root: None,
            config,
            affinity: ThreadAffinity::current(),
            links: Vec::new(),
            rightmost: HashMap::new(),
            rebuild_pending: false,
        };
        scene.populate();
        Ok(scene)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn model(&self) -> &Arc<dyn ItemModel> {
        &self.model
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    /// The selection state. Connect to its signals to observe changes;
    /// mutate it through the scene so affected elements get repainted.
    pub fn selection_model(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// The root whose subtree is materialized; invalid for the whole model.
    pub fn root_index(&self) -> ModelIndex {
        self.root
            .map(|root| self.model.resolve(&root))
            .unwrap_or_else(ModelIndex::invalid)
    }

    /// Parent-to-child and sibling links between the current elements.
    pub fn links(&self) -> &[SceneLink] {
        &self.links
    }

    /// The element for `index`, if it is materialized.
    pub fn element(&self, index: &ModelIndex) -> Option<&GraphicalElement> {
        let key = self.model.persistent_index(index)?;
        self.registry.lookup(&key)
    }

    pub fn element_id(&self, index: &ModelIndex) -> Option<ElementId> {
        let key = self.model.persistent_index(index)?;
        self.registry.element_id(&key)
    }

    // =========================================================================
    // Root and rebuilds
    // =========================================================================

    /// Makes `root` the scene root and rebuilds from its children.
    ///
    /// An invalid index selects the whole model.
    pub fn set_root_index(&mut self, root: &ModelIndex) {
        self.affinity.debug_assert_same_thread();
        self.root = self.model.persistent_index(root);
        tracing::debug!(target: targets::SCENE, root = ?self.root, "root index changed");
        self.rebuild();
    }

    /// Drops every element and the selection. The root is kept.
    pub fn reset(&mut self) {
        self.affinity.debug_assert_same_thread();
        let drained = self.registry.clear();
        for (id, _) in &drained {
            self.canvas.detach(*id);
        }
        self.canvas.clear();
        self.selection.reset();
        self.links.clear();
        self.rightmost.clear();
        self.rebuild_pending = false;
        tracing::debug!(target: targets::SCENE, removed = drained.len(), "scene reset");
    }

    /// Resets and materializes the subtree under the current root again.
    pub fn rebuild(&mut self) {
        self.reset();
        self.populate();
    }

    fn populate(&mut self) {
        let _perf = PerfSpan::new(span_names::REBUILD);
        let root_index = match self.root {
            Some(root) => {
                let index = self.model.resolve(&root);
                if !index.is_valid() {
                    tracing::warn!(
                        target: targets::SCENE,
                        ?root,
                        "root index no longer resolves; showing the whole model"
                    );
                    self.root = None;
                }
                index
            }
            None => ModelIndex::invalid(),
        };

        let mut count = 0;
        for row in 0..self.model.row_count(&root_index) {
            let child = self.model.index(row, 0, &root_index);
            if child.is_valid() {
                count += self.materialize(&child, None, 0);
            }
        }
        self.update_links();
        tracing::debug!(target: targets::SCENE, elements = count, "scene populated");
    }

    /// Recomputes the links from traversal order and hands them to the
    /// canvas. Runs after every structural change.
    pub fn update_links(&mut self) {
        self.links = collect_links(&self.registry);
        self.canvas.set_links(&self.links);
        tracing::trace!(target: targets::SCENE, links = self.links.len(), "links updated");
    }

    // =========================================================================
    // Materialization
    // =========================================================================

    /// Whether children of `parent` belong to the materialized subtree.
    fn is_materialized_parent(&self, parent: &ModelIndex) -> bool {
        if !parent.is_valid() {
            return self.root.is_none();
        }
        match self.model.persistent_index(parent) {
            Some(key) => self.root == Some(key) || self.registry.contains(&key),
            None => false,
        }
    }

    /// Parent element key for children of `parent`; `None` directly under the root.
    fn parent_key(&self, parent: &ModelIndex) -> Option<PersistentIndex> {
        let key = self.model.persistent_index(parent)?;
        (self.root != Some(key)).then_some(key)
    }

    fn child_depth(&self, parent: Option<PersistentIndex>) -> usize {
        parent
            .and_then(|key| self.registry.lookup(&key))
            .map_or(0, |element| element.depth() + 1)
    }

    /// Registers `index` and its existing descendants. Returns how many
    /// elements were created.
    fn materialize(
        &mut self,
        index: &ModelIndex,
        parent: Option<PersistentIndex>,
        depth: usize,
    ) -> usize {
        let Some(key) = self.model.persistent_index(index) else {
            return 0;
        };

        let position = self.insertion_position(index, parent);
        let rect = self.initial_rect(index, parent);
        let element = GraphicalElement::new(rect)
            .with_parent(parent, depth)
            .with_z_value(self.config.default_z)
            .with_content(ElementContent::from_model(self.model.as_ref(), index));

        match self.registry.insert_at(position, key, element) {
            Ok(id) => {
                self.canvas.attach(id, rect);
                self.canvas.update_rect(rect);
                if let Some(rightmost) = self.rightmost.get_mut(&parent)
                    && rect.right() >= rightmost.right()
                {
                    *rightmost = rect;
                }
            }
            Err(err) => {
                self.report_violation(&err);
                return 0;
            }
        }

        let mut count = 1;
        for row in 0..self.model.row_count(index) {
            let child = self.model.index(row, 0, index);
            if child.is_valid() {
                count += self.materialize(&child, Some(key), depth + 1);
            }
        }
        count
    }

    /// Traversal position for a new element: after the closest registered
    /// preceding sibling's subtree, else before the closest registered
    /// following sibling, else right after the parent.
    fn insertion_position(&self, index: &ModelIndex, parent: Option<PersistentIndex>) -> usize {
        let model_parent = index.parent();
        let registered = |row: usize| {
            let sibling = self.model.index(row, 0, &model_parent);
            self.model
                .persistent_index(&sibling)
                .and_then(|key| self.registry.position_of(&key))
        };

        let row = index.row();
        if let Some(position) = (0..row).rev().find_map(&registered) {
            return self.registry.subtree_end(position);
        }
        let row_count = self.model.row_count(&model_parent);
        if let Some(position) = (row + 1..row_count).find_map(&registered) {
            return position;
        }
        match parent.and_then(|key| self.registry.position_of(&key)) {
            Some(position) => position + 1,
            None => 0,
        }
    }

    /// Initial rectangle: the model's position and size when it gives them,
    /// otherwise a free slot to the right of the siblings.
    fn initial_rect(&mut self, index: &ModelIndex, parent: Option<PersistentIndex>) -> Rect {
        let (position, size) = model_geometry(self.model.as_ref(), index);
        let size = size.unwrap_or_else(|| self.config.node_size());
        let origin = position.unwrap_or_else(|| self.free_slot(parent));
        Rect::from_origin_size(origin, size)
    }

    fn free_slot(&mut self, parent: Option<PersistentIndex>) -> Point {
        let cached = self.rightmost.get(&parent).copied();
        let rightmost = match cached {
            Some(rect) => Some(rect),
            None => {
                let scanned = self
                    .registry
                    .children_of(parent)
                    .iter()
                    .filter_map(|key| self.registry.lookup(key))
                    .map(GraphicalElement::rect)
                    .max_by(|a, b| a.right().total_cmp(&b.right()));
                if let Some(rect) = scanned {
                    self.rightmost.insert(parent, rect);
                }
                scanned
            }
        };
        if let Some(sibling) = rightmost {
            return Point::new(sibling.right() + self.config.sibling_spacing, sibling.top());
        }
        match parent.and_then(|key| self.registry.lookup(&key)) {
            Some(parent) => {
                let rect = parent.rect();
                Point::new(rect.left(), rect.bottom() + self.config.level_spacing)
            }
            None => self.config.origin(),
        }
    }

    /// Releases the given elements: deselects them, detaches them from the
    /// canvas and destroys them. Descendants must be listed after their
    /// ancestors; they are destroyed first.
    fn release(&mut self, doomed: &[PersistentIndex]) -> usize {
        if doomed.is_empty() {
            return 0;
        }
        self.selection.forget(doomed);
        let mut released = 0;
        for key in doomed.iter().rev() {
            match self.registry.remove(key) {
                Ok((id, element)) => {
                    self.canvas.detach(id);
                    self.canvas.update_rect(element.rect());
                    self.rightmost.remove(&element.parent());
                    self.rightmost.remove(&Some(*key));
                    released += 1;
                }
                Err(err) => self.report_violation(&err),
            }
        }
        self.update_links();
        released
    }

    /// Registry keys of the element at `key` and all its descendants.
    fn subtree_keys(&self, key: &PersistentIndex) -> Vec<PersistentIndex> {
        let Some(start) = self.registry.position_of(key) else {
            return Vec::new();
        };
        let end = self.registry.subtree_end(start);
        (start..end)
            .filter_map(|position| self.registry.at_position(position))
            .map(|(_, element)| element.index())
            .collect()
    }

    /// Whether the root entry is one of `first..=last` under `parent`, or
    /// lies below one of them.
    fn root_within(&self, parent: &ModelIndex, first: usize, last: usize) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let root = self.model.resolve(&root);
        root.is_valid()
            && (first..=last).any(|row| {
                let index = self.model.index(row, 0, parent);
                index.is_valid() && (index == root || root.is_descendant_of(&index))
            })
    }

    fn report_violation(&self, err: &RegistryError) {
        tracing::warn!(target: targets::REGISTRY, %err, "registry invariant violated; skipping");
        debug_assert!(false, "registry invariant violated: {err}");
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Removes every element whose entry no longer resolves.
    ///
    /// A model that honors the notification contract never leaves stale
    /// elements behind. This recovers from one that does not, and from
    /// notifications that had to be deferred. If the root itself vanished
    /// the scene falls back to the whole model. Returns the number of
    /// elements removed.
    pub fn sweep_stale(&mut self) -> usize {
        self.affinity.debug_assert_same_thread();
        if let Some(root) = self.root
            && !self.model.resolve(&root).is_valid()
        {
            let removed = self.registry.len();
            tracing::warn!(target: targets::SCENE, ?root, "root vanished without notification");
            self.root = None;
            self.rebuild();
            return removed;
        }

        let stale: Vec<PersistentIndex> = self
            .registry
            .indices()
            .filter(|key| !self.model.resolve(key).is_valid())
            .copied()
            .collect();
        if !stale.is_empty() {
            tracing::warn!(
                target: targets::SCENE,
                count = stale.len(),
                "removing elements whose entries vanished without notification"
            );
        }
        self.release(&stale)
    }

    /// Materializes every child of `parent` that has no element yet.
    ///
    /// Returns the number of elements created, descendants included.
    pub fn reconcile_children(&mut self, parent: &ModelIndex) -> usize {
        self.affinity.debug_assert_same_thread();
        if !self.is_materialized_parent(parent) {
            return 0;
        }
        let parent_key = self.parent_key(parent);
        let depth = self.child_depth(parent_key);
        let mut added = 0;
        for row in 0..self.model.row_count(parent) {
            let child = self.model.index(row, 0, parent);
            let missing = self
                .model
                .persistent_index(&child)
                .is_some_and(|key| !self.registry.contains(&key));
            if missing {
                added += self.materialize(&child, parent_key, depth);
            }
        }
        if added > 0 {
            self.update_links();
        }
        added
    }

    /// Checks that the registry mirrors the materialized subtree exactly,
    /// in traversal order. Fails off the scene's thread.
    pub fn verify(&self) -> SceneResult<()> {
        self.affinity.check("verify")?;
        let mut expected = Vec::new();
        let root = self.root_index();
        if self.root.is_some() && !root.is_valid() {
            return Err(SceneError::Inconsistent("root index no longer resolves".into()));
        }
        self.collect_subtree(&root, &mut expected);

        let actual: Vec<PersistentIndex> = self.registry.indices().copied().collect();
        if actual.len() != expected.len() {
            return Err(SceneError::Inconsistent(format!(
                "{} elements for {} model entries",
                actual.len(),
                expected.len()
            )));
        }
        if let Some(position) = actual.iter().zip(&expected).position(|(a, e)| a != e) {
            return Err(SceneError::Inconsistent(format!(
                "traversal order differs at position {position}"
            )));
        }
        Ok(())
    }

    fn collect_subtree(&self, parent: &ModelIndex, out: &mut Vec<PersistentIndex>) {
        for row in 0..self.model.row_count(parent) {
            let child = self.model.index(row, 0, parent);
            if let Some(key) = self.model.persistent_index(&child) {
                out.push(key);
                self.collect_subtree(&child, out);
            }
        }
    }

    // =========================================================================
    // Geometry and hit-testing
    // =========================================================================

    /// The topmost visible entry whose element contains `point`.
    ///
    /// Higher z-values are on top; on equal z-values the later element in
    /// traversal order wins. Returns an invalid index when nothing is hit.
    pub fn index_at(&self, point: Point) -> ModelIndex {
        self.registry
            .paint_order()
            .into_iter()
            .rev()
            .find(|(_, element)| element.is_visible() && element.rect().contains(point))
            .map(|(_, element)| self.model.resolve(&element.index()))
            .unwrap_or_else(ModelIndex::invalid)
    }

    /// The rectangle `index` is drawn in, or `None` if it is not materialized.
    pub fn visual_rect(&self, index: &ModelIndex) -> Option<Rect> {
        self.element(index).map(GraphicalElement::rect)
    }

    /// Scrolls the canvas so the element for `index` is shown per `hint`.
    pub fn scroll_to(&mut self, index: &ModelIndex, hint: ScrollHint) {
        let Some(rect) = self.visual_rect(index) else {
            return;
        };
        let viewport = self.canvas.viewport();
        if hint == ScrollHint::EnsureVisible && viewport.contains_rect(&rect) {
            return;
        }

        let x = match hint {
            ScrollHint::PositionAtCenter => rect.center().x - viewport.width() / 2.0,
            _ => ensure_span_visible(viewport.left(), viewport.width(), rect.left(), rect.right()),
        };
        let y = match hint {
            ScrollHint::EnsureVisible => {
                ensure_span_visible(viewport.top(), viewport.height(), rect.top(), rect.bottom())
            }
            ScrollHint::PositionAtTop => rect.top(),
            ScrollHint::PositionAtBottom => rect.bottom() - viewport.height(),
            ScrollHint::PositionAtCenter => rect.center().y - viewport.height() / 2.0,
        };

        self.canvas.set_viewport_origin(Point::new(x, y));
    }

    pub fn horizontal_offset(&self) -> f32 {
        self.canvas.viewport().left()
    }

    pub fn vertical_offset(&self) -> f32 {
        self.canvas.viewport().top()
    }

    /// Whether `index` has no visible element.
    pub fn is_index_hidden(&self, index: &ModelIndex) -> bool {
        !self.element(index).is_some_and(GraphicalElement::is_visible)
    }

    /// Shows or hides the element for `index`. Returns `false` if it is
    /// not materialized.
    pub fn set_element_visible(&mut self, index: &ModelIndex, visible: bool) -> bool {
        let Some(id) = self.element_id(index) else {
            return false;
        };
        let Some(element) = self.registry.get_mut(id) else {
            return false;
        };
        if element.is_visible() != visible {
            element.set_visible(visible);
            let rect = element.rect();
            self.canvas.update_rect(rect);
        }
        true
    }

    /// Changes the stacking order of the element for `index`.
    pub fn set_element_z_value(&mut self, index: &ModelIndex, z: f32) -> bool {
        let Some(id) = self.element_id(index) else {
            return false;
        };
        let Some(element) = self.registry.get_mut(id) else {
            return false;
        };
        element.set_z_value(z);
        let rect = element.rect();
        self.canvas.update_rect(rect);
        true
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Applies `command` to every selectable entry whose visible element
    /// intersects `region`, as one selection change.
    ///
    /// A zero-area region selects what lies under its origin.
    pub fn set_selection(&mut self, region: Rect, command: SelectionCommand) {
        self.affinity.debug_assert_same_thread();
        if command == SelectionCommand::Clear {
            self.clear_selection();
            return;
        }
        let hits: Vec<PersistentIndex> = self
            .registry
            .iter()
            .filter(|(_, element)| element.is_visible() && element.rect().intersects(&region))
            .map(|(_, element)| element.index())
            .filter(|key| self.is_selectable(key))
            .collect();
        tracing::debug!(target: targets::SCENE, hits = hits.len(), ?command, "region selection");
        self.apply_selection(|selection| selection.select_many(hits, command.into()));
    }

    /// Region covered by the visible elements of `selection`. Entries
    /// without an element contribute nothing.
    pub fn visual_region_for_selection(&self, selection: &[PersistentIndex]) -> Region {
        selection
            .iter()
            .filter_map(|key| self.registry.lookup(key))
            .filter(|element| element.is_visible())
            .map(GraphicalElement::rect)
            .collect()
    }

    /// Region covered by the current selection.
    pub fn selection_region(&self) -> Region {
        self.visual_region_for_selection(&self.selection.selected_indices())
    }

    /// Applies `flags` to a single entry.
    pub fn select(&mut self, index: &ModelIndex, flags: SelectionFlags) {
        let Some(key) = self.model.persistent_index(index) else {
            return;
        };
        if flags.select && !self.is_selectable(&key) {
            return;
        }
        self.apply_selection(|selection| selection.select(key, flags));
    }

    /// Makes `index` the current entry and applies `flags` to it.
    pub fn set_current_index(&mut self, index: &ModelIndex, flags: SelectionFlags) {
        let key = self.model.persistent_index(index);
        self.apply_selection(|selection| selection.set_current_index(key, flags));
    }

    pub fn clear_selection(&mut self) {
        self.apply_selection(SelectionModel::clear_selection);
    }

    pub fn is_selected(&self, index: &ModelIndex) -> bool {
        self.model
            .persistent_index(index)
            .is_some_and(|key| self.selection.is_selected(&key))
    }

    /// Selected entries that still resolve, in selection order.
    pub fn selected_indices(&self) -> Vec<ModelIndex> {
        self.selection
            .selected_indices()
            .iter()
            .map(|key| self.model.resolve(key))
            .filter(ModelIndex::is_valid)
            .collect()
    }

    /// The cursor entry, or an invalid index.
    pub fn current_index(&self) -> ModelIndex {
        self.selection
            .current_index()
            .map(|key| self.model.resolve(&key))
            .unwrap_or_else(ModelIndex::invalid)
    }

    fn is_selectable(&self, key: &PersistentIndex) -> bool {
        let index = self.model.resolve(key);
        index.is_valid() && self.model.flags(&index).can_select()
    }

    /// Runs `change` on the selection and repaints every element whose
    /// selection state flipped.
    fn apply_selection<F>(&mut self, change: F)
    where
        F: FnOnce(&mut SelectionModel),
    {
        let before: HashSet<PersistentIndex> = self.selection.selected_indices().into_iter().collect();
        change(&mut self.selection);
        let after: HashSet<PersistentIndex> = self.selection.selected_indices().into_iter().collect();

        for key in before.symmetric_difference(&after) {
            if let Some(element) = self.registry.lookup_mut(key) {
                element.set_selected(after.contains(key));
                self.canvas.update_rect(element.rect());
            }
        }
    }

    // =========================================================================
    // Keyboard navigation
    // =========================================================================

    /// The entry a cursor move would land on. Does not change the cursor.
    ///
    /// With no cursor every move lands on the first visible element, or on
    /// an invalid index when nothing is visible. With a cursor the result
    /// is the current entry whenever nothing lies in the requested
    /// direction, including when the current element is hidden.
    pub fn move_cursor(&self, action: CursorAction, _modifiers: KeyboardModifiers) -> ModelIndex {
        self.cursor_target(action)
            .map(|key| self.model.resolve(&key))
            .unwrap_or_else(ModelIndex::invalid)
    }

    /// Moves the cursor and updates the selection the way keyboard
    /// navigation does, then scrolls the new current entry into view.
    ///
    /// Without modifiers the selection is replaced by the target. Shift
    /// extends from the anchor over the traversal range; Control only moves
    /// the cursor. Single-selection scenes always replace.
    pub fn navigate(&mut self, action: CursorAction, modifiers: KeyboardModifiers) -> ModelIndex {
        self.affinity.debug_assert_same_thread();
        let Some(target) = self.cursor_target(action) else {
            return ModelIndex::invalid();
        };
        if !self.model.resolve(&target).is_valid() {
            return ModelIndex::invalid();
        }
        let selectable = self.is_selectable(&target);
        let replace = if selectable {
            SelectionFlags::CLEAR_SELECT_CURRENT.with_anchor()
        } else {
            SelectionFlags::CURRENT.with_anchor()
        };

        match self.selection.selection_mode() {
            SelectionMode::NoSelection => {
                self.apply_selection(|s| s.set_current_index(Some(target), SelectionFlags::CURRENT));
            }
            SelectionMode::SingleSelection => {
                self.apply_selection(|s| s.set_current_index(Some(target), replace));
            }
            SelectionMode::MultiSelection | SelectionMode::ExtendedSelection => {
                if modifiers.shift {
                    let anchor = self
                        .selection
                        .anchor_index()
                        .or(self.selection.current_index())
                        .unwrap_or(target);
                    let range = self.traversal_range(anchor, target);
                    self.apply_selection(|s| {
                        s.select_many(range, SelectionFlags::CLEAR_AND_SELECT);
                        s.set_current_index(Some(target), SelectionFlags::CURRENT);
                    });
                } else if modifiers.control {
                    self.apply_selection(|s| s.set_current_index(Some(target), SelectionFlags::CURRENT));
                } else {
                    self.apply_selection(|s| s.set_current_index(Some(target), replace));
                }
            }
        }

        let index = self.model.resolve(&target);
        self.scroll_to(&index, ScrollHint::EnsureVisible);
        index
    }

    fn cursor_target(&self, action: CursorAction) -> Option<PersistentIndex> {
        let visible = |element: &&GraphicalElement| element.is_visible();
        let Some(current) = self.selection.current_index() else {
            return self.registry.iter().map(|(_, e)| e).find(visible).map(|e| e.index());
        };
        // A current entry without an element (outside the root, or not
        // yet reconciled) has no neighbours.
        let Some(position) = self.registry.position_of(&current) else {
            return Some(current);
        };
        let ordered = || self.registry.iter().map(|(_, element)| element);

        let target = match action {
            CursorAction::MoveHome => ordered().find(visible).map(|e| e.index()),
            CursorAction::MoveEnd => ordered().filter(visible).last().map(|e| e.index()),
            CursorAction::MoveNext => ordered().skip(position + 1).find(visible).map(|e| e.index()),
            CursorAction::MovePrevious => ordered()
                .take(position)
                .filter(visible)
                .last()
                .map(|e| e.index()),
            directional => match (directional.direction(), self.registry.lookup(&current)) {
                (Some(direction), Some(element)) => {
                    let from = element.rect().center();
                    ordered()
                        .filter(visible)
                        .filter(|element| element.index() != current)
                        .filter_map(|element| {
                            directional_score(from, element.rect().center(), direction)
                                .map(|score| (score, element.index()))
                        })
                        .min_by(|a, b| a.0.total_cmp(&b.0))
                        .map(|(_, key)| key)
                }
                _ => None,
            },
        };
        Some(target.unwrap_or(current))
    }

    /// Selectable visible entries between `a` and `b` in traversal order, inclusive.
    fn traversal_range(&self, a: PersistentIndex, b: PersistentIndex) -> Vec<PersistentIndex> {
        let (Some(pa), Some(pb)) = (self.registry.position_of(&a), self.registry.position_of(&b))
        else {
            return vec![b];
        };
        let (start, end) = if pa <= pb { (pa, pb) } else { (pb, pa) };
        (start..=end)
            .filter_map(|position| self.registry.at_position(position))
            .filter(|(_, element)| element.is_visible())
            .map(|(_, element)| element.index())
            .filter(|key| self.is_selectable(key))
            .collect()
    }

    // =========================================================================
    // Data refresh
    // =========================================================================

    fn refresh(&mut self, index: &ModelIndex, key: PersistentIndex, geometry: bool) {
        let Some(id) = self.registry.element_id(&key) else {
            return;
        };
        let content = ElementContent::from_model(self.model.as_ref(), index);
        let (position, size) = if geometry {
            model_geometry(self.model.as_ref(), index)
        } else {
            (None, None)
        };
        let Some(element) = self.registry.get_mut(id) else {
            return;
        };
        let parent = element.parent();

        let old = element.rect();
        let mut new = old;
        if let Some(position) = position {
            new = new.with_origin(position);
        }
        if let Some(size) = size {
            new.size = size;
        }
        element.refresh(content);
        element.set_rect(new);

        if new != old {
            self.canvas.reposition(id, new);
            self.rightmost.remove(&parent);
        }
        self.canvas.update_rect(old.union(&new));
    }
}

impl<C: Canvas> ModelObserver for DiagramScene<C> {
    fn rows_inserted(&mut self, parent: &ModelIndex, first: usize, last: usize) {
        self.affinity.debug_assert_same_thread();
        let _span = tracing::debug_span!(
            target: targets::SCENE,
            span_names::NOTIFICATION,
            kind = "rows_inserted",
            first,
            last
        )
        .entered();

        if first > last || !self.is_materialized_parent(parent) {
            tracing::trace!(target: targets::SCENE, "insertion outside the materialized subtree");
            return;
        }
        let parent_key = self.parent_key(parent);
        let depth = self.child_depth(parent_key);

        let mut count = 0;
        for row in first..=last {
            let index = self.model.index(row, 0, parent);
            if !index.is_valid() {
                tracing::warn!(target: targets::SCENE, row, "inserted row does not resolve");
                continue;
            }
            count += self.materialize(&index, parent_key, depth);
        }
        if count > 0 {
            self.update_links();
        }
        tracing::debug!(target: targets::SCENE, created = count, "rows inserted");
    }

    fn rows_about_to_be_removed(&mut self, parent: &ModelIndex, first: usize, last: usize) {
        self.affinity.debug_assert_same_thread();
        let _span = tracing::debug_span!(
            target: targets::SCENE,
            span_names::NOTIFICATION,
            kind = "rows_about_to_be_removed",
            first,
            last
        )
        .entered();

        if first > last {
            return;
        }
        if self.root_within(parent, first, last) {
            tracing::debug!(target: targets::SCENE, "scene root is being removed; falling back to the whole model");
            self.reset();
            self.root = None;
            self.rebuild_pending = true;
            return;
        }
        if !self.is_materialized_parent(parent) {
            return;
        }

        let mut doomed = Vec::new();
        for row in first..=last {
            let index = self.model.index(row, 0, parent);
            match self.model.persistent_index(&index) {
                Some(key) => doomed.extend(self.subtree_keys(&key)),
                None => {
                    tracing::warn!(target: targets::SCENE, row, "row to be removed does not resolve")
                }
            }
        }
        let released = self.release(&doomed);
        tracing::debug!(target: targets::SCENE, released, "rows about to be removed");
    }

    fn rows_removed(&mut self, _parent: &ModelIndex, _first: usize, _last: usize) {
        self.affinity.debug_assert_same_thread();
        if std::mem::take(&mut self.rebuild_pending) {
            self.populate();
        }
    }

    fn data_changed(&mut self, top_left: &ModelIndex, bottom_right: &ModelIndex, roles: &[ItemRole]) {
        self.affinity.debug_assert_same_thread();
        if !top_left.is_valid() || !bottom_right.is_valid() {
            return;
        }
        let geometry = roles.is_empty() || roles.iter().any(ItemRole::affects_geometry);
        let parent = top_left.parent();

        let mut refreshed = 0;
        for row in top_left.row()..=bottom_right.row() {
            for column in top_left.column()..=bottom_right.column() {
                let index = self.model.index(row, column, &parent);
                let Some(key) = self.model.persistent_index(&index) else {
                    continue;
                };
                if self.registry.contains(&key) {
                    self.refresh(&index, key, geometry);
                    refreshed += 1;
                }
            }
        }
        tracing::trace!(target: targets::SCENE, refreshed, "data changed");
    }

    fn model_reset(&mut self) {
        self.affinity.debug_assert_same_thread();
        if let Some(root) = self.root
            && !self.model.resolve(&root).is_valid()
        {
            self.root = None;
        }
        self.rebuild();
    }
}

/// New start of a viewport span so `lo..hi` is visible, moving as little
/// as possible. A span longer than the viewport is aligned to its start.
fn ensure_span_visible(start: f32, extent: f32, lo: f32, hi: f32) -> f32 {
    if lo >= start && hi <= start + extent {
        start
    } else if lo < start || hi - lo > extent {
        lo
    } else {
        hi - extent
    }
}

static_assertions::assert_impl_all!(DiagramScene<super::SceneCanvas>: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeModel;
    use crate::scene::SceneCanvas;
    use horizon_diagram_core::CoreError;
    use horizon_diagram_geometry::Size;

    fn scene_over(model: &Arc<TreeModel<String>>) -> DiagramScene<SceneCanvas> {
        DiagramScene::new(model.clone(), SceneCanvas::default(), SceneConfig::default()).unwrap()
    }

    #[test]
    fn test_ensure_span_visible() {
        assert_eq!(ensure_span_visible(0.0, 100.0, 10.0, 20.0), 0.0);
        assert_eq!(ensure_span_visible(50.0, 100.0, 10.0, 20.0), 10.0);
        assert_eq!(ensure_span_visible(0.0, 100.0, 150.0, 170.0), 70.0);
        assert_eq!(ensure_span_visible(0.0, 100.0, 150.0, 400.0), 150.0);
    }

    #[test]
    fn test_default_layout_places_siblings_left_to_right() {
        let model = Arc::new(TreeModel::<String>::new());
        let a = model.add_root("a".into());
        let b = model.add_root("b".into());
        let child = model.add_child(a, "a1".into()).unwrap();
        let scene = scene_over(&model);
        let config = SceneConfig::default();

        let ra = scene.visual_rect(&model.index_for_key(a)).unwrap();
        let rb = scene.visual_rect(&model.index_for_key(b)).unwrap();
        let rc = scene.visual_rect(&model.index_for_key(child)).unwrap();

        assert_eq!(ra.origin, config.origin());
        assert_eq!(rb.left(), ra.right() + config.sibling_spacing);
        assert_eq!(rb.top(), ra.top());
        assert_eq!(rc.left(), ra.left());
        assert_eq!(rc.top(), ra.bottom() + config.level_spacing);
    }

    #[test]
    fn test_traversal_order_is_preorder() {
        let model = Arc::new(TreeModel::<String>::new());
        let a = model.add_root("a".into());
        let b = model.add_root("b".into());
        model.add_child(a, "a1".into());
        let scene = scene_over(&model);
        scene.verify().unwrap();

        let labels: Vec<_> = scene.registry().iter().map(|(_, e)| e.label().to_string()).collect();
        assert_eq!(labels, vec!["a", "a1", "b"]);
        assert_eq!(scene.registry().lookup(&model.persistent_for_key(b)).map(|e| e.depth()), Some(0));
    }

    #[test]
    fn test_scroll_to_hints() {
        let model = Arc::new(TreeModel::<String>::new());
        let keys: Vec<_> = (0..20).map(|i| model.add_root(format!("n{i}"))).collect();
        let mut scene = DiagramScene::new(
            model.clone(),
            SceneCanvas::new(Size::new(300.0, 200.0)),
            SceneConfig::default(),
        )
        .unwrap();

        let far = model.index_for_key(keys[10]);
        let rect = scene.visual_rect(&far).unwrap();

        scene.scroll_to(&far, ScrollHint::EnsureVisible);
        assert_eq!(scene.horizontal_offset(), rect.right() - 300.0);
        assert_eq!(scene.vertical_offset(), 0.0);

        // Already visible: no movement.
        scene.scroll_to(&far, ScrollHint::EnsureVisible);
        assert_eq!(scene.horizontal_offset(), rect.right() - 300.0);

        scene.scroll_to(&far, ScrollHint::PositionAtCenter);
        assert_eq!(scene.canvas().viewport().center(), rect.center());

        scene.scroll_to(&far, ScrollHint::PositionAtTop);
        assert_eq!(scene.vertical_offset(), rect.top());

        scene.scroll_to(&ModelIndex::invalid(), ScrollHint::PositionAtBottom);
        assert_eq!(scene.vertical_offset(), rect.top());
    }

    #[test]
    fn test_move_cursor_directions() {
        let model = Arc::new(TreeModel::<String>::new());
        let a = model.add_root("a".into());
        let b = model.add_root("b".into());
        let a1 = model.add_child(a, "a1".into()).unwrap();
        let mut scene = scene_over(&model);

        let ia = model.index_for_key(a);
        let ib = model.index_for_key(b);
        let ia1 = model.index_for_key(a1);

        // No cursor: first element.
        assert_eq!(scene.move_cursor(CursorAction::MoveDown, KeyboardModifiers::NONE), ia);

        scene.set_current_index(&ia, SelectionFlags::CURRENT);
        assert_eq!(scene.move_cursor(CursorAction::MoveRight, KeyboardModifiers::NONE), ib);
        assert_eq!(scene.move_cursor(CursorAction::MoveDown, KeyboardModifiers::NONE), ia1);
        assert_eq!(scene.move_cursor(CursorAction::MoveUp, KeyboardModifiers::NONE), ia);
        assert_eq!(scene.move_cursor(CursorAction::MoveNext, KeyboardModifiers::NONE), ia1);
        assert_eq!(scene.move_cursor(CursorAction::MovePrevious, KeyboardModifiers::NONE), ia);
        assert_eq!(scene.move_cursor(CursorAction::MoveEnd, KeyboardModifiers::NONE), ib);

        // The cursor itself is not moved by the query.
        assert_eq!(scene.current_index(), ia);
    }

    #[test]
    fn test_move_cursor_stays_put_at_the_edges() {
        let model = Arc::new(TreeModel::<String>::new());
        let keys: Vec<_> = ["a", "b", "c"].iter().map(|l| model.add_root(l.to_string())).collect();
        let mut scene = scene_over(&model);
        let idx = |i: usize| model.index_for_key(keys[i]);

        scene.set_current_index(&idx(2), SelectionFlags::CURRENT);
        assert_eq!(scene.move_cursor(CursorAction::MoveRight, KeyboardModifiers::NONE), idx(2));
        assert_eq!(scene.move_cursor(CursorAction::MoveNext, KeyboardModifiers::NONE), idx(2));
        assert_eq!(scene.move_cursor(CursorAction::MoveDown, KeyboardModifiers::NONE), idx(2));

        scene.set_current_index(&idx(0), SelectionFlags::CURRENT);
        assert_eq!(scene.move_cursor(CursorAction::MovePrevious, KeyboardModifiers::NONE), idx(0));
        assert_eq!(scene.move_cursor(CursorAction::MoveLeft, KeyboardModifiers::NONE), idx(0));
        assert_eq!(scene.move_cursor(CursorAction::MoveUp, KeyboardModifiers::NONE), idx(0));
    }

    #[test]
    fn test_move_cursor_from_hidden_current() {
        let model = Arc::new(TreeModel::<String>::new());
        let keys: Vec<_> = ["a", "b", "c"].iter().map(|l| model.add_root(l.to_string())).collect();
        let mut scene = scene_over(&model);
        let idx = |i: usize| model.index_for_key(keys[i]);

        // The hidden rightmost element keeps its place in the layout.
        scene.set_current_index(&idx(2), SelectionFlags::CURRENT);
        assert!(scene.set_element_visible(&idx(2), false));
        assert_eq!(scene.move_cursor(CursorAction::MoveRight, KeyboardModifiers::NONE), idx(2));
        assert_eq!(scene.move_cursor(CursorAction::MoveNext, KeyboardModifiers::NONE), idx(2));
        assert_eq!(scene.move_cursor(CursorAction::MoveLeft, KeyboardModifiers::NONE), idx(1));
        assert_eq!(scene.move_cursor(CursorAction::MovePrevious, KeyboardModifiers::NONE), idx(1));

        // Hidden elements are skipped as targets.
        scene.set_current_index(&idx(0), SelectionFlags::CURRENT);
        assert!(scene.set_element_visible(&idx(1), false));
        assert_eq!(scene.move_cursor(CursorAction::MoveNext, KeyboardModifiers::NONE), idx(0));
        assert_eq!(scene.move_cursor(CursorAction::MoveRight, KeyboardModifiers::NONE), idx(0));
        assert_eq!(scene.move_cursor(CursorAction::MoveEnd, KeyboardModifiers::NONE), idx(0));
    }

    #[test]
    fn test_move_cursor_with_nothing_visible() {
        let model = Arc::new(TreeModel::<String>::new());
        let only = model.add_root("only".into());
        let mut scene = scene_over(&model);
        let index = model.index_for_key(only);
        assert!(scene.set_element_visible(&index, false));

        // No cursor and nothing visible: nowhere to go.
        assert!(!scene.move_cursor(CursorAction::MoveNext, KeyboardModifiers::NONE).is_valid());

        scene.set_current_index(&index, SelectionFlags::CURRENT);
        for action in [
            CursorAction::MoveUp,
            CursorAction::MoveDown,
            CursorAction::MoveLeft,
            CursorAction::MoveRight,
            CursorAction::MoveNext,
            CursorAction::MovePrevious,
            CursorAction::MoveHome,
            CursorAction::MoveEnd,
        ] {
            assert_eq!(scene.move_cursor(action, KeyboardModifiers::NONE), index, "{action:?}");
        }
        assert_eq!(scene.navigate(CursorAction::MoveRight, KeyboardModifiers::NONE), index);
        assert_eq!(scene.current_index(), index);
    }

    #[test]
    fn test_move_cursor_on_the_only_element() {
        let model = Arc::new(TreeModel::<String>::new());
        let only = model.add_root("only".into());
        let mut scene = scene_over(&model);
        let index = model.index_for_key(only);

        scene.set_current_index(&index, SelectionFlags::CURRENT);
        assert_eq!(scene.move_cursor(CursorAction::MoveNext, KeyboardModifiers::NONE), index);
        assert_eq!(scene.move_cursor(CursorAction::MoveLeft, KeyboardModifiers::NONE), index);
        assert_eq!(scene.navigate(CursorAction::MovePrevious, KeyboardModifiers::NONE), index);
    }

    #[test]
    fn test_navigate_selection_modes() {
        let model = Arc::new(TreeModel::<String>::new());
        let keys: Vec<_> = (0..4).map(|i| model.add_root(format!("n{i}"))).collect();
        let mut scene = scene_over(&model);
        let idx = |i: usize| model.index_for_key(keys[i]);

        assert_eq!(scene.navigate(CursorAction::MoveHome, KeyboardModifiers::NONE), idx(0));
        assert_eq!(scene.selected_indices(), vec![idx(0)]);

        scene.navigate(CursorAction::MoveRight, KeyboardModifiers::SHIFT);
        scene.navigate(CursorAction::MoveRight, KeyboardModifiers::SHIFT);
        assert_eq!(scene.selected_indices().len(), 3);
        assert_eq!(scene.current_index(), idx(2));

        scene.navigate(CursorAction::MoveRight, KeyboardModifiers::CTRL);
        assert_eq!(scene.current_index(), idx(3));
        assert_eq!(scene.selected_indices().len(), 3);

        scene.navigate(CursorAction::MoveLeft, KeyboardModifiers::NONE);
        assert_eq!(scene.selected_indices(), vec![idx(2)]);
    }

    #[test]
    fn test_hidden_elements_are_not_hit() {
        let model = Arc::new(TreeModel::<String>::new());
        let a = model.add_root("a".into());
        let mut scene = scene_over(&model);
        let index = model.index_for_key(a);
        let center = scene.visual_rect(&index).unwrap().center();

        assert!(scene.set_element_visible(&index, false));
        assert!(scene.is_index_hidden(&index));
        assert!(!scene.index_at(center).is_valid());
        assert!(!scene.set_element_visible(&ModelIndex::invalid(), true));
    }

    #[test]
    fn test_verify_rejects_foreign_thread() {
        let model = Arc::new(TreeModel::<String>::new());
        model.add_root("a".into());
        let scene = scene_over(&model);
        scene.verify().unwrap();

        let result = std::thread::spawn(move || scene.verify()).join().unwrap();
        assert!(matches!(
            result,
            Err(SceneError::Core(CoreError::WrongThread { ref operation })) if operation == "verify"
        ));
    }

    #[test]
    fn test_rows_inserted_outside_root_are_ignored() {
        let model = Arc::new(TreeModel::<String>::new());
        let a = model.add_root("a".into());
        let b = model.add_root("b".into());
        let mut scene = scene_over(&model);
        scene.set_root_index(&model.index_for_key(a));
        assert!(scene.registry().is_empty());

        let b1 = model.add_child(b, "b1".into()).unwrap();
        scene.rows_inserted(&model.index_for_key(b), 0, 0);
        assert!(scene.element(&model.index_for_key(b1)).is_none());

        let a1 = model.add_child(a, "a1".into()).unwrap();
        scene.rows_inserted(&model.index_for_key(a), 0, 0);
        let element = scene.element(&model.index_for_key(a1)).unwrap();
        assert_eq!(element.depth(), 0);
        assert_eq!(element.parent(), None);
        scene.verify().unwrap();
    }
}
