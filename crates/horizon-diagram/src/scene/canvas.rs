//! The drawing surface a scene renders into.
//!
//! A [`DiagramScene`](super::DiagramScene) owns a [`Canvas`] and drives it
//! by delegation: it attaches and detaches elements, requests repaints of
//! scene-coordinate rectangles and moves the viewport when scrolling. The
//! canvas only ever sees [`ElementId`]s.
//!
//! [`SceneCanvas`] is the provided implementation. It accumulates repaint
//! damage into a single bounding rectangle that a renderer consumes with
//! [`SceneCanvas::take_damage`], and keeps the latest links for drawing
//! branch lines.

use std::collections::HashMap;

use horizon_diagram_core::logging::targets;
use horizon_diagram_geometry::{Point, Rect, Size};

use super::element::ElementId;
use super::links::SceneLink;

/// How [`scroll_to`](super::DiagramScene::scroll_to) positions the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollHint {
    /// Scroll as little as possible; nothing if already fully visible.
    #[default]
    EnsureVisible,
    PositionAtTop,
    PositionAtBottom,
    PositionAtCenter,
}

/// Capabilities a scene needs from its drawing surface.
pub trait Canvas {
    /// The visible part of the scene, in scene coordinates.
    fn viewport(&self) -> Rect;

    /// Moves the viewport so its top-left corner is at `origin`.
    fn set_viewport_origin(&mut self, origin: Point);

    /// Starts drawing element `id` inside `rect`.
    fn attach(&mut self, id: ElementId, rect: Rect);

    /// Records that element `id` now occupies `rect`.
    fn reposition(&mut self, id: ElementId, rect: Rect);

    /// Stops drawing element `id`. The canvas must drop every reference to it.
    fn detach(&mut self, id: ElementId);

    /// Schedules a repaint of `rect`.
    fn update_rect(&mut self, rect: Rect);

    /// Replaces the connectors drawn between attached elements.
    fn set_links(&mut self, links: &[SceneLink]);

    /// Detaches everything, drops every link and schedules a full repaint.
    fn clear(&mut self);
}

/// Repaint bookkeeping for one canvas.
#[derive(Debug, Clone, Default)]
struct Damage {
    bounds: Option<Rect>,
    full_repaint: bool,
}

impl Damage {
    fn add(&mut self, rect: Rect) {
        if rect.is_empty() || self.full_repaint {
            return;
        }
        self.bounds = Some(match self.bounds {
            Some(existing) => existing.union(&rect),
            None => rect,
        });
    }

    fn invalidate_all(&mut self) {
        self.full_repaint = true;
        self.bounds = None;
    }
}

/// An in-memory canvas: a viewport, the attached elements and pending damage.
#[derive(Debug, Clone)]
pub struct SceneCanvas {
    viewport: Rect,
    attached: HashMap<ElementId, Rect>,
    links: Vec<SceneLink>,
    damage: Damage,
}

impl Default for SceneCanvas {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0))
    }
}

impl SceneCanvas {
    /// A canvas whose viewport has `size` and starts at the scene origin.
    pub fn new(size: Size) -> Self {
        Self {
            viewport: Rect::from_origin_size(Point::ZERO, size),
            attached: HashMap::new(),
            links: Vec::new(),
            damage: Damage::default(),
        }
    }

    /// Resizes the viewport, keeping its origin. Everything needs repainting.
    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport.size = size;
        self.damage.invalidate_all();
    }

    pub fn is_attached(&self, id: ElementId) -> bool {
        self.attached.contains_key(&id)
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// Last rectangle reported for an attached element.
    pub fn attached_rect(&self, id: ElementId) -> Option<Rect> {
        self.attached.get(&id).copied()
    }

    /// Links from the last [`Canvas::set_links`], in traversal order.
    pub fn links(&self) -> &[SceneLink] {
        &self.links
    }

    /// Union of every rectangle scheduled for repaint since the last take.
    pub fn damage_region(&self) -> Option<Rect> {
        self.damage.bounds
    }

    pub fn needs_full_repaint(&self) -> bool {
        self.damage.full_repaint
    }

    pub fn has_damage(&self) -> bool {
        self.damage.full_repaint || self.damage.bounds.is_some()
    }

    /// Returns the pending damage and resets it.
    ///
    /// A full repaint reports the viewport.
    pub fn take_damage(&mut self) -> Option<Rect> {
        let damage = std::mem::take(&mut self.damage);
        if damage.full_repaint {
            Some(self.viewport)
        } else {
            damage.bounds
        }
    }
}

impl Canvas for SceneCanvas {
    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn set_viewport_origin(&mut self, origin: Point) {
        if self.viewport.origin == origin {
            return;
        }
        tracing::trace!(target: targets::SCENE, x = origin.x, y = origin.y, "viewport moved");
        self.viewport.origin = origin;
        self.damage.invalidate_all();
    }

    fn attach(&mut self, id: ElementId, rect: Rect) {
        self.attached.insert(id, rect);
    }

    fn reposition(&mut self, id: ElementId, rect: Rect) {
        if let Some(slot) = self.attached.get_mut(&id) {
            *slot = rect;
        }
    }

    fn detach(&mut self, id: ElementId) {
        self.attached.remove(&id);
    }

    fn update_rect(&mut self, rect: Rect) {
        self.damage.add(rect);
    }

    fn set_links(&mut self, links: &[SceneLink]) {
        if self.links != links {
            self.links = links.to_vec();
        }
    }

    fn clear(&mut self) {
        self.attached.clear();
        self.links.clear();
        self.damage.invalidate_all();
    }
}
