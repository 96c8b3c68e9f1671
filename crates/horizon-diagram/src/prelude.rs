//! Prelude module for Horizon Diagram.
//!
//! ```ignore
//! use horizon_diagram::prelude::*;
//! ```

// ============================================================================
// Signals and Diagnostics
// ============================================================================

pub use crate::{ConnectionId, Signal, TreeFormatOptions, TreeStyle};

// ============================================================================
// Geometry
// ============================================================================

pub use crate::geometry::{Point, Rect, Region, Size};

// ============================================================================
// Model
// ============================================================================

pub use crate::model::{
    ItemData, ItemFlags, ItemModel, ItemRole, ModelIndex, ModelObserver, ModelSignals, NodeKey,
    PersistentIndex, SelectionFlags, SelectionMode, SelectionModel, TreeModel, TreeNodeData,
};

// ============================================================================
// Scene
// ============================================================================

pub use crate::scene::{
    Canvas, CursorAction, DiagramScene, ElementId, ElementRegistry, GraphicalElement,
    KeyboardModifiers, LinkKind, ModelEvent, SceneBinding, SceneCanvas, SceneLink, ScrollHint,
    SelectionCommand,
};
pub use crate::{SceneConfig, SceneError, SceneResult};
