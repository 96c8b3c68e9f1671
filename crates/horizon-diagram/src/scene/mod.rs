//! The diagram scene and everything it owns.
//!
//! - [`DiagramScene`]: observes a model and keeps elements in step with it
//! - [`ElementRegistry`]: one-to-one map from persistent indices to elements
//! - [`Canvas`] / [`SceneCanvas`]: the drawing surface and its damage
//! - [`SceneLink`]: parent and sibling connectors between elements
//! - [`SceneBinding`]: connects a scene to its model's signals

mod adapter;
mod binding;
mod canvas;
mod debug;
mod element;
mod interaction;
mod links;
mod registry;

pub use adapter::DiagramScene;
pub use binding::{ModelEvent, SceneBinding};
pub use canvas::{Canvas, SceneCanvas, ScrollHint};
pub use debug::SceneTreeDebug;
pub use element::{ElementContent, ElementId, GraphicalElement};
pub use interaction::{CursorAction, KeyboardModifiers, SelectionCommand};
pub use links::{LinkKind, SceneLink};
pub use registry::ElementRegistry;
