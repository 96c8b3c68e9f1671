//! Horizon Diagram - a diagram canvas kept in sync with a hierarchical item model.
//!
//! A [`DiagramScene`] mirrors the entries of an [`ItemModel`](model::ItemModel)
//! as graphical elements on a [`Canvas`](scene::Canvas). Model insertions,
//! removals and data edits update the elements; hit-tests, rubber-band
//! selection and keyboard navigation report back in model indices.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_diagram::prelude::*;
//!
//! let model = Arc::new(TreeModel::<String>::new());
//! let package = model.add_root("package".to_string());
//!
//! let scene = DiagramScene::new(model.clone(), SceneCanvas::default(), SceneConfig::default())?;
//! let binding = SceneBinding::bind(scene);
//!
//! // Edits to the model show up in the scene.
//! let class = model.add_child(package, "ClassA".to_string()).unwrap();
//! binding.with_scene(|scene| {
//!     let rect = scene.visual_rect(&model.index_for_key(class)).unwrap();
//!     assert_eq!(scene.index_at(rect.center()), model.index_for_key(class));
//! });
//! # Ok::<(), horizon_diagram::SceneError>(())
//! ```

pub use horizon_diagram_core::*;

/// Geometry value types.
pub mod geometry {
    pub use horizon_diagram_geometry::*;
}

mod config;
mod error;
pub mod model;
pub mod prelude;
pub mod scene;

pub use config::SceneConfig;
pub use error::{ConfigError, ConfigResult, RegistryError, SceneError, SceneResult};
pub use scene::{DiagramScene, SceneBinding, SceneCanvas};
