//! Shared fixtures for the scene integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use horizon_diagram::prelude::*;

/// A diagram node with optional explicit geometry.
#[derive(Debug, Clone)]
pub struct Node {
    pub label: String,
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub kind: Option<String>,
    pub selectable: bool,
}

impl Node {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            position: None,
            size: None,
            kind: None,
            selectable: true,
        }
    }

    /// A node the model places at `(x, y)` with size `w`x`h`.
    pub fn at(label: &str, x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            position: Some(Point::new(x, y)),
            size: Some(Size::new(w, h)),
            ..Self::new(label)
        }
    }

    pub fn unselectable(mut self) -> Self {
        self.selectable = false;
        self
    }
}

impl TreeNodeData for Node {
    fn display(&self) -> ItemData {
        ItemData::from(self.label.as_str())
    }

    fn data(&self, role: ItemRole) -> ItemData {
        match role {
            ItemRole::Position => self.position.into(),
            ItemRole::SizeHint => self.size.into(),
            ItemRole::ElementKind => self.kind.clone().into(),
            _ => ItemData::None,
        }
    }

    fn set_data(&mut self, role: ItemRole, value: ItemData) -> bool {
        match role {
            ItemRole::Display => match value.into_string() {
                Some(label) => {
                    self.label = label;
                    true
                }
                None => false,
            },
            ItemRole::Position => match value.as_point() {
                Some(point) => {
                    self.position = Some(point);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn flags(&self) -> ItemFlags {
        ItemFlags::new().with_selectable(self.selectable)
    }
}

pub type NodeModel = TreeModel<Node>;

pub fn node_model() -> Arc<NodeModel> {
    Arc::new(TreeModel::new())
}

/// A scene over `model` with the default configuration.
pub fn scene_for(model: &Arc<NodeModel>) -> DiagramScene<SceneCanvas> {
    let model: Arc<dyn ItemModel> = model.clone();
    DiagramScene::new(model, SceneCanvas::default(), SceneConfig::default())
        .expect("default config is valid")
}

/// A scene over `model`, connected to its signals.
pub fn bound_scene(model: &Arc<NodeModel>) -> SceneBinding<SceneCanvas> {
    SceneBinding::bind(scene_for(model))
}

/// Labels of the scene's elements in traversal order.
pub fn labels(scene: &DiagramScene<SceneCanvas>) -> Vec<String> {
    scene
        .registry()
        .iter()
        .map(|(_, element)| element.label().to_string())
        .collect()
}

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
