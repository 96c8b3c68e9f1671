//! Text dumps of a scene's element tree.

use std::fmt::Write;

use horizon_diagram_core::TreeFormatOptions;

use super::adapter::DiagramScene;
use super::canvas::Canvas;
use super::registry::ElementRegistry;

/// Renders the materialized element tree of a scene.
///
/// ```
/// use std::sync::Arc;
/// use horizon_diagram::prelude::*;
/// use horizon_diagram::scene::SceneTreeDebug;
///
/// let model = Arc::new(TreeModel::<String>::new());
/// let package = model.add_root("package".to_string());
/// model.add_child(package, "ClassA".to_string());
/// let scene = DiagramScene::new(model, SceneCanvas::default(), SceneConfig::default())?;
///
/// let dump = SceneTreeDebug::with_options(TreeFormatOptions::minimal()).format(&scene);
/// assert!(dump.contains("ClassA"));
/// # Ok::<(), horizon_diagram::SceneError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SceneTreeDebug {
    options: TreeFormatOptions,
}

impl SceneTreeDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    pub fn format<C: Canvas>(&self, scene: &DiagramScene<C>) -> String {
        self.format_registry(scene.registry())
    }

    /// Formats every element in traversal order, one per line.
    pub fn format_registry(&self, registry: &ElementRegistry) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Scene ({} elements):", registry.len());
        if registry.is_empty() {
            output.push_str("  (empty)\n");
            return output;
        }

        for (position, (id, element)) in registry.iter().enumerate() {
            let depth = element.depth() + 1;
            if !self.options.includes_depth(depth) {
                continue;
            }
            let is_last = registry
                .at_position(registry.subtree_end(position))
                .is_none_or(|(_, next)| next.parent() != element.parent());

            output.push_str(&self.options.prefix(depth, is_last));
            if element.label().is_empty() {
                output.push_str("(unlabeled)");
            } else {
                output.push_str(element.label());
            }
            if self.options.show_ids {
                let _ = write!(output, " [{id:?}]");
            }
            if self.options.show_geometry {
                let rect = element.rect();
                let _ = write!(
                    output,
                    " @({}, {}) {}x{} z={}",
                    rect.left(),
                    rect.top(),
                    rect.width(),
                    rect.height(),
                    element.z_value()
                );
            }
            if !element.is_visible() {
                output.push_str(" (hidden)");
            }
            output.push('\n');
        }
        output
    }
}
