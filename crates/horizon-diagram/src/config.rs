//! Scene configuration.
//!
//! [`SceneConfig`] controls where new elements land when the model does not
//! place them, plus the default selection behavior of a scene. It can be
//! built in code or loaded from TOML:
//!
//! ```
//! use horizon_diagram::SceneConfig;
//!
//! let config = SceneConfig::from_toml_str(r#"
//!     origin = [20.0, 20.0]
//!     node_width = 160.0
//!     selection_mode = "extended_selection"
//! "#).unwrap();
//! assert_eq!(config.node_width, 160.0);
//! assert_eq!(config.node_height, 40.0);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use horizon_diagram_core::logging::targets;
use horizon_diagram_geometry::{Point, Size};

use crate::error::{ConfigError, ConfigResult};
use crate::model::SelectionMode;

/// Layout and behavior settings for a [`DiagramScene`](crate::DiagramScene).
///
/// Missing keys take their default values when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Top-left corner of the first top-level element.
    pub origin: [f32; 2],
    /// Width of elements whose model entry has no size hint.
    pub node_width: f32,
    /// Height of elements whose model entry has no size hint.
    pub node_height: f32,
    /// Horizontal gap between siblings.
    pub sibling_spacing: f32,
    /// Vertical gap between a parent and its first row of children.
    pub level_spacing: f32,
    /// Z-value given to new elements.
    pub default_z: f32,
    pub selection_mode: SelectionMode,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0],
            node_width: 120.0,
            node_height: 40.0,
            sibling_spacing: 24.0,
            level_spacing: 32.0,
            default_z: 0.0,
            selection_mode: SelectionMode::ExtendedSelection,
        }
    }
}

impl SceneConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(target: targets::SCENE, path = %path.display(), "loading scene config");
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Checks that sizes are positive and spacings non-negative.
    pub fn validate(&self) -> ConfigResult<()> {
        positive("node_width", self.node_width)?;
        positive("node_height", self.node_height)?;
        non_negative("sibling_spacing", self.sibling_spacing)?;
        non_negative("level_spacing", self.level_spacing)?;
        if !self.default_z.is_finite() {
            return Err(invalid("default_z", "must be finite"));
        }
        if !self.origin.iter().all(|v| v.is_finite()) {
            return Err(invalid("origin", "must be finite"));
        }
        Ok(())
    }

    pub fn origin(&self) -> Point {
        Point::from(self.origin)
    }

    pub fn node_size(&self) -> Size {
        Size::new(self.node_width, self.node_height)
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = [origin.x, origin.y];
        self
    }

    pub fn with_node_size(mut self, size: Size) -> Self {
        self.node_width = size.width;
        self.node_height = size.height;
        self
    }

    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, value: f32) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("must be positive, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f32) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("must not be negative, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SceneConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SceneConfig::from_toml_str("sibling_spacing = 8.0").unwrap();
        assert_eq!(config.sibling_spacing, 8.0);
        assert_eq!(config.node_width, SceneConfig::default().node_width);
        assert_eq!(config.selection_mode, SelectionMode::ExtendedSelection);
    }

    #[test]
    fn test_rejects_non_positive_size() {
        let err = SceneConfig::from_toml_str("node_height = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "node_height", .. }));
    }

    #[test]
    fn test_rejects_negative_spacing() {
        let config = SceneConfig {
            level_spacing: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "level_spacing", .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        let err = SceneConfig::from_toml_str("node_width = \"wide\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_roundtrip_preserves_mode() {
        let config = SceneConfig::default().with_selection_mode(SelectionMode::MultiSelection);
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("multi_selection"));
        assert_eq!(SceneConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SceneConfig::load("/nonexistent/scene.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
