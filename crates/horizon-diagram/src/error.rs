//! Error types for the diagram crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::PersistentIndex;

/// Violations of the element registry's one-to-one mapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The persistent index already has an element.
    #[error("persistent index {0:?} is already registered")]
    AlreadyRegistered(PersistentIndex),

    /// The persistent index has no element.
    #[error("persistent index {0:?} is not registered")]
    NotRegistered(PersistentIndex),
}

/// Errors reading or validating a [`SceneConfig`](crate::SceneConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for a scene config.
    #[error("failed to parse scene config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize scene config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors surfaced by a diagram scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] horizon_diagram_core::CoreError),

    /// The registry no longer mirrors the model.
    #[error("scene out of sync with model: {0}")]
    Inconsistent(String),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
