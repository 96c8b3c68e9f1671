//! Logging and debugging facilities for Horizon Diagram.
//!
//! This module provides:
//! - Target and span names for filtering `tracing` output by subsystem
//! - Tree formatting helpers shared by hierarchy dumps
//! - Performance tracing hooks for profiling
//!
//! Horizon Diagram only emits `tracing` events. To see them, install a
//! subscriber in the application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_diagram::scene=debug")
//!     .init();
//! ```

/// Span names used throughout Horizon Diagram.
pub mod span_names {
    /// Signal emission span.
    pub const SIGNAL: &str = "horizon_diagram::signal";
    /// Model notification handling span.
    pub const NOTIFICATION: &str = "horizon_diagram::notification";
    /// Full scene rebuild span.
    pub const REBUILD: &str = "horizon_diagram::rebuild";
}

/// Target names for log filtering.
pub mod targets {
    /// Default target for the logging macros.
    pub const DIAGRAM: &str = "horizon_diagram";
    /// Core systems target.
    pub const CORE: &str = "horizon_diagram_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_diagram_core::signal";
    /// Item model target.
    pub const MODEL: &str = "horizon_diagram::model";
    /// Selection model target.
    pub const SELECTION: &str = "horizon_diagram::model::selection";
    /// Scene synchronization target.
    pub const SCENE: &str = "horizon_diagram::scene";
    /// Element registry target.
    pub const REGISTRY: &str = "horizon_diagram::scene::registry";
    /// Performance spans target.
    pub const PERF: &str = "horizon_diagram::perf";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show identifiers.
    pub show_ids: bool,
    /// Whether to show geometry.
    pub show_geometry: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_geometry: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for minimal output (labels only).
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_geometry: false,
            ..Default::default()
        }
    }

    /// Whether a node at `depth` is within the configured maximum depth.
    pub fn includes_depth(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
    }

    /// Build the line prefix for a node at `depth`.
    ///
    /// Depth 0 has no prefix. `is_last` selects the closing connector for the
    /// last child of a parent.
    pub fn prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, tee, corner) = match self.style {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            for _ in 0..self.indent_size {
                prefix.push(' ');
            }
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for measuring the duration of rebuilds and bulk updates.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_diagram::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Wrappers around the `tracing` macros with the crate-wide target.
#[macro_export]
macro_rules! diagram_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_diagram", $($arg)*)
    };
}

#[macro_export]
macro_rules! diagram_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_diagram", $($arg)*)
    };
}

#[macro_export]
macro_rules! diagram_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "horizon_diagram", $($arg)*)
    };
}

#[macro_export]
macro_rules! diagram_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_diagram", $($arg)*)
    };
}

#[macro_export]
macro_rules! diagram_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "horizon_diagram", $($arg)*)
    };
}
