//! User-gesture vocabulary: cursor movement, modifiers and selection commands.

use horizon_diagram_geometry::Point;

use crate::model::SelectionFlags;

/// Keyboard modifiers held during a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardModifiers {
    pub shift: bool,
    /// Control (Cmd on macOS).
    pub control: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyboardModifiers {
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const CTRL: Self = Self {
        control: true,
        ..Self::NONE
    };

    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// Keyboard cursor movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    /// Next element in traversal order.
    MoveNext,
    /// Previous element in traversal order.
    MovePrevious,
    MoveHome,
    MoveEnd,
}

impl CursorAction {
    /// Unit vector of a directional move (y grows downward).
    pub(crate) fn direction(self) -> Option<(f32, f32)> {
        match self {
            CursorAction::MoveUp => Some((0.0, -1.0)),
            CursorAction::MoveDown => Some((0.0, 1.0)),
            CursorAction::MoveLeft => Some((-1.0, 0.0)),
            CursorAction::MoveRight => Some((1.0, 0.0)),
            _ => None,
        }
    }
}

/// How a region selection combines with the existing selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionCommand {
    /// The hit entries become the whole selection.
    #[default]
    Replace,
    Add,
    Subtract,
    Toggle,
    /// Deselect everything; the region is ignored.
    Clear,
}

impl From<SelectionCommand> for SelectionFlags {
    fn from(command: SelectionCommand) -> Self {
        match command {
            SelectionCommand::Replace => SelectionFlags::CLEAR_AND_SELECT,
            SelectionCommand::Add => SelectionFlags::SELECT,
            SelectionCommand::Subtract => SelectionFlags::DESELECT,
            SelectionCommand::Toggle => SelectionFlags::TOGGLE,
            SelectionCommand::Clear => SelectionFlags::CLEAR,
        }
    }
}

/// Scores a candidate for a directional move from `from` to `to`.
///
/// Returns `None` unless `to` lies strictly in `direction`. Lower is
/// better; the off-axis offset counts double so the primary axis dominates.
pub(crate) fn directional_score(from: Point, to: Point, direction: (f32, f32)) -> Option<f32> {
    let offset = to.to_vec2() - from.to_vec2();
    let direction = Point::new(direction.0, direction.1).to_vec2();
    let primary = offset.dot(direction);
    if primary <= 0.0 {
        return None;
    }
    let secondary = offset.perp_dot(direction).abs();
    Some(primary + 2.0 * secondary)
}
