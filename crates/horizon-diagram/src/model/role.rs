//! Data roles for item models.
//!
//! Each model entry can carry several pieces of data, distinguished by role.
//! The diagram scene reads the display label, tooltip, element kind and,
//! when the model provides them, position and size.

use std::any::Any;
use std::sync::Arc;

use horizon_diagram_geometry::{Point, Size};

/// Standard roles for accessing different aspects of item data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRole {
    /// Primary label. Should return `String`.
    Display,
    /// Icon name or decoration key. Should return `String`.
    Decoration,
    /// Value for editing (may be richer than the label).
    Edit,
    /// Tooltip text. Should return `String`.
    ToolTip,
    /// Status-bar text. Should return `String`.
    StatusTip,
    /// Kind of diagram element (class, package, note...). Should return `String`.
    ElementKind,
    /// Canvas position of the element. Should return `Point`.
    Position,
    /// Preferred element size. Should return `Size`.
    SizeHint,
    /// Application-specific data.
    User(u32),
}

impl ItemRole {
    /// Whether a change to this role can move or resize an element.
    pub fn affects_geometry(&self) -> bool {
        matches!(self, ItemRole::Position | ItemRole::SizeHint)
    }
}

/// Container for item data.
///
/// Custom values are reference-counted, so cloning an `ItemData` never
/// loses information.
#[derive(Debug, Clone, Default)]
pub enum ItemData {
    /// No data.
    #[default]
    None,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Canvas position.
    Point(Point),
    /// Width and height.
    Size(Size),
    /// Type-erased application data.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl ItemData {
    /// Creates custom data from any type.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        ItemData::Custom(Arc::new(value))
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, ItemData::None)
    }

    #[inline]
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ItemData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            ItemData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ItemData::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ItemData::Float(n) => Some(*n),
            ItemData::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ItemData::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<Point> {
        match self {
            ItemData::Point(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_size(&self) -> Option<Size> {
        match self {
            ItemData::Size(s) => Some(*s),
            _ => None,
        }
    }

    /// Downcast custom data to a concrete type.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            ItemData::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl From<String> for ItemData {
    fn from(s: String) -> Self {
        ItemData::String(s)
    }
}

impl From<&str> for ItemData {
    fn from(s: &str) -> Self {
        ItemData::String(s.to_string())
    }
}

impl From<i64> for ItemData {
    fn from(n: i64) -> Self {
        ItemData::Int(n)
    }
}

impl From<i32> for ItemData {
    fn from(n: i32) -> Self {
        ItemData::Int(n as i64)
    }
}

impl From<f64> for ItemData {
    fn from(n: f64) -> Self {
        ItemData::Float(n)
    }
}

impl From<bool> for ItemData {
    fn from(b: bool) -> Self {
        ItemData::Bool(b)
    }
}

impl From<Point> for ItemData {
    fn from(p: Point) -> Self {
        ItemData::Point(p)
    }
}

impl From<Size> for ItemData {
    fn from(s: Size) -> Self {
        ItemData::Size(s)
    }
}

impl<T: Into<ItemData>> From<Option<T>> for ItemData {
    fn from(value: Option<T>) -> Self {
        value.map_or(ItemData::None, Into::into)
    }
}
