//! Geometry value types for Horizon Diagram.
//!
//! All coordinates are `f32` canvas units. Rectangles are half-open: the
//! left and top edges are inside, the right and bottom edges are not.

mod region;
mod types;

pub use region::Region;
pub use types::{Point, Rect, Size};
