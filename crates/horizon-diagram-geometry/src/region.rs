//! Regions: unions of rectangles.

use crate::types::{Point, Rect};

/// A set of canvas points described as a union of rectangles.
///
/// Rectangles are kept as added; overlapping members are allowed.
/// Zero-area members are kept and take part in intersection tests the way
/// [`Rect::intersects`] treats them. Rectangles with a negative extent
/// describe no points and are dropped on insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// An empty region.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rect(&mut self, rect: Rect) {
        if rect.width() >= 0.0 && rect.height() >= 0.0 {
            self.rects.push(rect);
        }
    }

    /// The rectangles making up this region.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Whether any member rectangle contains `point`.
    pub fn contains(&self, point: Point) -> bool {
        self.rects.iter().any(|r| r.contains(point))
    }

    /// Whether any member rectangle overlaps `rect`.
    pub fn intersects(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }

    /// The smallest rectangle enclosing the whole region.
    pub fn bounding_rect(&self) -> Option<Rect> {
        self.rects.iter().copied().reduce(|acc, r| acc.union(&r))
    }

}

impl FromIterator<Rect> for Region {
    fn from_iter<I: IntoIterator<Item = Rect>>(iter: I) -> Self {
        let mut region = Region::new();
        for rect in iter {
            region.add_rect(rect);
        }
        region
    }
}
