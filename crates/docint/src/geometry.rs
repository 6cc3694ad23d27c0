//! Page-relative geometry.
//!
//! All coordinates are normalized to `[0, 1]` with the origin at the top-left
//! corner of the page, so boxes from pages rendered at different resolutions
//! compare directly. Detector output arrives in pixels as [`PixelRect`] and is
//! normalized with the page's pixel dimensions.

use serde::{Deserialize, Serialize};

/// Default overlap threshold (in percent) used when assigning words to cells.
pub const DEFAULT_OVERLAP_PERCENT: f64 = 70.0;

/// A point in normalized page space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle spanning `top` (top-left) to `bot` (bottom-right).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub top: Coord,
    pub bot: Coord,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            top: Coord::new(x0, y0),
            bot: Coord::new(x1, y1),
        }
    }

    pub fn from_coords(top: Coord, bot: Coord) -> Self {
        Self { top, bot }
    }

    pub fn x0(&self) -> f64 {
        self.top.x
    }

    pub fn y0(&self) -> f64 {
        self.top.y
    }

    pub fn x1(&self) -> f64 {
        self.bot.x
    }

    pub fn y1(&self) -> f64 {
        self.bot.y
    }

    pub fn width(&self) -> f64 {
        (self.bot.x - self.top.x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.bot.y - self.top.y).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn y_center(&self) -> f64 {
        (self.top.y + self.bot.y) / 2.0
    }

    /// Intersection of two boxes, `None` when they do not share any area.
    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        let x0 = self.top.x.max(other.top.x);
        let y0 = self.top.y.max(other.top.y);
        let x1 = self.bot.x.min(other.bot.x);
        let y1 = self.bot.y.min(other.bot.y);
        (x0 < x1 && y0 < y1).then(|| BBox::new(x0, y0, x1, y1))
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.top.x.min(other.top.x),
            self.top.y.min(other.top.y),
            self.bot.x.max(other.bot.x),
            self.bot.y.max(other.bot.y),
        )
    }

    /// Returns true when the intersection covers at least `percent`% of `other`'s area.
    ///
    /// The test is not symmetric: the denominator is always the area of `other`.
    /// Callers assigning words to cells pass the word as `other`, so the question
    /// answered is "does this cell contain at least `percent`% of the word".
    /// A zero-area `other` never overlaps.
    pub fn overlaps(&self, other: &BBox, percent: f64) -> bool {
        let other_area = other.area();
        if other_area <= 0.0 {
            return false;
        }
        let shared = self.intersection(other).map_or(0.0, |b| b.area());
        shared > 0.0 && shared >= other_area * percent / 100.0
    }

    /// Test the box's x-extent against `(start, end)`.
    ///
    /// With `partial` the extents only need to intersect; otherwise the box must lie
    /// fully inside the range (bounds inclusive).
    pub fn in_xrange(&self, range: (f64, f64), partial: bool) -> bool {
        let (start, end) = range;
        if partial {
            self.top.x < end && self.bot.x > start
        } else {
            start <= self.top.x && self.bot.x <= end
        }
    }
}

/// Rectangle in page pixels as reported by a grid detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PixelRect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Convert to normalized page space.
    pub fn normalize(&self, page_width: f64, page_height: f64) -> BBox {
        BBox::new(
            self.x0 / page_width,
            self.y0 / page_height,
            self.x1 / page_width,
            self.y1 / page_height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A straight grid line between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub start: Coord,
    pub end: Coord,
    pub orientation: Orientation,
}

impl Edge {
    /// Build an edge, deriving its orientation from the dominant axis.
    pub fn new(start: Coord, end: Coord) -> Self {
        let dx = (end.x - start.x).abs();
        let dy = (end.y - start.y).abs();
        let orientation = if dy > dx {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        };
        Self {
            start,
            end,
            orientation,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.orientation == Orientation::Horizontal
    }

    pub fn length(&self) -> f64 {
        ((self.end.x - self.start.x).powi(2) + (self.end.y - self.start.y).powi(2)).sqrt()
    }
}

/// Line segment in page pixels as reported by a grid detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelEdge {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PixelEdge {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn normalize(&self, page_width: f64, page_height: f64) -> Edge {
        Edge::new(
            Coord::new(self.x0 / page_width, self.y0 / page_height),
            Coord::new(self.x1 / page_width, self.y1 / page_height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dimensions() {
        let b = BBox::new(0.1, 0.2, 0.5, 0.6);
        assert!((b.width() - 0.4).abs() < 1e-9);
        assert!((b.height() - 0.4).abs() < 1e-9);
        assert!((b.area() - 0.16).abs() < 1e-9);
    }

    #[test]
    fn test_overlaps_self_at_full_percent() {
        let b = BBox::new(0.1, 0.1, 0.3, 0.2);
        assert!(b.overlaps(&b, 100.0));
    }

    #[test]
    fn test_disjoint_boxes_never_overlap() {
        let a = BBox::new(0.0, 0.0, 0.1, 0.1);
        let b = BBox::new(0.2, 0.2, 0.3, 0.3);
        assert!(!a.overlaps(&b, 0.001));
        assert!(!b.overlaps(&a, 1.0));
    }

    #[test]
    fn test_touching_boxes_never_overlap() {
        let a = BBox::new(0.0, 0.0, 0.1, 0.1);
        let b = BBox::new(0.1, 0.0, 0.2, 0.1);
        assert!(!a.overlaps(&b, 1.0));
    }

    #[test]
    fn test_overlap_denominator_is_other() {
        let cell = BBox::new(0.0, 0.0, 1.0, 0.1);
        let word = BBox::new(0.5, 0.02, 0.6, 0.08);
        assert!(cell.overlaps(&word, 70.0));
        // Relative to the cell's area the word is tiny.
        assert!(!word.overlaps(&cell, 70.0));
    }

    #[test]
    fn test_overlap_threshold_boundary() {
        let cell = BBox::new(0.0, 0.0, 0.5, 1.0);
        let word = BBox::new(0.25, 0.0, 0.75, 1.0);
        // Half of the word lies inside the cell.
        assert!(cell.overlaps(&word, 50.0));
        assert!(!cell.overlaps(&word, 70.0));
    }

    #[test]
    fn test_zero_area_other_never_overlaps() {
        let cell = BBox::new(0.0, 0.0, 1.0, 1.0);
        let line = BBox::new(0.5, 0.0, 0.5, 1.0);
        assert!(!cell.overlaps(&line, 0.0));
    }

    #[test]
    fn test_in_xrange_partial_and_full() {
        let b = BBox::new(0.2, 0.0, 0.4, 0.1);
        assert!(b.in_xrange((0.3, 0.9), true));
        assert!(!b.in_xrange((0.3, 0.9), false));
        assert!(b.in_xrange((0.2, 0.4), false));
        assert!(!b.in_xrange((0.4, 0.9), true));
    }

    #[test]
    fn test_pixel_rect_normalize() {
        let r = PixelRect::new(100.0, 200.0, 300.0, 400.0);
        let b = r.normalize(1000.0, 2000.0);
        assert_eq!(b, BBox::new(0.1, 0.1, 0.3, 0.2));
    }

    #[test]
    fn test_edge_orientation() {
        let h = Edge::new(Coord::new(0.1, 0.5), Coord::new(0.9, 0.5));
        let v = Edge::new(Coord::new(0.5, 0.1), Coord::new(0.5, 0.9));
        assert!(h.is_horizontal());
        assert_eq!(v.orientation, Orientation::Vertical);
        assert!((h.length() - 0.8).abs() < 1e-9);
    }
}
