//! Viewport geometry for the visibility check.
//!
//! All coordinates are CSS pixels relative to the viewport origin, the same
//! space `Element.getBoundingClientRect()` reports in.

/// Bounding box of an element relative to the viewport origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Rect {
    /// Creates a rect from its origin and size.
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            top: y,
            bottom: y + height,
            left: x,
            right: x + width,
        }
    }

    /// Horizontal extent; negative for an inverted rect.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Vertical extent; negative for an inverted rect.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Returns this rect shifted by `dx`/`dy`.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            top: self.top + dy,
            bottom: self.bottom + dy,
            left: self.left + dx,
            right: self.right + dx,
        }
    }
}

/// Size of the visible window area.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Creates a viewport of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns true if any part of `rect` overlaps this viewport.
    ///
    /// Partial overlap counts, including rects hanging off the top or left
    /// edge. A collapsed rect is visible when its origin lies inside.
    pub fn intersects(&self, rect: &Rect) -> bool {
        self.intersects_with_margin(rect, 0.0)
    }

    /// Like [`intersects`](Self::intersects), with the viewport grown by
    /// `margin` pixels on every side.
    pub fn intersects_with_margin(&self, rect: &Rect, margin: f64) -> bool {
        rect.bottom >= -margin
            && rect.right >= -margin
            && rect.top <= self.height + margin
            && rect.left <= self.width + margin
    }
}

/// Returns true if `rect` is at least partially inside `viewport`.
pub fn is_visible(rect: &Rect, viewport: &Viewport) -> bool {
    viewport.intersects(rect)
}
