//! Rectangles in logical units.
//!
//! Hosts report geometry as floating point rectangles (pixels in a browser,
//! cells in a terminal). `Bounds` is the one shape every layout routine in the
//! crate speaks; conversions to and from `ratatui` cells live here so the
//! terminal renderer never does its own rounding.

use ratatui::layout::Rect;

/// Axis-aligned rectangle with a signed origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// True when the rectangle has a positive, finite area.
    pub fn has_area(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        if !self.has_area() {
            return false;
        }
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            ..self
        }
    }

    /// Snap to terminal cells. Negative origins clamp to zero.
    pub fn to_cells(&self) -> Rect {
        let to_u16 = |v: f64| v.round().clamp(0.0, u16::MAX as f64) as u16;
        let x = to_u16(self.left);
        let y = to_u16(self.top);
        let right = to_u16(self.right());
        let bottom = to_u16(self.bottom());
        Rect {
            x,
            y,
            width: right.saturating_sub(x),
            height: bottom.saturating_sub(y),
        }
    }
}

impl From<Rect> for Bounds {
    fn from(rect: Rect) -> Self {
        Self {
            left: rect.x as f64,
            top: rect.y as f64,
            width: rect.width as f64,
            height: rect.height as f64,
        }
    }
}
