//! Axis-aligned box primitives.
//!
//! Two encodings are used across the pipeline: `CenterBox` (center + size) is
//! what the grid decoder produces, `CornerBox` (top-left + bottom-right) is
//! what suppression and unmapping operate on. Conversions are exact inverses
//! up to floating-point rounding.

mod iou;
#[cfg(feature = "simd")]
pub mod simd;

pub use iou::{iou, iou_many, iou_many_scalar};

/// Box in center-size format, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CenterBox {
    /// Center x.
    pub cx: f32,
    /// Center y.
    pub cy: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

/// Box in corner format, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CornerBox {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
}

impl CenterBox {
    pub fn new(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self { cx, cy, w, h }
    }

    /// Converts to corner format.
    pub fn to_corner(self) -> CornerBox {
        center_to_corner(self)
    }
}

impl CornerBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Converts to center-size format.
    pub fn to_center(self) -> CenterBox {
        corner_to_center(self)
    }

    /// Width, negative for inverted boxes.
    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Height, negative for inverted boxes.
    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Area, or zero when either side is non-positive.
    #[inline]
    pub fn area(&self) -> f32 {
        let w = self.width();
        let h = self.height();
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// Returns the box shifted by `(dx, dy)`.
    pub fn translated(self, dx: f32, dy: f32) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }
}

/// `(cx, cy, w, h)` to `(x1, y1, x2, y2)`.
#[inline]
pub fn center_to_corner(b: CenterBox) -> CornerBox {
    let half_w = b.w / 2.0;
    let half_h = b.h / 2.0;
    CornerBox {
        x1: b.cx - half_w,
        y1: b.cy - half_h,
        x2: b.cx + half_w,
        y2: b.cy + half_h,
    }
}

/// `(x1, y1, x2, y2)` to `(cx, cy, w, h)`.
#[inline]
pub fn corner_to_center(b: CornerBox) -> CenterBox {
    let w = b.x2 - b.x1;
    let h = b.y2 - b.y1;
    CenterBox {
        cx: b.x1 + w / 2.0,
        cy: b.y1 + h / 2.0,
        w,
        h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_conversion_matches_hand_values() {
        let c = center_to_corner(CenterBox::new(10.0, 20.0, 4.0, 6.0));
        assert_eq!(c, CornerBox::new(8.0, 17.0, 12.0, 23.0));
        assert_eq!(c.to_center(), CenterBox::new(10.0, 20.0, 4.0, 6.0));
    }

    #[test]
    fn area_is_zero_for_inverted_boxes() {
        assert_eq!(CornerBox::new(5.0, 5.0, 1.0, 9.0).area(), 0.0);
        assert_eq!(CornerBox::new(0.0, 0.0, 2.0, 3.0).area(), 6.0);
    }
}
