//! Anchor priors.

/// Prior box size in network-input pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub width: f32,
    pub height: f32,
}

impl Anchor {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Anchor expressed in grid units for a scale with the given stride.
    #[inline]
    pub fn in_grid_units(self, stride: usize) -> Self {
        let s = stride as f32;
        Self {
            width: self.width / s,
            height: self.height / s,
        }
    }

    /// True when both sides are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// YOLOv3 COCO anchors, coarsest scale (stride 32) first.
pub const YOLOV3_COCO_ANCHORS: [[Anchor; 3]; 3] = [
    [
        Anchor::new(116.0, 90.0),
        Anchor::new(156.0, 198.0),
        Anchor::new(373.0, 326.0),
    ],
    [
        Anchor::new(30.0, 61.0),
        Anchor::new(62.0, 45.0),
        Anchor::new(59.0, 119.0),
    ],
    [
        Anchor::new(10.0, 13.0),
        Anchor::new(16.0, 30.0),
        Anchor::new(33.0, 23.0),
    ],
];
