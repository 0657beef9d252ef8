//! Intersection-over-union on corner-format boxes.

use crate::geometry::CornerBox;

/// IoU of two boxes; zero when they do not overlap or either is degenerate.
#[inline]
pub fn iou(a: &CornerBox, b: &CornerBox) -> f32 {
    let area_a = a.area();
    let area_b = b.area();
    if area_a <= 0.0 || area_b <= 0.0 {
        return 0.0;
    }
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    if inter <= 0.0 {
        return 0.0;
    }
    inter / (area_a + area_b - inter)
}

/// IoU of `reference` against every box in `others`, in order.
///
/// Dispatches to the 8-lane kernel when the `simd` feature is enabled.
pub fn iou_many(reference: &CornerBox, others: &[CornerBox]) -> Vec<f32> {
    #[cfg(feature = "simd")]
    {
        crate::geometry::simd::iou_many_simd(reference, others)
    }
    #[cfg(not(feature = "simd"))]
    {
        iou_many_scalar(reference, others)
    }
}

/// Scalar reference implementation of [`iou_many`].
pub fn iou_many_scalar(reference: &CornerBox, others: &[CornerBox]) -> Vec<f32> {
    others.iter().map(|other| iou(reference, other)).collect()
}

#[cfg(test)]
mod tests {
    use super::{iou, iou_many_scalar};
    use crate::geometry::CornerBox;

    #[test]
    fn half_overlap_is_one_third() {
        let a = CornerBox::new(0.0, 0.0, 2.0, 2.0);
        let b = CornerBox::new(1.0, 0.0, 3.0, 2.0);
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = CornerBox::new(0.0, 0.0, 1.0, 1.0);
        let b = CornerBox::new(1.0, 0.0, 2.0, 1.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn many_preserves_order() {
        let a = CornerBox::new(0.0, 0.0, 2.0, 2.0);
        let list = [
            CornerBox::new(10.0, 10.0, 11.0, 11.0),
            a,
            CornerBox::new(1.0, 0.0, 3.0, 2.0),
        ];
        let out = iou_many_scalar(&a, &list);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 1.0).abs() < 1e-6);
        assert!((out[2] - 1.0 / 3.0).abs() < 1e-6);
    }
}
