//! SIMD one-against-many IoU using the `wide` crate.
//!
//! Candidate boxes are processed eight at a time with `f32x8`; the tail is
//! finished with the scalar kernel.

use crate::geometry::{iou, CornerBox};
use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn gather(chunk: &[CornerBox], f: impl Fn(&CornerBox) -> f32) -> f32x8 {
    f32x8::from([
        f(&chunk[0]),
        f(&chunk[1]),
        f(&chunk[2]),
        f(&chunk[3]),
        f(&chunk[4]),
        f(&chunk[5]),
        f(&chunk[6]),
        f(&chunk[7]),
    ])
}

/// IoU of `reference` against every box in `others`, eight lanes at a time.
pub fn iou_many_simd(reference: &CornerBox, others: &[CornerBox]) -> Vec<f32> {
    let mut out = Vec::with_capacity(others.len());
    let area_a = reference.area();
    if area_a <= 0.0 {
        out.resize(others.len(), 0.0);
        return out;
    }

    let zero = f32x8::ZERO;
    let ax1 = f32x8::splat(reference.x1);
    let ay1 = f32x8::splat(reference.y1);
    let ax2 = f32x8::splat(reference.x2);
    let ay2 = f32x8::splat(reference.y2);
    let area_a_v = f32x8::splat(area_a);

    let simd_end = others.len() / LANES * LANES;
    for chunk in others[..simd_end].chunks_exact(LANES) {
        let bx1 = gather(chunk, |b| b.x1);
        let by1 = gather(chunk, |b| b.y1);
        let bx2 = gather(chunk, |b| b.x2);
        let by2 = gather(chunk, |b| b.y2);

        let area_b = (bx2 - bx1).max(zero) * (by2 - by1).max(zero);
        let inter_w = (ax2.min(bx2) - ax1.max(bx1)).max(zero);
        let inter_h = (ay2.min(by2) - ay1.max(by1)).max(zero);
        let inter = inter_w * inter_h;
        let ratio = inter / (area_a_v + area_b - inter);

        let valid = area_b.simd_gt(zero) & inter.simd_gt(zero);
        out.extend_from_slice(&valid.blend(ratio, zero).to_array());
    }

    for other in &others[simd_end..] {
        out.push(iou(reference, other));
    }
    out
}
