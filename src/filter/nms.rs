//! Greedy per-class non-maximum suppression.

use crate::filter::Detection;
use crate::geometry::{iou_many, CornerBox};
use std::cmp::Ordering;

fn objectness_desc(a: &Detection, b: &Detection) -> Ordering {
    b.objectness.total_cmp(&a.objectness)
}

/// Sorts by descending objectness; equal scores keep their input order.
pub(crate) fn sort_by_objectness_desc(dets: &mut [Detection]) {
    dets.sort_by(objectness_desc);
}

/// Splits detections into per-class groups, ordered by first appearance.
pub(crate) fn group_by_class(dets: Vec<Detection>) -> Vec<Vec<Detection>> {
    let mut order: Vec<usize> = Vec::new();
    let mut groups: Vec<Vec<Detection>> = Vec::new();
    for det in dets {
        match order.iter().position(|&c| c == det.class_index) {
            Some(pos) => groups[pos].push(det),
            None => {
                order.push(det.class_index);
                groups.push(vec![det]);
            }
        }
    }
    groups
}

/// Suppresses boxes of a single class.
///
/// The group is sorted by descending objectness; each kept box removes every
/// later box whose IoU with it is at least `iou_threshold`. Removed boxes are
/// never used to suppress others. There is no cap on the number kept.
pub fn nms_class(mut group: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    sort_by_objectness_desc(&mut group);
    if group.len() < 2 {
        return group;
    }

    let boxes: Vec<CornerBox> = group.iter().map(|d| d.bbox).collect();
    let mut suppressed = vec![false; group.len()];
    let mut kept = Vec::with_capacity(group.len());

    for i in 0..group.len() {
        if suppressed[i] {
            continue;
        }
        kept.push(group[i]);
        let tail = i + 1;
        for (offset, overlap) in iou_many(&boxes[i], &boxes[tail..]).into_iter().enumerate() {
            if overlap >= iou_threshold {
                suppressed[tail + offset] = true;
            }
        }
    }

    kept
}
