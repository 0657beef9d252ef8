//! Detection filtering: objectness threshold, class selection and NMS.
//!
//! Every image of the batch is processed independently:
//! candidates at or below the objectness threshold are dropped, the survivors
//! are converted to corner format and reduced to their best class, and
//! greedy suppression runs inside each class group. Results are concatenated
//! in batch order, so the parallel path (`rayon` feature) returns exactly the
//! same list as the sequential one.

mod nms;

pub use nms::nms_class;

use crate::geometry::{center_to_corner, CenterBox, CornerBox};
use crate::tensor::{
    CandidateBuffer, ATTR_CX, ATTR_CY, ATTR_H, ATTR_OBJECTNESS, ATTR_W, BOX_ATTRS,
};
use crate::trace::{trace_event, trace_span};
use crate::util::math::argmax;
use crate::util::{YoloDecodeError, YoloDecodeResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One surviving box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Index of the image in the batch that produced the box.
    pub batch_index: usize,
    /// Box in corner format.
    pub bbox: CornerBox,
    /// Objectness in `[0, 1]`.
    pub objectness: f32,
    /// Score of the best class.
    pub class_score: f32,
    /// Index of the best class.
    pub class_index: usize,
}

impl Detection {
    /// Flattens to `[batch_index, x1, y1, x2, y2, objectness, class_score, class_index]`.
    pub fn to_row(&self) -> [f32; 8] {
        [
            self.batch_index as f32,
            self.bbox.x1,
            self.bbox.y1,
            self.bbox.x2,
            self.bbox.y2,
            self.objectness,
            self.class_score,
            self.class_index as f32,
        ]
    }
}

/// Thresholds for [`filter_detections`].
#[derive(Clone, Copy, Debug)]
pub struct FilterConfig {
    /// Candidates need objectness strictly above this value.
    pub objectness_threshold: f32,
    /// Boxes with IoU at or above this value against a kept box are removed.
    pub nms_iou_threshold: f32,
    /// Number of class channels in the candidate rows.
    pub num_classes: usize,
    /// Run suppression; when false every thresholded box is kept.
    pub suppress: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            objectness_threshold: 0.5,
            nms_iou_threshold: 0.4,
            num_classes: 80,
            suppress: true,
        }
    }
}

/// Result of filtering a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOutcome {
    /// No candidate in any image cleared the objectness threshold.
    NoDetections,
    /// Surviving boxes, grouped by image then class.
    Detections(Vec<Detection>),
}

impl FilterOutcome {
    /// True for [`FilterOutcome::NoDetections`].
    pub fn is_no_detections(&self) -> bool {
        matches!(self, FilterOutcome::NoDetections)
    }

    /// Borrowed detections; empty for the no-detection signal.
    pub fn detections(&self) -> &[Detection] {
        match self {
            FilterOutcome::NoDetections => &[],
            FilterOutcome::Detections(dets) => dets,
        }
    }

    pub fn into_vec(self) -> Vec<Detection> {
        match self {
            FilterOutcome::NoDetections => Vec::new(),
            FilterOutcome::Detections(dets) => dets,
        }
    }

    fn from_vec(dets: Vec<Detection>) -> Self {
        if dets.is_empty() {
            FilterOutcome::NoDetections
        } else {
            FilterOutcome::Detections(dets)
        }
    }
}

fn check_classes(candidates: &CandidateBuffer, cfg: &FilterConfig) -> YoloDecodeResult<()> {
    if candidates.num_classes() != cfg.num_classes {
        return Err(YoloDecodeError::ShapeMismatch {
            context: "class channels",
            expected: cfg.num_classes,
            got: candidates.num_classes(),
        });
    }
    Ok(())
}

/// Thresholds one image and reduces each row to its best class.
fn threshold_image(
    block: &[f32],
    attrs: usize,
    batch_index: usize,
    threshold: f32,
) -> Vec<Detection> {
    let mut out = Vec::new();
    for row in block.chunks_exact(attrs) {
        let objectness = row[ATTR_OBJECTNESS];
        if objectness.is_nan() || objectness <= threshold {
            continue;
        }
        let Some((class_index, class_score)) = argmax(&row[BOX_ATTRS..]) else {
            continue;
        };
        let bbox = center_to_corner(CenterBox::new(
            row[ATTR_CX],
            row[ATTR_CY],
            row[ATTR_W],
            row[ATTR_H],
        ));
        out.push(Detection {
            batch_index,
            bbox,
            objectness,
            class_score,
            class_index,
        });
    }
    out
}

/// Filters the candidates of image `batch_index`.
pub fn filter_image(
    candidates: &CandidateBuffer,
    batch_index: usize,
    cfg: &FilterConfig,
) -> YoloDecodeResult<Vec<Detection>> {
    check_classes(candidates, cfg)?;
    let block = candidates
        .image(batch_index)
        .ok_or(YoloDecodeError::IndexMismatch {
            batch_index,
            len: candidates.batch(),
        })?;

    let thresholded = threshold_image(
        block,
        candidates.attrs(),
        batch_index,
        cfg.objectness_threshold,
    );
    if thresholded.is_empty() {
        return Ok(Vec::new());
    }
    let before = thresholded.len();

    let mut out = Vec::with_capacity(before);
    for group in nms::group_by_class(thresholded) {
        if cfg.suppress {
            out.extend(nms_class(group, cfg.nms_iou_threshold));
        } else {
            let mut group = group;
            nms::sort_by_objectness_desc(&mut group);
            out.extend(group);
        }
    }

    trace_event!(
        "image_filtered",
        batch_index = batch_index,
        thresholded = before,
        kept = out.len()
    );
    Ok(out)
}

/// Filters every image of the batch and concatenates the survivors.
pub fn filter_detections(
    candidates: &CandidateBuffer,
    cfg: &FilterConfig,
) -> YoloDecodeResult<FilterOutcome> {
    let _span = trace_span!("filter_detections", batch = candidates.batch()).entered();
    check_classes(candidates, cfg)?;

    let mut out = Vec::new();
    for b in 0..candidates.batch() {
        out.extend(filter_image(candidates, b, cfg)?);
    }

    trace_event!("detections_kept", count = out.len());
    Ok(FilterOutcome::from_vec(out))
}

/// Parallel variant of [`filter_detections`] over images (rayon).
#[cfg(feature = "rayon")]
pub fn filter_detections_par(
    candidates: &CandidateBuffer,
    cfg: &FilterConfig,
) -> YoloDecodeResult<FilterOutcome> {
    let _span = trace_span!(
        "filter_detections",
        batch = candidates.batch(),
        parallel = true
    )
    .entered();
    check_classes(candidates, cfg)?;

    let per_image = (0..candidates.batch())
        .into_par_iter()
        .map(|b| filter_image(candidates, b, cfg))
        .collect::<YoloDecodeResult<Vec<_>>>()?;
    let out: Vec<Detection> = per_image.into_iter().flatten().collect();

    trace_event!("detections_kept", count = out.len());
    Ok(FilterOutcome::from_vec(out))
}
