//! Grid decoding of raw detector output.
//!
//! Each detection scale emits `num_anchors * (5 + num_classes)` channels per
//! grid cell. Decoding regroups them into one candidate row per
//! `(cell, anchor)` pair and maps the raw regression values to absolute
//! input-pixel boxes. Scales are independent and can be decoded in parallel
//! with the `rayon` feature.

mod anchors;
mod grid;

pub use anchors::{Anchor, YOLOV3_COCO_ANCHORS};
pub use grid::{decode_scale, grid_stride, reshape_raw};

use crate::tensor::{CandidateBuffer, PredictionView};
use crate::trace::{trace_event, trace_span};
use crate::util::YoloDecodeResult;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// How class logits are turned into class scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClassScoring {
    /// Independent logistic per class (multi-label).
    #[default]
    Sigmoid,
    /// Softmax across the class channels of a row (mutually exclusive).
    Softmax,
}

/// Parameters shared by every scale of one decode call.
#[derive(Clone, Copy, Debug)]
pub struct DecodeParams {
    /// Number of object classes.
    pub num_classes: usize,
    /// Side length of the square network input in pixels.
    pub input_dim: usize,
    /// Class score activation.
    pub scoring: ClassScoring,
}

/// One scale's raw output together with the anchors it was trained with.
#[derive(Clone, Copy, Debug)]
pub struct ScaleInput<'a> {
    pub view: PredictionView<'a>,
    pub anchors: &'a [Anchor],
}

impl<'a> ScaleInput<'a> {
    pub fn new(view: PredictionView<'a>, anchors: &'a [Anchor]) -> Self {
        Self { view, anchors }
    }
}

/// Decodes every scale and concatenates the candidates in scale order.
pub fn decode_scales(
    scales: &[ScaleInput<'_>],
    params: DecodeParams,
) -> YoloDecodeResult<CandidateBuffer> {
    let _span = trace_span!("decode_scales", scales = scales.len()).entered();

    let mut parts = Vec::with_capacity(scales.len());
    for scale in scales {
        parts.push(decode_scale(scale.view, scale.anchors, params)?);
    }
    let out = CandidateBuffer::concat(&parts)?;

    trace_event!("decoded_candidates", rows = out.rows(), batch = out.batch());
    Ok(out)
}

/// Decodes scales in parallel (rayon); output is identical to [`decode_scales`].
#[cfg(feature = "rayon")]
pub fn decode_scales_par(
    scales: &[ScaleInput<'_>],
    params: DecodeParams,
) -> YoloDecodeResult<CandidateBuffer> {
    let _span = trace_span!("decode_scales", scales = scales.len(), parallel = true).entered();

    let parts = scales
        .par_iter()
        .map(|scale| decode_scale(scale.view, scale.anchors, params))
        .collect::<YoloDecodeResult<Vec<_>>>()?;
    let out = CandidateBuffer::concat(&parts)?;

    trace_event!("decoded_candidates", rows = out.rows(), batch = out.batch());
    Ok(out)
}
