//! Mapping detections from the square network input back to source images.
//!
//! Images are letterboxed into an `input_dim x input_dim` canvas with a single
//! aspect-preserving factor `min(input_dim / w, input_dim / h)`. Unmapping
//! divides by that factor and clips to the source frame. The letterbox
//! padding offset is not subtracted before dividing, so boxes in non-square
//! sources come out shifted by `pad / scale` along the padded axis; callers
//! that need exact placement must compensate for it themselves.

use crate::filter::Detection;
use crate::trace::{trace_event, trace_span};
use crate::util::{YoloDecodeError, YoloDecodeResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Original size of one image in the batch, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageDims {
    pub width: f32,
    pub height: f32,
}

impl ImageDims {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when both sides are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Factor used to fit the image into the square canvas.
    #[inline]
    pub fn scaling_factor(&self, input_dim: usize) -> f32 {
        let d = input_dim as f32;
        (d / self.width).min(d / self.height)
    }
}

fn check_input_dim(input_dim: usize) -> YoloDecodeResult<()> {
    if input_dim == 0 {
        return Err(YoloDecodeError::InvalidConfig {
            reason: "input_dim must be > 0",
        });
    }
    Ok(())
}

fn dims_for(det: &Detection, image_dims: &[ImageDims]) -> YoloDecodeResult<ImageDims> {
    let dims = image_dims
        .get(det.batch_index)
        .copied()
        .ok_or(YoloDecodeError::IndexMismatch {
            batch_index: det.batch_index,
            len: image_dims.len(),
        })?;
    if !dims.is_valid() {
        return Err(YoloDecodeError::InvalidImageDims {
            batch_index: det.batch_index,
        });
    }
    Ok(dims)
}

/// Unmaps a single detection into the frame described by `dims`.
///
/// Coordinates are divided by the scaling factor, then their absolute value
/// is clamped to `[0, width]` / `[0, height]`. Ordering of the corners is not
/// re-established, so a degenerate box stays degenerate.
pub fn unletterbox_one(det: Detection, dims: ImageDims, input_dim: usize) -> Detection {
    let scale = dims.scaling_factor(input_dim);
    let clamp_x = |v: f32| (v / scale).abs().max(0.0).min(dims.width);
    let clamp_y = |v: f32| (v / scale).abs().max(0.0).min(dims.height);

    let mut out = det;
    out.bbox.x1 = clamp_x(det.bbox.x1);
    out.bbox.y1 = clamp_y(det.bbox.y1);
    out.bbox.x2 = clamp_x(det.bbox.x2);
    out.bbox.y2 = clamp_y(det.bbox.y2);
    out
}

/// Unmaps every detection using the dims record of its batch index.
///
/// Fails with `IndexMismatch` if any detection refers to an image past the
/// end of `image_dims`; nothing is defaulted. A zero `input_dim` is rejected
/// as `InvalidConfig`.
pub fn unletterbox(
    detections: &[Detection],
    image_dims: &[ImageDims],
    input_dim: usize,
) -> YoloDecodeResult<Vec<Detection>> {
    let _span = trace_span!("unletterbox", detections = detections.len()).entered();
    check_input_dim(input_dim)?;

    let mut out = Vec::with_capacity(detections.len());
    for det in detections {
        let dims = dims_for(det, image_dims)?;
        out.push(unletterbox_one(*det, dims, input_dim));
    }

    trace_event!("unletterboxed", count = out.len());
    Ok(out)
}

/// Parallel variant of [`unletterbox`] (rayon); order is preserved.
#[cfg(feature = "rayon")]
pub fn unletterbox_par(
    detections: &[Detection],
    image_dims: &[ImageDims],
    input_dim: usize,
) -> YoloDecodeResult<Vec<Detection>> {
    let _span = trace_span!(
        "unletterbox",
        detections = detections.len(),
        parallel = true
    )
    .entered();
    check_input_dim(input_dim)?;

    let out = detections
        .par_iter()
        .map(|det| dims_for(det, image_dims).map(|dims| unletterbox_one(*det, dims, input_dim)))
        .collect::<YoloDecodeResult<Vec<_>>>()?;

    trace_event!("unletterboxed", count = out.len());
    Ok(out)
}
