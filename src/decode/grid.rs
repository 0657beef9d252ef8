//! Per-scale decode: channel regrouping, activations, offsets and scaling.

use crate::decode::{Anchor, ClassScoring, DecodeParams};
use crate::tensor::{
    CandidateBuffer, PredictionView, ATTR_CX, ATTR_CY, ATTR_H, ATTR_OBJECTNESS, ATTR_W, BOX_ATTRS,
};
use crate::trace::{trace_debug, trace_span};
use crate::util::math::{sigmoid, softmax_in_place};
use crate::util::{YoloDecodeError, YoloDecodeResult};

/// Returns `input_dim / rows`, truncated, as the decoder uses it.
///
/// Fails when the buffer is not square, when the grid is larger than the
/// input, or when the truncated stride does not reproduce the grid size.
pub fn grid_stride(view: &PredictionView<'_>, input_dim: usize) -> YoloDecodeResult<usize> {
    let rows = view.rows();
    if view.cols() != rows {
        return Err(YoloDecodeError::ShapeMismatch {
            context: "grid columns",
            expected: rows,
            got: view.cols(),
        });
    }
    let stride = input_dim / rows;
    if stride == 0 {
        return Err(YoloDecodeError::ShapeMismatch {
            context: "input_dim smaller than grid",
            expected: rows,
            got: input_dim,
        });
    }
    if input_dim % rows != 0 {
        trace_debug!(input_dim, rows, stride, "input_dim not a multiple of grid, stride truncated");
    }
    let grid_size = input_dim / stride;
    if grid_size != rows {
        return Err(YoloDecodeError::ShapeMismatch {
            context: "grid size implied by input_dim",
            expected: grid_size,
            got: rows,
        });
    }
    Ok(stride)
}

/// Regroups a raw buffer into `[batch, rows * cols * num_anchors, 5 + C]`
/// without applying any activation.
///
/// Row `k * num_anchors + a` holds anchor `a` of cell `k = row * cols + col`.
pub fn reshape_raw(
    view: PredictionView<'_>,
    num_anchors: usize,
    num_classes: usize,
) -> YoloDecodeResult<CandidateBuffer> {
    let attrs = BOX_ATTRS + num_classes;
    let expected_channels = num_anchors * attrs;
    if num_anchors == 0 || view.channels() != expected_channels {
        return Err(YoloDecodeError::ShapeMismatch {
            context: "channels (anchors x attributes)",
            expected: expected_channels,
            got: view.channels(),
        });
    }

    let cells = view.rows() * view.cols();
    let rows_out = cells * num_anchors;
    let mut out = CandidateBuffer::zeros(view.batch(), rows_out, attrs);

    for b in 0..view.batch() {
        let block = out.image_mut(b).ok_or(YoloDecodeError::ShapeMismatch {
            context: "batch",
            expected: view.batch(),
            got: b,
        })?;
        for a in 0..num_anchors {
            for j in 0..attrs {
                let plane = view
                    .plane(b, a * attrs + j)
                    .ok_or(YoloDecodeError::ShapeMismatch {
                        context: "channel plane",
                        expected: view.channels(),
                        got: a * attrs + j,
                    })?;
                for (k, &value) in plane.iter().enumerate() {
                    block[(k * num_anchors + a) * attrs + j] = value;
                }
            }
        }
    }
    Ok(out)
}

/// Decodes one scale into absolute center-size candidates.
///
/// The input view is left untouched; a fresh buffer is returned. Anchors are
/// expected in input pixels and must be positive: degenerate anchors produce
/// non-finite sizes rather than an error.
pub fn decode_scale(
    view: PredictionView<'_>,
    anchors: &[Anchor],
    params: DecodeParams,
) -> YoloDecodeResult<CandidateBuffer> {
    let _span = trace_span!(
        "decode_scale",
        grid = view.rows(),
        anchors = anchors.len(),
        batch = view.batch()
    )
    .entered();

    let stride = grid_stride(&view, params.input_dim)?;
    let mut out = reshape_raw(view, anchors.len(), params.num_classes)?;

    let grid_size = view.cols();
    let num_anchors = anchors.len();
    let attrs = out.attrs();
    let scaled: Vec<Anchor> = anchors.iter().map(|a| a.in_grid_units(stride)).collect();
    let stride_f = stride as f32;

    for b in 0..out.batch() {
        let Some(block) = out.image_mut(b) else {
            continue;
        };
        for (idx, row) in block.chunks_exact_mut(attrs).enumerate() {
            let cell = idx / num_anchors;
            let anchor = scaled[idx % num_anchors];
            let col_off = (cell % grid_size) as f32;
            let row_off = (cell / grid_size) as f32;

            row[ATTR_CX] = sigmoid(row[ATTR_CX]) + col_off;
            row[ATTR_CY] = sigmoid(row[ATTR_CY]) + row_off;
            row[ATTR_OBJECTNESS] = sigmoid(row[ATTR_OBJECTNESS]);
            row[ATTR_W] = row[ATTR_W].exp() * anchor.width;
            row[ATTR_H] = row[ATTR_H].exp() * anchor.height;

            let classes = &mut row[BOX_ATTRS..];
            match params.scoring {
                ClassScoring::Sigmoid => {
                    for v in classes.iter_mut() {
                        *v = sigmoid(*v);
                    }
                }
                ClassScoring::Softmax => softmax_in_place(classes),
            }

            for v in &mut row[ATTR_CX..=ATTR_H] {
                *v *= stride_f;
            }
        }
    }

    Ok(out)
}
