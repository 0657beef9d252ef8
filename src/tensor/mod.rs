//! Prediction buffers.
//!
//! `PredictionView` is a borrowed, row-major `[batch, channel, row, col]` view
//! over one detection scale's raw network output. `CandidateBuffer` is the
//! owned `[batch, rows, attrs]` buffer the grid decoder produces, where each
//! row is `[cx, cy, w, h, objectness, class scores...]`.

use crate::util::{YoloDecodeError, YoloDecodeResult};

/// Index of the center x attribute in a candidate row.
pub const ATTR_CX: usize = 0;
/// Index of the center y attribute in a candidate row.
pub const ATTR_CY: usize = 1;
/// Index of the width attribute in a candidate row.
pub const ATTR_W: usize = 2;
/// Index of the height attribute in a candidate row.
pub const ATTR_H: usize = 3;
/// Index of the objectness attribute in a candidate row.
pub const ATTR_OBJECTNESS: usize = 4;
/// Number of attributes preceding the class scores.
pub const BOX_ATTRS: usize = 5;

/// Borrowed 4-D view over a raw prediction buffer.
#[derive(Copy, Clone, Debug)]
pub struct PredictionView<'a> {
    data: &'a [f32],
    shape: [usize; 4],
}

impl<'a> PredictionView<'a> {
    /// Creates a view with shape `[batch, channels, rows, cols]`.
    pub fn new(data: &'a [f32], shape: [usize; 4]) -> YoloDecodeResult<Self> {
        if shape.iter().any(|&d| d == 0) {
            return Err(YoloDecodeError::InvalidDimensions {
                context: "prediction",
                shape,
            });
        }
        let needed = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(YoloDecodeError::InvalidDimensions {
                context: "prediction",
                shape,
            })?;
        if data.len() < needed {
            return Err(YoloDecodeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data: &data[..needed],
            shape,
        })
    }

    /// Returns `[batch, channels, rows, cols]`.
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn batch(&self) -> usize {
        self.shape[0]
    }

    pub fn channels(&self) -> usize {
        self.shape[1]
    }

    pub fn rows(&self) -> usize {
        self.shape[2]
    }

    pub fn cols(&self) -> usize {
        self.shape[3]
    }

    /// Returns the backing slice, trimmed to the declared shape.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Returns the value at `(b, c, y, x)` if it is within bounds.
    pub fn get(&self, b: usize, c: usize, y: usize, x: usize) -> Option<f32> {
        let [nb, nc, nh, nw] = self.shape;
        if b >= nb || c >= nc || y >= nh || x >= nw {
            return None;
        }
        self.data.get(((b * nc + c) * nh + y) * nw + x).copied()
    }

    /// Returns the contiguous `rows * cols` plane for image `b`, channel `c`.
    pub fn plane(&self, b: usize, c: usize) -> Option<&'a [f32]> {
        let [nb, nc, nh, nw] = self.shape;
        if b >= nb || c >= nc {
            return None;
        }
        let len = nh * nw;
        let start = (b * nc + c) * len;
        self.data.get(start..start + len)
    }
}

/// Owned candidate buffer with shape `[batch, rows, attrs]`.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateBuffer {
    data: Vec<f32>,
    batch: usize,
    rows: usize,
    attrs: usize,
}

impl CandidateBuffer {
    /// Wraps a contiguous buffer, checking its length against the shape.
    pub fn new(data: Vec<f32>, batch: usize, rows: usize, attrs: usize) -> YoloDecodeResult<Self> {
        if attrs <= BOX_ATTRS {
            return Err(YoloDecodeError::ShapeMismatch {
                context: "candidate attributes",
                expected: BOX_ATTRS + 1,
                got: attrs,
            });
        }
        let needed = batch
            .checked_mul(rows)
            .and_then(|v| v.checked_mul(attrs))
            .ok_or(YoloDecodeError::InvalidDimensions {
                context: "candidates",
                shape: [batch, rows, attrs, 1],
            })?;
        if data.len() != needed {
            return Err(YoloDecodeError::ShapeMismatch {
                context: "candidate buffer length",
                expected: needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            batch,
            rows,
            attrs,
        })
    }

    /// Zero-filled buffer.
    pub(crate) fn zeros(batch: usize, rows: usize, attrs: usize) -> Self {
        Self {
            data: vec![0.0; batch * rows * attrs],
            batch,
            rows,
            attrs,
        }
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    /// Candidate rows per image.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Attributes per row, `5 + num_classes`.
    pub fn attrs(&self) -> usize {
        self.attrs
    }

    pub fn num_classes(&self) -> usize {
        self.attrs - BOX_ATTRS
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Returns the `rows * attrs` block for image `b`.
    pub fn image(&self, b: usize) -> Option<&[f32]> {
        if b >= self.batch {
            return None;
        }
        let len = self.rows * self.attrs;
        self.data.get(b * len..(b + 1) * len)
    }

    pub(crate) fn image_mut(&mut self, b: usize) -> Option<&mut [f32]> {
        if b >= self.batch {
            return None;
        }
        let len = self.rows * self.attrs;
        self.data.get_mut(b * len..(b + 1) * len)
    }

    /// Returns one candidate row.
    pub fn row(&self, b: usize, r: usize) -> Option<&[f32]> {
        if r >= self.rows {
            return None;
        }
        let block = self.image(b)?;
        block.get(r * self.attrs..(r + 1) * self.attrs)
    }

    /// Concatenates buffers along the row axis, preserving argument order.
    ///
    /// All parts must agree on batch size and attribute count.
    pub fn concat(parts: &[CandidateBuffer]) -> YoloDecodeResult<Self> {
        let first = parts.first().ok_or(YoloDecodeError::InvalidConfig {
            reason: "no candidate buffers to concatenate",
        })?;
        let (batch, attrs) = (first.batch, first.attrs);
        for part in parts {
            if part.batch != batch {
                return Err(YoloDecodeError::ShapeMismatch {
                    context: "concat batch",
                    expected: batch,
                    got: part.batch,
                });
            }
            if part.attrs != attrs {
                return Err(YoloDecodeError::ShapeMismatch {
                    context: "concat attributes",
                    expected: attrs,
                    got: part.attrs,
                });
            }
        }

        let rows: usize = parts.iter().map(|p| p.rows).sum();
        let mut data = Vec::with_capacity(batch * rows * attrs);
        for b in 0..batch {
            for part in parts {
                if let Some(block) = part.image(b) {
                    data.extend_from_slice(block);
                }
            }
        }
        Ok(Self {
            data,
            batch,
            rows,
            attrs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rejects_zero_axis() {
        let data = [0.0f32; 4];
        let err = PredictionView::new(&data, [1, 0, 2, 2]).unwrap_err();
        assert_eq!(
            err,
            YoloDecodeError::InvalidDimensions {
                context: "prediction",
                shape: [1, 0, 2, 2],
            }
        );
    }

    #[test]
    fn view_indexes_row_major() {
        let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
        let view = PredictionView::new(&data, [1, 2, 3, 4]).unwrap();
        assert_eq!(view.get(0, 1, 2, 3), Some(23.0));
        assert_eq!(view.get(0, 0, 1, 0), Some(4.0));
        assert_eq!(view.plane(0, 1).unwrap()[0], 12.0);
        assert!(view.get(1, 0, 0, 0).is_none());
    }

    #[test]
    fn concat_interleaves_per_image() {
        let a = CandidateBuffer::new(vec![1.0; 2 * 6], 2, 1, 6).unwrap();
        let b = CandidateBuffer::new(vec![2.0; 2 * 6], 2, 1, 6).unwrap();
        let joined = CandidateBuffer::concat(&[a, b]).unwrap();
        assert_eq!(joined.rows(), 2);
        assert_eq!(joined.row(1, 0).unwrap()[0], 1.0);
        assert_eq!(joined.row(1, 1).unwrap()[0], 2.0);
    }
}
