//! Error types for yolodecode.

use thiserror::Error;

/// Result alias for yolodecode operations.
pub type YoloDecodeResult<T> = std::result::Result<T, YoloDecodeError>;

/// Errors that can occur while decoding, filtering or unmapping detections.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum YoloDecodeError {
    /// A tensor dimension was zero.
    #[error("invalid dimensions: {context} has a zero-sized axis {shape:?}")]
    InvalidDimensions {
        context: &'static str,
        shape: [usize; 4],
    },
    /// The backing slice is shorter than the declared shape.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A buffer does not agree with the declared input size, anchors or classes.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    /// A detection refers to an image that has no dimension record.
    #[error("batch index {batch_index} has no image dimensions (only {len} supplied)")]
    IndexMismatch { batch_index: usize, len: usize },
    /// The dims record of an image is zero, negative or non-finite.
    #[error("invalid image dimensions for batch index {batch_index}")]
    InvalidImageDims { batch_index: usize },
    /// A configuration value was rejected by validation.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Reading a class-name list failed.
    #[error("class names io error: {reason}")]
    ClassNamesIo { reason: String },
    /// Reading an image header failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
}
