//! yolodecode turns raw anchor-based detector output into final detections.
//!
//! The pipeline decodes each grid scale into absolute boxes, filters them by
//! objectness with per-class greedy non-maximum suppression, and maps the
//! survivors from the letterboxed network input back to each source image.
//! Everything runs on the CPU over plain `f32` slices, with optional
//! parallelism via the `rayon` feature and SIMD IoU via `simd`.

mod trace;

pub mod classes;
pub mod decode;
pub mod filter;
pub mod geometry;
#[cfg(feature = "image-io")]
pub mod io;
pub mod letterbox;
pub mod lowlevel;
pub mod pipeline;
pub mod tensor;
pub mod util;

pub use classes::ClassNames;
pub use decode::{Anchor, ClassScoring, DecodeParams, ScaleInput};
pub use filter::{Detection, FilterConfig, FilterOutcome};
pub use geometry::{CenterBox, CornerBox};
pub use letterbox::ImageDims;
pub use pipeline::{PostProcessConfig, PostProcessor, ScaleConfig};
pub use tensor::{CandidateBuffer, PredictionView};
pub use util::{YoloDecodeError, YoloDecodeResult};

pub use decode::{decode_scale, decode_scales};
pub use filter::filter_detections;
pub use letterbox::unletterbox;
