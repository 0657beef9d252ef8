//! Stage-level building blocks for custom pipelines.
//!
//! `PostProcessor` covers the common case. These re-exports expose the
//! individual stages and geometry kernels for callers that reshuffle them,
//! e.g. decoding scales on separate threads or filtering without unmapping.

pub use crate::decode::{grid_stride, reshape_raw, YOLOV3_COCO_ANCHORS};
pub use crate::filter::{filter_image, nms_class};
pub use crate::geometry::{center_to_corner, corner_to_center, iou, iou_many, iou_many_scalar};
pub use crate::letterbox::unletterbox_one;
pub use crate::tensor::{ATTR_CX, ATTR_CY, ATTR_H, ATTR_OBJECTNESS, ATTR_W, BOX_ATTRS};

#[cfg(feature = "rayon")]
pub use crate::decode::decode_scales_par;
#[cfg(feature = "rayon")]
pub use crate::filter::filter_detections_par;
#[cfg(feature = "simd")]
pub use crate::geometry::simd::iou_many_simd;
#[cfg(feature = "rayon")]
pub use crate::letterbox::unletterbox_par;
