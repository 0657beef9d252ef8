//! End-to-end post-processing: decode every scale, filter, then unletterbox.

use crate::decode::{
    decode_scales, Anchor, ClassScoring, DecodeParams, ScaleInput, YOLOV3_COCO_ANCHORS,
};
use crate::filter::{filter_detections, FilterConfig, FilterOutcome};
use crate::letterbox::{unletterbox, ImageDims};
use crate::tensor::{CandidateBuffer, PredictionView};
use crate::trace::{trace_event, trace_span};
use crate::util::{YoloDecodeError, YoloDecodeResult};

#[cfg(feature = "rayon")]
use crate::decode::decode_scales_par;
#[cfg(feature = "rayon")]
use crate::filter::filter_detections_par;
#[cfg(feature = "rayon")]
use crate::letterbox::unletterbox_par;

/// Anchors of one detection scale, in network-input pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleConfig {
    pub anchors: Vec<Anchor>,
}

impl ScaleConfig {
    pub fn new(anchors: Vec<Anchor>) -> Self {
        Self { anchors }
    }

    /// The three YOLOv3 COCO scales, stride 32 first.
    pub fn yolov3_coco() -> Vec<ScaleConfig> {
        YOLOV3_COCO_ANCHORS
            .iter()
            .map(|scale| ScaleConfig::new(scale.to_vec()))
            .collect()
    }
}

/// Configuration for [`PostProcessor`].
#[derive(Clone, Debug)]
pub struct PostProcessConfig {
    /// Side of the square network input in pixels.
    pub input_dim: usize,
    /// Number of object classes.
    pub num_classes: usize,
    /// Anchors per scale, in the order the prediction buffers are supplied.
    pub scales: Vec<ScaleConfig>,
    /// Candidates need objectness strictly above this value.
    pub objectness_threshold: f32,
    /// IoU at or above which a lower-objectness box is suppressed.
    pub nms_iou_threshold: f32,
    /// Class score activation.
    pub class_scoring: ClassScoring,
    /// Run non-maximum suppression.
    pub suppress: bool,
    /// Decode scales and process images in parallel (requires `rayon`).
    pub parallel: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            input_dim: 416,
            num_classes: 80,
            scales: ScaleConfig::yolov3_coco(),
            objectness_threshold: 0.5,
            nms_iou_threshold: 0.4,
            class_scoring: ClassScoring::Sigmoid,
            suppress: true,
            parallel: false,
        }
    }
}

fn unit_interval(v: f32) -> bool {
    (0.0..=1.0).contains(&v)
}

impl PostProcessConfig {
    /// Checks the configuration, including anchor sizes.
    ///
    /// The decoder itself does not trap degenerate anchors; this is the place
    /// to reject them before any buffer is touched.
    pub fn validate(&self) -> YoloDecodeResult<()> {
        if self.input_dim == 0 {
            return Err(YoloDecodeError::InvalidConfig {
                reason: "input_dim must be > 0",
            });
        }
        if self.num_classes == 0 {
            return Err(YoloDecodeError::InvalidConfig {
                reason: "num_classes must be > 0",
            });
        }
        if self.scales.is_empty() {
            return Err(YoloDecodeError::InvalidConfig {
                reason: "at least one scale is required",
            });
        }
        for scale in &self.scales {
            if scale.anchors.is_empty() {
                return Err(YoloDecodeError::InvalidConfig {
                    reason: "every scale needs at least one anchor",
                });
            }
            if !scale.anchors.iter().all(Anchor::is_valid) {
                return Err(YoloDecodeError::InvalidConfig {
                    reason: "anchor sizes must be finite and > 0",
                });
            }
        }
        if !unit_interval(self.objectness_threshold) {
            return Err(YoloDecodeError::InvalidConfig {
                reason: "objectness_threshold must be in [0, 1]",
            });
        }
        if !unit_interval(self.nms_iou_threshold) {
            return Err(YoloDecodeError::InvalidConfig {
                reason: "nms_iou_threshold must be in [0, 1]",
            });
        }
        Ok(())
    }

    pub fn decode_params(&self) -> DecodeParams {
        DecodeParams {
            num_classes: self.num_classes,
            input_dim: self.input_dim,
            scoring: self.class_scoring,
        }
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            objectness_threshold: self.objectness_threshold,
            nms_iou_threshold: self.nms_iou_threshold,
            num_classes: self.num_classes,
            suppress: self.suppress,
        }
    }
}

/// Runs decode, filtering and unmapping with a fixed configuration.
#[derive(Clone, Debug)]
pub struct PostProcessor {
    cfg: PostProcessConfig,
}

impl PostProcessor {
    /// Creates a post-processor after validating `cfg`.
    pub fn new(cfg: PostProcessConfig) -> YoloDecodeResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &PostProcessConfig {
        &self.cfg
    }

    #[cfg_attr(not(any(feature = "rayon", feature = "tracing")), allow(dead_code))]
    fn use_parallel(&self) -> bool {
        cfg!(feature = "rayon") && self.cfg.parallel
    }

    /// Decodes one buffer per configured scale into a single candidate buffer.
    pub fn decode(&self, predictions: &[PredictionView<'_>]) -> YoloDecodeResult<CandidateBuffer> {
        if predictions.len() != self.cfg.scales.len() {
            return Err(YoloDecodeError::ShapeMismatch {
                context: "scale count",
                expected: self.cfg.scales.len(),
                got: predictions.len(),
            });
        }
        let inputs: Vec<ScaleInput<'_>> = predictions
            .iter()
            .zip(&self.cfg.scales)
            .map(|(view, scale)| ScaleInput::new(*view, &scale.anchors))
            .collect();
        let params = self.cfg.decode_params();

        #[cfg(feature = "rayon")]
        if self.use_parallel() {
            return decode_scales_par(&inputs, params);
        }
        decode_scales(&inputs, params)
    }

    /// Thresholds and suppresses decoded candidates (network-input frame).
    pub fn filter(&self, candidates: &CandidateBuffer) -> YoloDecodeResult<FilterOutcome> {
        let cfg = self.cfg.filter_config();

        #[cfg(feature = "rayon")]
        if self.use_parallel() {
            return filter_detections_par(candidates, &cfg);
        }
        filter_detections(candidates, &cfg)
    }

    /// Full pipeline; surviving boxes are returned in original-image pixels.
    pub fn run(
        &self,
        predictions: &[PredictionView<'_>],
        image_dims: &[ImageDims],
    ) -> YoloDecodeResult<FilterOutcome> {
        let _span = trace_span!(
            "pipeline",
            scales = predictions.len(),
            images = image_dims.len(),
            parallel = self.use_parallel()
        )
        .entered();

        let candidates = self.decode(predictions)?;
        let detections = match self.filter(&candidates)? {
            FilterOutcome::NoDetections => {
                trace_event!("pipeline_done", detections = 0usize);
                return Ok(FilterOutcome::NoDetections);
            }
            FilterOutcome::Detections(dets) => dets,
        };

        #[cfg(feature = "rayon")]
        let unmapped = if self.use_parallel() {
            unletterbox_par(&detections, image_dims, self.cfg.input_dim)?
        } else {
            unletterbox(&detections, image_dims, self.cfg.input_dim)?
        };
        #[cfg(not(feature = "rayon"))]
        let unmapped = unletterbox(&detections, image_dims, self.cfg.input_dim)?;

        trace_event!("pipeline_done", detections = unmapped.len());
        Ok(FilterOutcome::Detections(unmapped))
    }
}
