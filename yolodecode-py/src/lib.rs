//! Python bindings for yolodecode.
//!
//! Exposes decoding, filtering and unletterboxing of YOLOv3 outputs over
//! numpy arrays via PyO3.

use numpy::{
    PyArray1, PyArray3, PyArrayMethods, PyReadonlyArray3, PyReadonlyArray4,
    PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use yolodecode::{
    Anchor, CandidateBuffer, ClassNames, ClassScoring, CornerBox, Detection as RustDetection,
    FilterOutcome, ImageDims, PostProcessConfig as RustPostProcessConfig,
    PostProcessor as RustPostProcessor, PredictionView, ScaleConfig, YoloDecodeError,
};

/// Convert a YoloDecodeError to a Python exception.
fn to_py_err(err: YoloDecodeError) -> PyErr {
    match err {
        YoloDecodeError::ClassNamesIo { .. } | YoloDecodeError::ImageIo { .. } => {
            PyIOError::new_err(err.to_string())
        }
        YoloDecodeError::InvalidConfig { .. }
        | YoloDecodeError::InvalidDimensions { .. }
        | YoloDecodeError::BufferTooSmall { .. }
        | YoloDecodeError::ShapeMismatch { .. } => PyValueError::new_err(err.to_string()),
        YoloDecodeError::IndexMismatch { .. } | YoloDecodeError::InvalidImageDims { .. } => {
            PyRuntimeError::new_err(err.to_string())
        }
    }
}

fn parse_scoring(name: &str) -> PyResult<ClassScoring> {
    match name.to_lowercase().as_str() {
        "sigmoid" => Ok(ClassScoring::Sigmoid),
        "softmax" => Ok(ClassScoring::Softmax),
        _ => Err(PyValueError::new_err(
            "class_scoring must be 'sigmoid' or 'softmax'",
        )),
    }
}

fn to_image_dims(dims: &[(f32, f32)]) -> Vec<ImageDims> {
    dims.iter().map(|&(w, h)| ImageDims::new(w, h)).collect()
}

/// One surviving box with its scores.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    /// Index of the image in the batch.
    #[pyo3(get)]
    pub batch_index: usize,
    #[pyo3(get)]
    pub x1: f32,
    #[pyo3(get)]
    pub y1: f32,
    #[pyo3(get)]
    pub x2: f32,
    #[pyo3(get)]
    pub y2: f32,
    #[pyo3(get)]
    pub objectness: f32,
    /// Best class score.
    #[pyo3(get)]
    pub class_score: f32,
    #[pyo3(get)]
    pub class_index: usize,
}

#[pymethods]
impl Detection {
    /// Row as `[batch_index, x1, y1, x2, y2, objectness, class_score, class_index]`.
    fn to_row(&self) -> [f32; 8] {
        RustDetection::from(self.clone()).to_row()
    }

    fn __repr__(&self) -> String {
        format!(
            "Detection(batch_index={}, box=({:.1}, {:.1}, {:.1}, {:.1}), objectness={:.3}, class_index={}, class_score={:.3})",
            self.batch_index,
            self.x1,
            self.y1,
            self.x2,
            self.y2,
            self.objectness,
            self.class_index,
            self.class_score
        )
    }
}

impl From<RustDetection> for Detection {
    fn from(d: RustDetection) -> Self {
        Self {
            batch_index: d.batch_index,
            x1: d.bbox.x1,
            y1: d.bbox.y1,
            x2: d.bbox.x2,
            y2: d.bbox.y2,
            objectness: d.objectness,
            class_score: d.class_score,
            class_index: d.class_index,
        }
    }
}

impl From<Detection> for RustDetection {
    fn from(d: Detection) -> Self {
        Self {
            batch_index: d.batch_index,
            bbox: CornerBox::new(d.x1, d.y1, d.x2, d.y2),
            objectness: d.objectness,
            class_score: d.class_score,
            class_index: d.class_index,
        }
    }
}

/// `None` stands for "no detections in the whole batch".
fn outcome_to_py(outcome: FilterOutcome) -> Option<Vec<Detection>> {
    match outcome {
        FilterOutcome::NoDetections => None,
        FilterOutcome::Detections(dets) => Some(dets.into_iter().map(Detection::from).collect()),
    }
}

/// Configuration for the post-processing pipeline.
#[pyclass]
#[derive(Clone)]
pub struct PostProcessConfig {
    inner: RustPostProcessConfig,
}

#[pymethods]
impl PostProcessConfig {
    /// Create a new PostProcessConfig.
    ///
    /// Args:
    ///     input_dim: Side of the square network input (default: 416)
    ///     num_classes: Number of classes (default: 80)
    ///     anchors: Per-scale lists of (width, height) pairs (default: YOLOv3 COCO)
    ///     objectness_threshold: Strict objectness cut-off (default: 0.5)
    ///     nms_iou_threshold: Suppression IoU (default: 0.4)
    ///     class_scoring: "sigmoid" or "softmax" (default: "sigmoid")
    ///     suppress: Run non-maximum suppression (default: True)
    ///     parallel: Enable parallel execution (default: False)
    #[new]
    #[pyo3(signature = (
        input_dim = 416,
        num_classes = 80,
        anchors = None,
        objectness_threshold = 0.5,
        nms_iou_threshold = 0.4,
        class_scoring = "sigmoid",
        suppress = true,
        parallel = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        input_dim: usize,
        num_classes: usize,
        anchors: Option<Vec<Vec<(f32, f32)>>>,
        objectness_threshold: f32,
        nms_iou_threshold: f32,
        class_scoring: &str,
        suppress: bool,
        parallel: bool,
    ) -> PyResult<Self> {
        let scales = match anchors {
            Some(scales) => scales
                .into_iter()
                .map(|pairs| {
                    ScaleConfig::new(pairs.into_iter().map(|(w, h)| Anchor::new(w, h)).collect())
                })
                .collect(),
            None => ScaleConfig::yolov3_coco(),
        };
        let inner = RustPostProcessConfig {
            input_dim,
            num_classes,
            scales,
            objectness_threshold,
            nms_iou_threshold,
            class_scoring: parse_scoring(class_scoring)?,
            suppress,
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Validate the configuration.
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        let scoring = match self.inner.class_scoring {
            ClassScoring::Sigmoid => "sigmoid",
            ClassScoring::Softmax => "softmax",
        };
        format!(
            "PostProcessConfig(input_dim={}, num_classes={}, scales={}, objectness_threshold={}, nms_iou_threshold={}, class_scoring='{}')",
            self.inner.input_dim,
            self.inner.num_classes,
            self.inner.scales.len(),
            self.inner.objectness_threshold,
            self.inner.nms_iou_threshold,
            scoring
        )
    }
}

/// Decodes, filters and unletterboxes YOLOv3 outputs.
#[pyclass]
pub struct PostProcessor {
    inner: RustPostProcessor,
}

fn prediction_views<'a>(
    predictions: &'a [PyReadonlyArray4<'_, f32>],
) -> PyResult<Vec<PredictionView<'a>>> {
    predictions
        .iter()
        .map(|arr| {
            let s = arr.shape();
            PredictionView::new(arr.as_slice()?, [s[0], s[1], s[2], s[3]]).map_err(to_py_err)
        })
        .collect()
}

#[pymethods]
impl PostProcessor {
    /// Create a post-processor.
    ///
    /// Args:
    ///     config: PostProcessConfig (default: PostProcessConfig())
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<PostProcessConfig>) -> PyResult<Self> {
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let inner = RustPostProcessor::new(cfg).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Decode raw outputs into candidates.
    ///
    /// Args:
    ///     predictions: One float32 array [B, A * (5 + C), g, g] per scale
    ///
    /// Returns:
    ///     float32 array [B, N, 5 + C] of (cx, cy, w, h, objectness, classes...)
    fn decode<'py>(
        &self,
        py: Python<'py>,
        predictions: Vec<PyReadonlyArray4<'py, f32>>,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        let views = prediction_views(&predictions)?;
        let candidates = self.inner.decode(&views).map_err(to_py_err)?;
        let shape = [candidates.batch(), candidates.rows(), candidates.attrs()];
        PyArray1::from_vec(py, candidates.into_vec()).reshape(shape)
    }

    /// Threshold and suppress decoded candidates.
    ///
    /// Args:
    ///     candidates: float32 array [B, N, 5 + C]
    ///
    /// Returns:
    ///     List of Detection in network-input pixels, or None when nothing survives
    fn filter(&self, candidates: PyReadonlyArray3<'_, f32>) -> PyResult<Option<Vec<Detection>>> {
        let s = candidates.shape();
        let buffer = CandidateBuffer::new(candidates.as_slice()?.to_vec(), s[0], s[1], s[2])
            .map_err(to_py_err)?;
        let outcome = self.inner.filter(&buffer).map_err(to_py_err)?;
        Ok(outcome_to_py(outcome))
    }

    /// Run the full pipeline.
    ///
    /// Args:
    ///     predictions: One float32 array [B, A * (5 + C), g, g] per scale
    ///     image_dims: (width, height) of each original image
    ///
    /// Returns:
    ///     List of Detection in original-image pixels, or None when nothing survives
    fn run(
        &self,
        predictions: Vec<PyReadonlyArray4<'_, f32>>,
        image_dims: Vec<(f32, f32)>,
    ) -> PyResult<Option<Vec<Detection>>> {
        let views = prediction_views(&predictions)?;
        let outcome = self
            .inner
            .run(&views, &to_image_dims(&image_dims))
            .map_err(to_py_err)?;
        Ok(outcome_to_py(outcome))
    }

    fn __repr__(&self) -> String {
        format!(
            "PostProcessor(scales={}, num_classes={})",
            self.inner.config().scales.len(),
            self.inner.config().num_classes
        )
    }
}

/// Map detections from the network input back to their source images.
///
/// Args:
///     detections: List of Detection
///     image_dims: (width, height) of each original image
///     input_dim: Side of the square network input (default: 416)
#[pyfunction]
#[pyo3(signature = (detections, image_dims, input_dim = 416))]
fn unletterbox(
    detections: Vec<Detection>,
    image_dims: Vec<(f32, f32)>,
    input_dim: usize,
) -> PyResult<Vec<Detection>> {
    let dets: Vec<RustDetection> = detections.into_iter().map(RustDetection::from).collect();
    let unmapped = yolodecode::unletterbox(&dets, &to_image_dims(&image_dims), input_dim)
        .map_err(to_py_err)?;
    Ok(unmapped.into_iter().map(Detection::from).collect())
}

/// Load a newline-delimited class names file such as coco.names.
#[pyfunction]
fn load_class_names(path: &str) -> PyResult<Vec<String>> {
    let names = ClassNames::load(path).map_err(to_py_err)?;
    Ok(names.iter().map(str::to_owned).collect())
}

/// Read (width, height) of an image file from its header.
#[pyfunction]
fn image_dims(path: &str) -> PyResult<(f32, f32)> {
    let dims = yolodecode::io::image_dims(path).map_err(to_py_err)?;
    Ok((dims.width, dims.height))
}

/// Python module for YOLOv3 output post-processing.
#[pymodule]
fn _yolodecode(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<PostProcessConfig>()?;
    m.add_class::<PostProcessor>()?;
    m.add_function(wrap_pyfunction!(unletterbox, m)?)?;
    m.add_function(wrap_pyfunction!(load_class_names, m)?)?;
    m.add_function(wrap_pyfunction!(image_dims, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
