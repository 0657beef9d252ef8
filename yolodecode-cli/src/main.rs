use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use yolodecode::io::image_dims;
use yolodecode::{
    Anchor, ClassNames, ClassScoring, Detection, FilterOutcome, ImageDims, PostProcessConfig,
    PostProcessor, PredictionView, ScaleConfig, YoloDecodeError, YoloDecodeResult,
};

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "YOLOv3 output post-processing (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ClassScoringConfig {
    Sigmoid,
    Softmax,
}

impl From<ClassScoringConfig> for ClassScoring {
    fn from(value: ClassScoringConfig) -> Self {
        match value {
            ClassScoringConfig::Sigmoid => ClassScoring::Sigmoid,
            ClassScoringConfig::Softmax => ClassScoring::Softmax,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScaleConfigJson {
    /// Little-endian `f32` dump of `[batch, A * (5 + C), g, g]`.
    path: String,
    grid_size: usize,
    /// `[width, height]` pairs; the COCO set for this scale index when omitted.
    anchors: Option<Vec<[f32; 2]>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageConfigJson {
    Dims { width: f32, height: f32 },
    Path { path: String },
}

impl ImageConfigJson {
    fn dims(&self) -> Result<ImageDims, Box<dyn std::error::Error>> {
        match self {
            ImageConfigJson::Dims { width, height } => Ok(ImageDims::new(*width, *height)),
            ImageConfigJson::Path { path } => Ok(image_dims(path)?),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FilterConfigJson {
    objectness_threshold: f32,
    nms_iou_threshold: f32,
    class_scoring: ClassScoringConfig,
    suppress: bool,
    parallel: bool,
}

impl Default for FilterConfigJson {
    fn default() -> Self {
        let cfg = PostProcessConfig::default();
        Self {
            objectness_threshold: cfg.objectness_threshold,
            nms_iou_threshold: cfg.nms_iou_threshold,
            class_scoring: ClassScoringConfig::Sigmoid,
            suppress: cfg.suppress,
            parallel: cfg.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    input_dim: usize,
    num_classes: usize,
    batch: usize,
    scales: Vec<ScaleConfigJson>,
    images: Vec<ImageConfigJson>,
    names_path: Option<String>,
    filter: FilterConfigJson,
    output_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let cfg = PostProcessConfig::default();
        Self {
            input_dim: cfg.input_dim,
            num_classes: cfg.num_classes,
            batch: 1,
            scales: Vec::new(),
            images: Vec::new(),
            names_path: None,
            filter: FilterConfigJson::default(),
            output_path: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    batch_index: usize,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    objectness: f32,
    class_score: f32,
    class_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
}

impl DetectionRecord {
    fn new(det: &Detection, names: Option<&ClassNames>) -> Self {
        Self {
            batch_index: det.batch_index,
            x1: det.bbox.x1,
            y1: det.bbox.y1,
            x2: det.bbox.x2,
            y2: det.bbox.y2,
            objectness: det.objectness,
            class_score: det.class_score,
            class_index: det.class_index,
            class_name: names
                .and_then(|n| n.get(det.class_index))
                .map(str::to_owned),
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    status: &'static str,
    detections: Vec<DetectionRecord>,
}

fn read_f32_le(path: &str) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    if bytes.len() % 4 != 0 {
        return Err(format!("{path}: length {} is not a multiple of 4", bytes.len()).into());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Wraps one scale dump, which must hold exactly `shape` values.
fn scale_view(data: &[f32], shape: [usize; 4]) -> YoloDecodeResult<PredictionView<'_>> {
    let view = PredictionView::new(data, shape)?;
    if data.len() != view.as_slice().len() {
        return Err(YoloDecodeError::ShapeMismatch {
            context: "scale dump length",
            expected: view.as_slice().len(),
            got: data.len(),
        });
    }
    Ok(view)
}

fn scale_configs(config: &Config) -> Result<Vec<ScaleConfig>, Box<dyn std::error::Error>> {
    let defaults = ScaleConfig::yolov3_coco();
    config
        .scales
        .iter()
        .enumerate()
        .map(
            |(i, scale)| -> Result<ScaleConfig, Box<dyn std::error::Error>> {
                match &scale.anchors {
                    Some(pairs) => Ok(ScaleConfig::new(
                        pairs.iter().map(|&[w, h]| Anchor::new(w, h)).collect(),
                    )),
                    None => defaults.get(i).cloned().ok_or_else(|| {
                        format!("scale {i} has no anchors and no default exists").into()
                    }),
                }
            },
        )
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("yolodecode=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.scales.is_empty() {
        return Err("at least one entry in scales must be set in the config".into());
    }
    if config.batch == 0 {
        return Err("batch must be at least 1".into());
    }
    if config.images.len() != config.batch {
        return Err(format!(
            "images lists {} entries but batch is {}",
            config.images.len(),
            config.batch
        )
        .into());
    }

    let processor = PostProcessor::new(PostProcessConfig {
        input_dim: config.input_dim,
        num_classes: config.num_classes,
        scales: scale_configs(&config)?,
        objectness_threshold: config.filter.objectness_threshold,
        nms_iou_threshold: config.filter.nms_iou_threshold,
        class_scoring: config.filter.class_scoring.into(),
        suppress: config.filter.suppress,
        parallel: config.filter.parallel,
    })?;

    let buffers = config
        .scales
        .iter()
        .map(|scale| read_f32_le(&scale.path))
        .collect::<Result<Vec<_>, _>>()?;
    let views = config
        .scales
        .iter()
        .zip(&buffers)
        .zip(&processor.config().scales)
        .map(|((scale, data), scale_cfg)| {
            let channels = scale_cfg.anchors.len() * (5 + config.num_classes);
            scale_view(
                data,
                [config.batch, channels, scale.grid_size, scale.grid_size],
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    let dims = config
        .images
        .iter()
        .map(ImageConfigJson::dims)
        .collect::<Result<Vec<_>, _>>()?;
    let names = config
        .names_path
        .as_deref()
        .map(ClassNames::load)
        .transpose()?;

    let output = match processor.run(&views, &dims)? {
        FilterOutcome::NoDetections => Output {
            status: "no_detections",
            detections: Vec::new(),
        },
        FilterOutcome::Detections(dets) => Output {
            status: "ok",
            detections: dets
                .iter()
                .map(|det| DetectionRecord::new(det, names.as_ref()))
                .collect(),
        },
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
