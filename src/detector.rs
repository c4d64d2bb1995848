//! Seams to the external object detector and trainer.
//!
//! The detector is treated as a black box: it reads a source, writes its own
//! artifacts under `<project>/<name>/`, and reports per-image class ids. `YoloCli`
//! drives the Ultralytics `yolo` command-line program; tests substitute fakes.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::labels::label_path_for;
use crate::types::{is_image_file, Detection, ImagePrediction};
use crate::utils::list_files;

/// Options for one detector invocation
#[derive(Debug, Clone)]
pub struct PredictOptions {
    pub conf: f32,
    pub imgsz: u32,
    pub device: Option<String>,
    /// Parent directory for the detector's artifacts
    pub project: PathBuf,
    /// Run name; artifacts land in `project/name`
    pub name: String,
    pub save: bool,
    pub save_txt: bool,
}

impl PredictOptions {
    pub fn new(project: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            conf: 0.25,
            imgsz: 640,
            device: None,
            project: project.into(),
            name: name.into(),
            save: true,
            save_txt: false,
        }
    }

    /// Directory the detector writes its artifacts into
    pub fn output_dir(&self) -> PathBuf {
        self.project.join(&self.name)
    }
}

pub trait Detector {
    /// Run detection over `source` (an image, a directory of images or a video).
    ///
    /// Returns one prediction per source image; video sources may return none.
    fn predict(&mut self, source: &Path, options: &PredictOptions) -> Result<Vec<ImagePrediction>>;
}

/// Everything the trainer needs for one run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainRequest {
    pub data_yaml: PathBuf,
    pub epochs: u32,
    pub batch: u32,
    pub imgsz: u32,
    pub name: String,
    pub device: String,
}

pub trait Trainer {
    fn train(&mut self, request: &TrainRequest) -> Result<()>;
}

/// Ultralytics `yolo` command-line program bound to one set of weights
#[derive(Debug, Clone)]
pub struct YoloCli {
    bin: PathBuf,
    model: PathBuf,
}

impl YoloCli {
    /// Bind to trained weights on disk
    pub fn load(bin: impl Into<PathBuf>, model_path: &Path) -> Result<Self> {
        if !model_path.is_file() {
            bail!("Model weights not found: {}", model_path.display());
        }
        Ok(Self {
            bin: bin.into(),
            model: model_path.to_path_buf(),
        })
    }

    /// Bind to a named pretrained checkpoint (e.g. `yolov8s.pt`), fetched by the tool itself
    pub fn pretrained(bin: impl Into<PathBuf>, weights: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            model: weights.into(),
        }
    }

    pub fn model(&self) -> &Path {
        &self.model
    }

    fn run(&self, args: &[String]) -> Result<()> {
        debug!("Running {} {}", self.bin.display(), args.join(" "));
        let status = Command::new(&self.bin)
            .args(args)
            .status()
            .with_context(|| format!("Failed to launch {}", self.bin.display()))?;
        if !status.success() {
            bail!("{} exited with {}", self.bin.display(), status);
        }
        Ok(())
    }
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl Detector for YoloCli {
    fn predict(&mut self, source: &Path, options: &PredictOptions) -> Result<Vec<ImagePrediction>> {
        let mut args = vec![
            "detect".to_string(),
            "predict".to_string(),
            format!("model={}", self.model.display()),
            format!("source={}", source.display()),
            format!("conf={}", options.conf),
            format!("imgsz={}", options.imgsz),
            format!("save={}", py_bool(options.save)),
            format!("save_txt={}", py_bool(options.save_txt)),
            "save_conf=True".to_string(),
            format!("project={}", options.project.display()),
            format!("name={}", options.name),
            "exist_ok=True".to_string(),
        ];
        if let Some(device) = &options.device {
            args.push(format!("device={}", device));
        }

        // exist_ok reuses the run dir and save_txt appends, so old rows must go first
        let labels_dir = options.output_dir().join("labels");
        if options.save_txt && labels_dir.exists() {
            fs::remove_dir_all(&labels_dir).with_context(|| {
                format!("Failed to clear old predictions in {}", labels_dir.display())
            })?;
        }
        self.run(&args)?;

        let images = if source.is_dir() {
            list_files(source, is_image_file)?
        } else if is_image_file(source) {
            vec![source.to_path_buf()]
        } else {
            return Ok(Vec::new());
        };

        if !options.save_txt {
            warn!("Predictions were not saved as text; per-image classes are unavailable");
        }

        images
            .into_iter()
            .map(|image| {
                let detections = read_predictions(&label_path_for(&image, &labels_dir))?;
                Ok(ImagePrediction::new(image, detections))
            })
            .collect()
    }
}

impl Trainer for YoloCli {
    fn train(&mut self, request: &TrainRequest) -> Result<()> {
        let args = vec![
            "detect".to_string(),
            "train".to_string(),
            format!("data={}", request.data_yaml.display()),
            format!("model={}", self.model.display()),
            format!("epochs={}", request.epochs),
            format!("batch={}", request.batch),
            format!("imgsz={}", request.imgsz),
            format!("name={}", request.name),
            format!("device={}", request.device),
        ];
        self.run(&args)
    }
}

/// Parse one `cls cx cy w h [conf]` row written by the detector
pub fn parse_prediction_line(line: &str) -> Option<Result<Detection, String>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    if tokens.len() < 5 {
        return Some(Err(format!("expected at least 5 columns, got {}", tokens.len())));
    }

    let parse = |token: &str| {
        token
            .parse::<f32>()
            .map_err(|_| format!("invalid number '{}'", token))
    };

    let result = (|| -> Result<Detection, String> {
        let class_id = parse(tokens[0])? as i64;
        let bbox = [
            parse(tokens[1])?,
            parse(tokens[2])?,
            parse(tokens[3])?,
            parse(tokens[4])?,
        ];
        let confidence = tokens.get(5).map(|t| parse(*t)).transpose()?;
        Ok(Detection {
            class_id,
            confidence,
            bbox,
        })
    })();
    Some(result)
}

/// Read the detections saved for one image; a missing file means nothing was detected
pub fn read_predictions(path: &Path) -> Result<Vec<Detection>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read predictions {}", path.display()))?;

    let mut detections = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        match parse_prediction_line(line) {
            None => continue,
            Some(Ok(detection)) => detections.push(detection),
            Some(Err(message)) => bail!("{}:{}: {}", path.display(), line_idx + 1, message),
        }
    }
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prediction_line_with_conf() {
        let detection = parse_prediction_line("1 0.5 0.4 0.2 0.1 0.87").unwrap().unwrap();
        assert_eq!(detection.class_id, 1);
        assert_eq!(detection.bbox, [0.5, 0.4, 0.2, 0.1]);
        assert_eq!(detection.confidence, Some(0.87));
    }

    #[test]
    fn test_parse_prediction_line_without_conf() {
        let detection = parse_prediction_line("0 0.5 0.5 0.5 0.5").unwrap().unwrap();
        assert_eq!(detection.class_id, 0);
        assert_eq!(detection.confidence, None);
    }

    #[test]
    fn test_parse_prediction_line_errors() {
        assert!(parse_prediction_line("").is_none());
        assert!(parse_prediction_line("0 0.5 0.5").unwrap().is_err());
        assert!(parse_prediction_line("0 0.5 x 0.5 0.5").unwrap().is_err());
    }

    #[test]
    fn test_read_predictions_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let detections = read_predictions(&temp_dir.path().join("none.txt")).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_output_dir() {
        let options = PredictOptions::new("yolo_video_results", "RESIZED_clip");
        assert_eq!(
            options.output_dir(),
            PathBuf::from("yolo_video_results/RESIZED_clip")
        );
    }

    #[test]
    fn test_load_requires_weights() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(YoloCli::load("yolo", &temp_dir.path().join("best.pt")).is_err());

        let weights = temp_dir.path().join("best.pt");
        fs::write(&weights, b"weights").unwrap();
        let cli = YoloCli::load("yolo", &weights).unwrap();
        assert_eq!(cli.model(), weights.as_path());
    }
}
