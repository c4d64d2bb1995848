use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

/// Download a labeled dataset export from Roboflow.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, disable_version_flag = true)]
pub struct FetchArgs {
    /// Roboflow API key
    #[arg(long = "api-key", env = "ROBOFLOW_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Roboflow workspace name
    #[arg(long, default_value = "thesismodeldev-egt2b")]
    pub workspace: String,

    /// Project name on Roboflow
    #[arg(long, default_value = "bees-varroa")]
    pub project: String,

    /// Dataset version number, latest when omitted
    #[arg(long)]
    pub version: Option<u32>,

    /// Export format (e.g. yolov8, coco, voc)
    #[arg(long, default_value = "yolov8")]
    pub format: String,

    /// Local directory to save the dataset into
    #[arg(long = "output-dir", default_value = "../data")]
    pub output_dir: PathBuf,
}

/// Split `train/` of a dataset into train, valid and test subsets.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct SplitArgs {
    /// Dataset root holding train/images and train/labels
    #[arg(long, default_value = "../data/bee-2")]
    pub root: PathBuf,

    /// Proportion of images kept for training
    #[arg(long = "train-ratio", default_value_t = 0.8, value_parser = validate_ratio)]
    pub train_ratio: f64,

    /// Proportion of images moved to valid/
    #[arg(long = "val-ratio", default_value_t = 0.1, value_parser = validate_ratio)]
    pub val_ratio: f64,

    /// Proportion of images moved to test/ (the remainder is used regardless)
    #[arg(long = "test-ratio", default_value_t = 0.1, value_parser = validate_ratio)]
    pub test_ratio: f64,

    /// Seed for random shuffling, random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for SplitArgs {
    fn default() -> Self {
        Self {
            root: PathBuf::from("../data/bee-2"),
            train_ratio: 0.8,
            val_ratio: 0.1,
            test_ratio: 0.1,
            seed: None,
        }
    }
}

/// Train a YOLOv8 model on the bee dataset.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct TrainArgs {
    /// Path to the dataset folder (searched for data.yaml)
    #[arg(long = "dataset-path", default_value = "../data")]
    pub dataset_path: PathBuf,

    /// YOLOv8 model variant
    #[arg(long = "model-type", value_enum, default_value = "yolov8s")]
    pub model_type: ModelType,

    /// Number of training epochs
    #[arg(long, default_value_t = 100)]
    pub epochs: u32,

    /// Batch size during training
    #[arg(long = "batch-size", default_value_t = 16)]
    pub batch_size: u32,

    /// Training image size
    #[arg(long, default_value_t = 640)]
    pub imgsz: u32,

    /// Name of the run directory created under runs/detect
    #[arg(long = "run-name", default_value = "yolov8_bee_varroa_model")]
    pub run_name: String,

    /// Device passed to the trainer
    #[arg(long, default_value = "0")]
    pub device: String,

    /// Ultralytics command-line executable
    #[arg(long = "yolo-bin", default_value = "yolo")]
    pub yolo_bin: PathBuf,
}

/// Evaluate the latest trained model on the test split.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct EvalArgs {
    /// Directory searched for the dataset (data.yaml)
    #[arg(long = "data-dir", default_value = "../data")]
    pub data_dir: PathBuf,

    /// Directory holding training runs (<run>/weights/best.*)
    #[arg(long = "runs-dir", default_value = "../runs/detect")]
    pub runs_dir: PathBuf,

    /// Confidence threshold for predictions
    #[arg(long, default_value_t = 0.25, value_parser = validate_size)]
    pub conf: f32,

    /// Device passed to the detector
    #[arg(long)]
    pub device: Option<String>,

    /// Ultralytics command-line executable
    #[arg(long = "yolo-bin", default_value = "yolo")]
    pub yolo_bin: PathBuf,
}

impl Default for EvalArgs {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("../data"),
            runs_dir: PathBuf::from("../runs/detect"),
            conf: 0.25,
            device: None,
            yolo_bin: PathBuf::from("yolo"),
        }
    }
}

/// Download videos, run detection on each and stitch the results together.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct VideoArgs {
    /// Shared Google Drive folder holding the source videos
    #[arg(
        long = "folder-url",
        default_value = "https://drive.google.com/drive/folders/15XOsqiTSNlE4Dho9ZuhIPKQOom7R3j4N"
    )]
    pub folder_url: String,

    /// Where source videos are downloaded and resized
    #[arg(long = "input-dir", default_value = "videos_input")]
    pub input_dir: PathBuf,

    /// Where annotated videos are collected
    #[arg(long = "output-dir", default_value = "videos_output")]
    pub output_dir: PathBuf,

    /// Concatenation of every annotated video
    #[arg(long = "combined-output", default_value = "all_results_combined.mp4")]
    pub combined_output: PathBuf,

    /// Trained model weights
    #[arg(long = "model-path", default_value = "../runs/detect/yolov8_bee/weights/best.pt")]
    pub model_path: PathBuf,

    /// Width videos are resized to before inference
    #[arg(long = "resize-width", default_value_t = 1280)]
    pub resize_width: u32,

    /// Height videos are resized to before inference
    #[arg(long = "resize-height", default_value_t = 720)]
    pub resize_height: u32,

    /// Maximum number of files downloaded from the folder
    #[arg(long = "download-limit", default_value_t = 50)]
    pub download_limit: usize,

    /// Confidence threshold for predictions
    #[arg(long, default_value_t = 0.25, value_parser = validate_size)]
    pub conf: f32,

    /// Inference image size
    #[arg(long, default_value_t = 640)]
    pub imgsz: u32,

    /// Device passed to the detector
    #[arg(long, default_value = "0")]
    pub device: String,

    /// Directory the detector writes its per-video results into
    #[arg(long = "results-dir", default_value = "yolo_video_results")]
    pub results_dir: PathBuf,

    /// Container of the annotated videos
    #[arg(long = "output-ext", default_value = "mp4")]
    pub output_ext: String,

    /// Only process videos already present in the input directory
    #[arg(long = "skip-download")]
    pub skip_download: bool,

    /// Ultralytics command-line executable
    #[arg(long = "yolo-bin", default_value = "yolo")]
    pub yolo_bin: PathBuf,

    /// ffmpeg executable
    #[arg(long = "ffmpeg-bin", default_value = "ffmpeg")]
    pub ffmpeg_bin: PathBuf,
}

impl Default for VideoArgs {
    fn default() -> Self {
        Self {
            folder_url: "https://drive.google.com/drive/folders/15XOsqiTSNlE4Dho9ZuhIPKQOom7R3j4N"
                .to_string(),
            input_dir: PathBuf::from("videos_input"),
            output_dir: PathBuf::from("videos_output"),
            combined_output: PathBuf::from("all_results_combined.mp4"),
            model_path: PathBuf::from("../runs/detect/yolov8_bee/weights/best.pt"),
            resize_width: 1280,
            resize_height: 720,
            download_limit: 50,
            conf: 0.25,
            imgsz: 640,
            device: "0".to_string(),
            results_dir: PathBuf::from("yolo_video_results"),
            output_ext: "mp4".to_string(),
            skip_download: false,
            yolo_bin: PathBuf::from("yolo"),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }
}

// YOLOv8 pretrained variants
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum ModelType {
    Yolov8n,
    Yolov8s,
    Yolov8m,
    Yolov8l,
    Yolov8x,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Yolov8n => "yolov8n",
            ModelType::Yolov8s => "yolov8s",
            ModelType::Yolov8m => "yolov8m",
            ModelType::Yolov8l => "yolov8l",
            ModelType::Yolov8x => "yolov8x",
        }
    }

    /// Pretrained checkpoint the trainer starts from
    pub fn weights_file(&self) -> String {
        format!("{}.pt", self.as_str())
    }
}

// Validate that the size is between 0.0 and 1.0
pub fn validate_size(s: &str) -> Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("SIZE must be between 0.0 and 1.0".to_string()),
    }
}

// Split ratios stay f64 so floor(n * ratio) matches decimal intuition (10 * 0.7 -> 7)
pub fn validate_ratio(s: &str) -> Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("SIZE must be between 0.0 and 1.0".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_size() {
        assert!(validate_size("0.5").is_ok());
        assert!(validate_size("1.0").is_ok());
        assert!(validate_size("0.0").is_ok());
        assert!(validate_size("-0.1").is_err());
        assert!(validate_size("1.1").is_err());
        assert!(validate_size("abc").is_err());
        assert_eq!(validate_ratio("0.7"), Ok(0.7));
        assert!(validate_ratio("1.5").is_err());
    }

    #[test]
    fn test_split_args_defaults_match_cli() {
        let parsed = SplitArgs::parse_from(["bee-split"]);
        let defaults = SplitArgs::default();
        assert_eq!(parsed.root, defaults.root);
        assert_eq!(parsed.train_ratio, defaults.train_ratio);
        assert_eq!(parsed.val_ratio, defaults.val_ratio);
        assert_eq!(parsed.test_ratio, defaults.test_ratio);
        assert_eq!(parsed.seed, None);
    }

    #[test]
    fn test_video_args_defaults_match_cli() {
        let parsed = VideoArgs::parse_from(["bee-videos"]);
        let defaults = VideoArgs::default();
        assert_eq!(parsed.folder_url, defaults.folder_url);
        assert_eq!(parsed.resize_width, 1280);
        assert_eq!(parsed.resize_height, 720);
        assert_eq!(parsed.download_limit, 50);
        assert_eq!(parsed.output_ext, "mp4");
        assert!(!parsed.skip_download);
    }

    #[test]
    fn test_train_args_model_type() {
        let parsed = TrainArgs::parse_from(["bee-train", "--model-type", "yolov8n", "--epochs", "5"]);
        assert_eq!(parsed.model_type, ModelType::Yolov8n);
        assert_eq!(parsed.model_type.weights_file(), "yolov8n.pt");
        assert_eq!(parsed.epochs, 5);
        assert_eq!(parsed.batch_size, 16);

        assert!(TrainArgs::try_parse_from(["bee-train", "--model-type", "yolov9"]).is_err());
    }

    #[test]
    fn test_fetch_args_defaults() {
        let parsed = FetchArgs::try_parse_from(["bee-fetch", "--api-key", "secret"]).unwrap();
        assert_eq!(parsed.workspace, "thesismodeldev-egt2b");
        assert_eq!(parsed.project, "bees-varroa");
        assert_eq!(parsed.format, "yolov8");
        assert_eq!(parsed.version, None);
    }
}
