//! Bee/varroa detection workflow tools
//!
//! This library backs the `bee-*` binaries: fetching a labeled dataset export,
//! splitting it into train/valid/test, training, scoring a trained model on the
//! test split, and annotating videos with the model.

pub mod config;
pub mod detector;
pub mod drive;
pub mod evaluate;
pub mod fetch;
pub mod http;
pub mod labels;
pub mod locate;
pub mod logging;
pub mod split;
pub mod train;
pub mod types;
pub mod utils;
pub mod video;

// Re-export commonly used types and functions
pub use config::{EvalArgs, FetchArgs, ModelType, SplitArgs, TrainArgs, VideoArgs};
pub use detector::{Detector, PredictOptions, TrainRequest, Trainer, YoloCli};
pub use evaluate::{prepare_evaluation, run_evaluation, score_predictions, EvalPlan};
pub use locate::{find_dataset, find_latest_model, load_class_names};
pub use split::split_dataset;
pub use types::{BatchReport, EvalReport, ImagePrediction, ItemOutcome, Lookup, SplitReport};
pub use video::{annotate_videos, combine_videos, run_video_pipeline, Ffmpeg, VideoTools};
