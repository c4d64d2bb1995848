//! Test-set evaluation of the latest trained model.
//!
//! The metric is deliberately coarse: an image is "correct" when any predicted
//! class also appears in its ground truth. Box placement is never compared.

use anyhow::{bail, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::config::EvalArgs;
use crate::detector::{Detector, PredictOptions};
use crate::labels::{label_path_for, read_class_ids};
use crate::locate::{data_yaml_path, find_dataset, find_latest_model, load_class_names};
use crate::success;
use crate::types::{EvalReport, ImagePrediction, Lookup};
use crate::utils::ensure_directory;

pub const PREDICTIONS_RUN_NAME: &str = "preds";

/// Everything located on disk before the detector is loaded
#[derive(Debug, Clone)]
pub struct EvalPlan {
    pub dataset_root: PathBuf,
    pub class_names: Vec<String>,
    pub test_images: PathBuf,
    pub test_labels: PathBuf,
    pub model_path: PathBuf,
    pub results_dir: PathBuf,
}

impl EvalPlan {
    /// Where the detector saves annotated test images
    pub fn predictions_dir(&self) -> PathBuf {
        self.results_dir.join(PREDICTIONS_RUN_NAME)
    }
}

/// Locate the dataset, its test split and the newest model. Any miss is fatal.
pub fn prepare_evaluation(config: &EvalArgs) -> Result<EvalPlan> {
    info!("Searching for dataset...");
    let dataset_root = match find_dataset(&config.data_dir) {
        Lookup::Found(root) => root,
        Lookup::NotFound { searched } => bail!(
            "Could not find dataset (missing data.yaml) under {}",
            searched.display()
        ),
    };

    let class_names = load_class_names(&data_yaml_path(&dataset_root))?;
    success!("Classes: {:?}", class_names);

    let test_images = dataset_root.join("test").join("images");
    if !test_images.is_dir() {
        bail!("Test image folder not found: {}", test_images.display());
    }

    let model_path = match find_latest_model(&config.runs_dir) {
        Lookup::Found(path) => path,
        Lookup::NotFound { searched } => bail!(
            "Could not find any trained model in {}",
            searched.display()
        ),
    };

    Ok(EvalPlan {
        test_labels: dataset_root.join("test").join("labels"),
        results_dir: config.data_dir.join("results"),
        dataset_root,
        class_names,
        test_images,
        model_path,
    })
}

/// Run the detector over the test images and score the results
pub fn run_evaluation(
    plan: &EvalPlan,
    detector: &mut dyn Detector,
    config: &EvalArgs,
) -> Result<EvalReport> {
    ensure_directory(&plan.results_dir)?;

    let options = PredictOptions {
        conf: config.conf,
        device: config.device.clone(),
        save_txt: true,
        ..PredictOptions::new(&plan.results_dir, PREDICTIONS_RUN_NAME)
    };

    info!("Running inference on test set...");
    let predictions = detector.predict(&plan.test_images, &options)?;
    score_predictions(&predictions, &plan.test_labels)
}

/// Score predictions against the label files in `labels_dir`.
///
/// Images without a label file are counted as `unlabelled` and nowhere else.
pub fn score_predictions(predictions: &[ImagePrediction], labels_dir: &Path) -> Result<EvalReport> {
    let mut report = EvalReport::default();

    for prediction in predictions {
        let label_path = label_path_for(&prediction.source, labels_dir);
        if !label_path.exists() {
            report.unlabelled += 1;
            continue;
        }

        report.total += 1;
        let ground_truth = read_class_ids(&label_path)?;
        let predicted = prediction.class_ids();

        if predicted.intersection(&ground_truth).next().is_some() {
            report.correct += 1;
        } else {
            report.wrong += 1;
        }
    }

    Ok(report)
}

impl EvalReport {
    pub fn print_summary(&self, predictions_dir: &Path) {
        info!("-----------------------------------------------------------");
        success!("Total images tested: {}", self.total);
        success!("Correct detections:  {}", self.correct);
        success!("Wrong detections:    {}", self.wrong);
        match self.accuracy() {
            Some(accuracy) => success!("Accuracy:            {:.2}%", accuracy),
            None => warn!("Accuracy:            n/a (no labelled test images)"),
        }
        if self.unlabelled > 0 {
            info!("Skipped {} images without a label file", self.unlabelled);
        }
        info!("-----------------------------------------------------------");
        info!("Saved result images in: {}", predictions_dir.display());
    }
}
