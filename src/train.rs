use anyhow::{bail, Result};
use log::info;
use std::path::PathBuf;

use crate::config::TrainArgs;
use crate::detector::{TrainRequest, Trainer};
use crate::locate::{data_yaml_path, find_dataset};
use crate::success;
use crate::types::Lookup;

/// Build the trainer request for a located dataset root
pub fn train_request(config: &TrainArgs, dataset_root: &std::path::Path) -> TrainRequest {
    TrainRequest {
        data_yaml: data_yaml_path(dataset_root),
        epochs: config.epochs,
        batch: config.batch_size,
        imgsz: config.imgsz,
        name: config.run_name.clone(),
        device: config.device.clone(),
    }
}

/// Locate the dataset under `dataset_path` and hand it to the trainer.
///
/// Returns the dataset root that was trained on. The first failure is terminal.
pub fn train_model(config: &TrainArgs, trainer: &mut dyn Trainer) -> Result<PathBuf> {
    if !config.dataset_path.exists() {
        bail!("Data directory not found: {}", config.dataset_path.display());
    }

    let dataset_root = match find_dataset(&config.dataset_path) {
        Lookup::Found(root) => root,
        Lookup::NotFound { searched } => bail!(
            "Could not find any dataset with 'data.yaml' inside {}",
            searched.display()
        ),
    };
    success!("Found dataset: {}", dataset_root.display());

    info!("Loading model: {}", config.model_type.weights_file());
    info!(
        "Starting training for {} epochs on dataset: {}",
        config.epochs,
        dataset_root.display()
    );
    trainer.train(&train_request(config, &dataset_root))?;

    success!("Training completed successfully.");
    Ok(dataset_root)
}
