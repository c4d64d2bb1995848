use anyhow::{Context, Result};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use crate::config::SplitArgs;
use crate::labels::label_path_for;
use crate::types::{is_image_file, SplitReport};
use crate::utils::{create_progress_bar, ensure_directory, list_files, move_file};

pub const SPLIT_NAMES: [&str; 3] = ["train", "valid", "test"];

/// Image and label directories of one split
#[derive(Debug, Clone)]
pub struct SplitDirs {
    pub images: PathBuf,
    pub labels: PathBuf,
}

impl SplitDirs {
    pub fn new(root: &Path, split: &str) -> Self {
        Self {
            images: root.join(split).join("images"),
            labels: root.join(split).join("labels"),
        }
    }
}

/// Sizes of the train, valid and test groups for `n` images.
///
/// Train and valid are floored; whatever is left over goes to test.
pub fn split_counts(n: usize, train_ratio: f64, val_ratio: f64) -> (usize, usize, usize) {
    let n_train = ((n as f64 * train_ratio).floor() as usize).min(n);
    let n_val = ((n as f64 * val_ratio).floor() as usize).min(n - n_train);
    (n_train, n_val, n - n_train - n_val)
}

/// Split `train/images` (and matching labels) into train, valid and test in place.
///
/// Files are moved, not copied: running it twice splits the already reduced train set.
pub fn split_dataset(config: &SplitArgs) -> Result<SplitReport> {
    let root = &config.root;
    let ratio_sum = config.train_ratio + config.val_ratio + config.test_ratio;
    if (ratio_sum - 1.0).abs() > 1e-6 {
        warn!(
            "Split ratios sum to {:.3}, not 1.0; the test split takes the remainder",
            ratio_sum
        );
    }

    let [train, valid, test] = SPLIT_NAMES.map(|split| SplitDirs::new(root, split));

    for dirs in [&train, &valid, &test] {
        ensure_directory(&dirs.images)?;
        ensure_directory(&dirs.labels)?;
    }

    let mut images = list_files(&train.images, is_image_file)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    images.shuffle(&mut rng);

    let (n_train, n_val, n_test) = split_counts(images.len(), config.train_ratio, config.val_ratio);
    info!(
        "Splitting {} images: {} train, {} valid, {} test",
        images.len(),
        n_train,
        n_val,
        n_test
    );

    let val_images = &images[n_train..n_train + n_val];
    let test_images = &images[n_train + n_val..];

    move_pairs(val_images, &train.labels, &valid, "Valid")?;
    move_pairs(test_images, &train.labels, &test, "Test")?;

    Ok(SplitReport {
        train: n_train,
        valid: n_val,
        test: n_test,
    })
}

/// Move images into `dest.images` along with their same-stem labels when present
fn move_pairs(images: &[PathBuf], source_labels: &Path, dest: &SplitDirs, label: &str) -> Result<()> {
    if images.is_empty() {
        return Ok(());
    }

    let pb = create_progress_bar(images.len() as u64, label);
    for image in images {
        let Some(file_name) = image.file_name() else {
            continue;
        };
        move_file(image, &dest.images.join(file_name))
            .with_context(|| format!("Failed to move image {}", image.display()))?;

        let label_path = label_path_for(image, source_labels);
        if label_path.exists() {
            let label_name = label_path.file_name().unwrap_or_default();
            move_file(&label_path, &dest.labels.join(label_name))
                .with_context(|| format!("Failed to move label {}", label_path.display()))?;
        }
        pb.inc(1);
    }
    pb.finish_with_message(format!("{} split complete", label));

    Ok(())
}
