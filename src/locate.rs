//! Convention-based discovery of datasets and trained models on disk.

use anyhow::{bail, Context, Result};
use glob::glob;
use jwalk::WalkDir;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::types::Lookup;

/// Marker file identifying a dataset root
pub const DATASET_MARKER: &str = "data.yaml";

// How sparse an index -> name mapping may be before it is rejected
const MAX_NAME_INDEX_SPREAD: usize = 8;

/// Find the directory under `data_dir` that directly contains `data.yaml`.
///
/// The shallowest marker wins; ties go to the first one in name order, so the
/// result is stable across runs.
pub fn find_dataset(data_dir: &Path) -> Lookup {
    let not_found = || Lookup::NotFound {
        searched: data_dir.to_path_buf(),
    };

    if !data_dir.is_dir() {
        return not_found();
    }

    WalkDir::new(data_dir)
        .sort(true)
        .skip_hidden(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == DATASET_MARKER)
        .min_by_key(|entry| entry.depth)
        .and_then(|entry| entry.path().parent().map(Path::to_path_buf))
        .map(Lookup::Found)
        .unwrap_or_else(not_found)
}

#[derive(Debug, Deserialize)]
struct DataYaml {
    #[serde(default)]
    names: Option<DataYamlNames>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DataYamlNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

/// Load the ordered class names listed in a `data.yaml` file
pub fn load_class_names(data_yaml: &Path) -> Result<Vec<String>> {
    let data = fs::read_to_string(data_yaml)
        .with_context(|| format!("Failed to read {}", data_yaml.display()))?;
    let parsed: DataYaml = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse {}", data_yaml.display()))?;

    let names = match parsed.names {
        None => Vec::new(),
        Some(DataYamlNames::Sequence(names)) => names,
        Some(DataYamlNames::Mapping(mapping)) => {
            let len = mapping.keys().next_back().map_or(0, |max| max.saturating_add(1));
            if len > mapping.len().saturating_mul(MAX_NAME_INDEX_SPREAD) {
                bail!(
                    "Class index {} in {} is too large for {} names",
                    len - 1,
                    data_yaml.display(),
                    mapping.len()
                );
            }
            let mut names = vec![String::new(); len];
            for (index, name) in mapping {
                names[index] = name;
            }
            for (index, name) in names.iter_mut().enumerate() {
                if name.trim().is_empty() {
                    *name = format!("class_{}", index);
                }
            }
            names
        }
    };

    Ok(names)
}

/// Find the most recently modified `<runs_dir>/*/weights/best.*` artifact
pub fn find_latest_model(runs_dir: &Path) -> Lookup {
    let not_found = || Lookup::NotFound {
        searched: runs_dir.to_path_buf(),
    };

    if !runs_dir.is_dir() {
        log::debug!("Run directory not found: {}", runs_dir.display());
        return not_found();
    }

    let pattern = runs_dir.join("*").join("weights").join("best.*");
    let Ok(entries) = glob(&pattern.to_string_lossy()) else {
        return not_found();
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .filter_map(|path| modified_time(&path).map(|mtime| (mtime, path)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, path)| Lookup::Found(path))
        .unwrap_or_else(not_found)
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Path of the marker file inside a dataset root
pub fn data_yaml_path(dataset_root: &Path) -> PathBuf {
    dataset_root.join(DATASET_MARKER)
}
