use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// Supported image formats
pub const IMG_FORMATS: &[&str] = &[
    "bmp", "dng", "jpeg", "jpg", "mpo", "png", "tif", "tiff", "webp", "pfm",
];

// Video containers accepted as pipeline input
pub const VIDEO_FORMATS: &[&str] = &["mp4", "mov", "avi", "mkv"];

// Containers the detector may write its annotated video as
pub const DETECTOR_VIDEO_FORMATS: &[&str] = &["mp4", "avi"];

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<String>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<String> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().map(|ext| ext.to_lowercase()).collect())
}

/// Returns true when the file extension is a recognized image format (case-insensitive)
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| get_image_extensions_set().contains(&ext.to_lowercase()))
}

/// Result of a convention-based lookup on disk.
///
/// Callers must handle `NotFound` explicitly; there is no sentinel path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(PathBuf),
    NotFound { searched: PathBuf },
}

impl Lookup {
    pub fn found(&self) -> Option<&Path> {
        match self {
            Lookup::Found(path) => Some(path),
            Lookup::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

// Per-item result inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Done { item: PathBuf, output: PathBuf },
    Skipped { item: PathBuf, reason: String },
}

impl ItemOutcome {
    pub fn item(&self) -> &Path {
        match self {
            ItemOutcome::Done { item, .. } | ItemOutcome::Skipped { item, .. } => item,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ItemOutcome::Done { .. })
    }
}

/// Aggregated outcomes of a best-effort batch (downloads, video annotation).
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn done(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_done()).count()
    }

    pub fn skipped(&self) -> usize {
        self.len() - self.done()
    }

    pub fn print_summary(&self, label: &str) {
        log::info!("=== {} Summary ===", label);
        log::info!("Total items: {}", self.len());
        log::info!("Completed: {}", self.done());
        log::info!("Skipped: {}", self.skipped());

        for outcome in &self.outcomes {
            if let ItemOutcome::Skipped { item, reason } = outcome {
                log::warn!("Skipped {}: {}", item.display(), reason);
            }
        }
    }
}

// Number of images that ended up in each split
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SplitReport {
    pub train: usize,
    pub valid: usize,
    pub test: usize,
}

impl SplitReport {
    pub fn total(&self) -> usize {
        self.train + self.valid + self.test
    }
}

/// Counts produced by scoring detector output against ground truth.
///
/// `unlabelled` images had no label file and are excluded from every other counter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvalReport {
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
    pub unlabelled: usize,
}

impl EvalReport {
    /// Percentage of scored images with at least one matching class, `None` when nothing was scored.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct as f64 / self.total as f64 * 100.0)
        }
    }
}

/// A single box reported by the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: i64,
    pub confidence: Option<f32>,
    /// Normalized center x, center y, width, height
    pub bbox: [f32; 4],
}

/// Detector output for one source image
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePrediction {
    pub source: PathBuf,
    pub detections: Vec<Detection>,
}

impl ImagePrediction {
    pub fn new(source: impl Into<PathBuf>, detections: Vec<Detection>) -> Self {
        Self {
            source: source.into(),
            detections,
        }
    }

    pub fn class_ids(&self) -> BTreeSet<i64> {
        self.detections.iter().map(|d| d.class_id).collect()
    }
}
