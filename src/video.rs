//! Video annotation pipeline: resize, detect, collect, stitch.

use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::VideoArgs;
use crate::detector::{Detector, PredictOptions};
use crate::drive::{download_first_n, FolderSource};
use crate::success;
use crate::types::{BatchReport, ItemOutcome, Lookup, DETECTOR_VIDEO_FORMATS, VIDEO_FORMATS};
use crate::utils::{ensure_directory, file_stem_string, has_extension, list_files, move_file};

pub const RESIZED_PREFIX: &str = "RESIZED_";
pub const DETECTED_PREFIX: &str = "DETECTED_";

/// Video read/resize/write facility
pub trait VideoTools {
    fn resize(&self, input: &Path, output: &Path, width: u32, height: u32) -> Result<()>;
    /// Re-encode `input` into the container implied by `output`'s extension
    fn transcode(&self, input: &Path, output: &Path) -> Result<()>;
    /// Join `inputs` in the given order into a single file
    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;
}

/// `VideoTools` backed by the ffmpeg executable
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    bin: PathBuf,
}

impl Ffmpeg {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.bin);
        command.args(["-y", "-loglevel", "error"]);
        command
    }

    fn execute(&self, mut command: Command) -> Result<()> {
        let status = command
            .status()
            .with_context(|| format!("Failed to launch {}", self.bin.display()))?;
        if !status.success() {
            bail!("{} exited with {}", self.bin.display(), status);
        }
        Ok(())
    }
}

impl VideoTools for Ffmpeg {
    fn resize(&self, input: &Path, output: &Path, width: u32, height: u32) -> Result<()> {
        let mut command = self.command();
        command
            .arg("-i")
            .arg(input)
            .arg("-vf")
            .arg(format!("scale={}:{}", width, height))
            .arg("-an")
            .arg(output);
        self.execute(command)
    }

    fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        let mut command = self.command();
        command
            .arg("-i")
            .arg(input)
            .args(["-c:v", "libx264"])
            .arg(output);
        self.execute(command)
    }

    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        let list_path = output.with_extension("concat.txt");
        let mut listing = String::new();
        for input in inputs {
            let absolute = fs::canonicalize(input)
                .with_context(|| format!("Failed to resolve {}", input.display()))?;
            // concat demuxer quoting: close quote, escaped quote, reopen
            let quoted = absolute.to_string_lossy().replace('\'', r"'\''");
            listing.push_str(&format!("file '{}'\n", quoted));
        }
        fs::write(&list_path, listing)
            .with_context(|| format!("Failed to write {}", list_path.display()))?;

        let mut command = self.command();
        command
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .args(["-c:v", "libx264"])
            .arg(output);
        let result = self.execute(command);
        let _ = fs::remove_file(&list_path);
        result
    }
}

/// Source videos in `input_dir`, sorted by name, excluding our own resized copies
pub fn list_input_videos(input_dir: &Path) -> Result<Vec<PathBuf>> {
    list_files(input_dir, |path| {
        let resized = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(RESIZED_PREFIX));
        !resized && has_extension(path, VIDEO_FORMATS)
    })
}

/// Find the annotated video the detector wrote into `dir`
pub fn locate_detector_video(dir: &Path) -> Result<Lookup> {
    let not_found = || Lookup::NotFound {
        searched: dir.to_path_buf(),
    };
    if !dir.is_dir() {
        return Ok(not_found());
    }
    let videos = list_files(dir, |path| has_extension(path, DETECTOR_VIDEO_FORMATS))?;
    Ok(videos
        .into_iter()
        .next()
        .map(Lookup::Found)
        .unwrap_or_else(not_found))
}

/// Resize one video, run detection and put the annotated result in `output_dir`.
///
/// Never fails: every problem is reported as a skipped item.
pub fn annotate_video(
    input: &Path,
    config: &VideoArgs,
    detector: &mut dyn Detector,
    tools: &dyn VideoTools,
) -> ItemOutcome {
    match try_annotate_video(input, config, detector, tools) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Failed to process {}: {:#}", input.display(), e);
            ItemOutcome::Skipped {
                item: input.to_path_buf(),
                reason: format!("{:#}", e),
            }
        }
    }
}

fn try_annotate_video(
    input: &Path,
    config: &VideoArgs,
    detector: &mut dyn Detector,
    tools: &dyn VideoTools,
) -> Result<ItemOutcome> {
    let file_name = input
        .file_name()
        .with_context(|| format!("Not a file path: {}", input.display()))?
        .to_string_lossy()
        .into_owned();
    let resized = config
        .input_dir
        .join(format!("{}{}", RESIZED_PREFIX, file_name));
    let output = config.output_dir.join(format!(
        "{}{}.{}",
        DETECTED_PREFIX,
        file_stem_string(input),
        config.output_ext
    ));

    info!("Resizing: {}", file_name);
    tools
        .resize(input, &resized, config.resize_width, config.resize_height)
        .context("resize failed")?;

    info!("Running detection on: {}", resized.display());
    let options = PredictOptions {
        conf: config.conf,
        imgsz: config.imgsz,
        device: Some(config.device.clone()),
        ..PredictOptions::new(&config.results_dir, file_stem_string(&resized))
    };
    detector.predict(&resized, &options).context("detection failed")?;

    let detector_dir = options.output_dir();
    if !detector_dir.is_dir() {
        warn!("Detector output directory missing: {}", detector_dir.display());
        return Ok(ItemOutcome::Skipped {
            item: input.to_path_buf(),
            reason: format!("detector output directory missing: {}", detector_dir.display()),
        });
    }

    let produced = match locate_detector_video(&detector_dir)? {
        Lookup::Found(path) => path,
        Lookup::NotFound { searched } => {
            let contents: Vec<String> = fs::read_dir(&searched)
                .map(|entries| {
                    entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.file_name().to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default();
            warn!("Detector did not save a video; output dir contents: {:?}", contents);
            return Ok(ItemOutcome::Skipped {
                item: input.to_path_buf(),
                reason: format!("detector did not save a video in {}", searched.display()),
            });
        }
    };

    if has_extension(&produced, &[config.output_ext.to_lowercase().as_str()]) {
        move_file(&produced, &output)
            .with_context(|| format!("Failed to move {}", produced.display()))?;
        success!("Saved annotated video: {}", output.display());
    } else {
        info!("Converting {} to {}...", produced.display(), config.output_ext);
        tools
            .transcode(&produced, &output)
            .context("transcode failed")?;
        success!("Converted and saved: {}", output.display());
    }

    Ok(ItemOutcome::Done {
        item: input.to_path_buf(),
        output,
    })
}

/// Annotate every video in `input_dir`, one at a time
pub fn annotate_videos(
    config: &VideoArgs,
    detector: &mut dyn Detector,
    tools: &dyn VideoTools,
) -> Result<BatchReport> {
    ensure_directory(&config.output_dir)?;

    let mut report = BatchReport::new();
    for input in list_input_videos(&config.input_dir)? {
        report.push(annotate_video(&input, config, detector, tools));
    }
    Ok(report)
}

/// Concatenate the annotated videos in `output_dir` in file-name order.
///
/// Returns `None` when there is nothing to combine.
pub fn combine_videos(
    output_dir: &Path,
    combined: &Path,
    output_ext: &str,
    tools: &dyn VideoTools,
) -> Result<Option<PathBuf>> {
    info!("Combining videos...");
    let ext = output_ext.to_lowercase();
    let clips: Vec<PathBuf> = list_files(output_dir, |path| has_extension(path, &[ext.as_str()]))?
        .into_iter()
        .filter(|path| path.as_path() != combined)
        .collect();

    if clips.is_empty() {
        warn!("No videos to combine.");
        return Ok(None);
    }

    tools.concatenate(&clips, combined)?;
    success!("Combined video saved as {}", combined.display());
    Ok(Some(combined.to_path_buf()))
}

/// Outcome of a full video pipeline run
#[derive(Debug, Default)]
pub struct VideoRunReport {
    /// `None` when the download step was skipped or failed as a whole
    pub downloads: Option<BatchReport>,
    pub annotations: BatchReport,
    pub combined: Option<PathBuf>,
}

/// Download (best-effort), annotate every local video, then stitch the results
pub fn run_video_pipeline(
    config: &VideoArgs,
    drive: &dyn FolderSource,
    detector: &mut dyn Detector,
    tools: &dyn VideoTools,
) -> Result<VideoRunReport> {
    let downloads = if config.skip_download {
        None
    } else {
        match download_first_n(drive, &config.folder_url, &config.input_dir, config.download_limit) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Error downloading videos: {:#}", e);
                None
            }
        }
    };

    let annotations = annotate_videos(config, detector, tools)?;
    let combined = combine_videos(
        &config.output_dir,
        &config.combined_output,
        &config.output_ext,
        tools,
    )?;

    Ok(VideoRunReport {
        downloads,
        annotations,
        combined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_list_input_videos_skips_resized_and_non_video() {
        let temp_dir = tempfile::tempdir().unwrap();
        for name in ["b.MOV", "a.mp4", "RESIZED_a.mp4", "notes.txt", "c.mkv"] {
            File::create(temp_dir.path().join(name)).unwrap();
        }

        let videos = list_input_videos(temp_dir.path()).unwrap();
        let names: Vec<_> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.MOV", "c.mkv"]);
    }

    #[test]
    fn test_locate_detector_video() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(!locate_detector_video(&temp_dir.path().join("missing"))
            .unwrap()
            .is_found());

        File::create(temp_dir.path().join("labels.txt")).unwrap();
        assert!(!locate_detector_video(temp_dir.path()).unwrap().is_found());

        File::create(temp_dir.path().join("RESIZED_clip.avi")).unwrap();
        assert_eq!(
            locate_detector_video(temp_dir.path()).unwrap(),
            Lookup::Found(temp_dir.path().join("RESIZED_clip.avi"))
        );
    }
}
