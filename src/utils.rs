use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Create a directory (and parents) if it is missing, keeping existing contents
pub fn ensure_directory(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Case-insensitive extension check against a list of lowercase extensions
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext.to_lowercase().as_str()))
}

/// Regular files directly inside `dir` accepted by `filter`, sorted by file name.
///
/// A missing directory yields an empty list.
pub fn list_files<F>(dir: &Path, filter: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to list directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && filter(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Move a file, falling back to copy + remove when a rename crosses filesystems
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        // rename fails across mount points; a missing source still reports the rename error
        Err(_) if from.is_file() => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// File stem as an owned string, empty when the path has none
pub fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_has_extension_ignores_case() {
        assert!(has_extension(Path::new("clip.MP4"), &["mp4", "avi"]));
        assert!(has_extension(Path::new("clip.avi"), &["mp4", "avi"]));
        assert!(!has_extension(Path::new("clip.mkv"), &["mp4", "avi"]));
        assert!(!has_extension(Path::new("noext"), &["mp4"]));
    }

    #[test]
    fn test_list_files_sorted_and_filtered() {
        let temp_dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.jpg"] {
            File::create(temp_dir.path().join(name)).unwrap();
        }
        fs::create_dir(temp_dir.path().join("d.txt")).unwrap();

        let files = list_files(temp_dir.path(), |p| has_extension(p, &["txt"])).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_list_files_missing_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let files = list_files(&temp_dir.path().join("absent"), |_| true).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_move_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let from = temp_dir.path().join("from.txt");
        let to = temp_dir.path().join("to.txt");
        fs::write(&from, "0 0.5 0.5 0.1 0.1\n").unwrap();

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "0 0.5 0.5 0.1 0.1\n");
    }
}
