use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const LABEL_EXTENSION: &str = "txt";

/// Label file paired with an image: same stem, `.txt`, inside `labels_dir`
pub fn label_path_for(image: &Path, labels_dir: &Path) -> PathBuf {
    let mut name = image.file_stem().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(LABEL_EXTENSION);
    labels_dir.join(name)
}

/// Parse the class id in the first column of a label row.
///
/// Returns `None` for blank rows. Float ids are truncated, so `1.0` reads as `1`.
pub fn parse_class_id(line: &str) -> Option<Result<i64, String>> {
    let token = line.split_whitespace().next()?;
    let parsed = token
        .parse::<i64>()
        .or_else(|_| token.parse::<f64>().map(|v| v as i64))
        .map_err(|_| format!("invalid class id '{}'", token));
    Some(parsed)
}

/// Ground-truth class ids listed in a YOLO label file
pub fn read_class_ids(label_file: &Path) -> Result<BTreeSet<i64>> {
    let content = fs::read_to_string(label_file)
        .with_context(|| format!("Failed to read label file {}", label_file.display()))?;

    let mut class_ids = BTreeSet::new();
    for (line_idx, line) in content.lines().enumerate() {
        match parse_class_id(line) {
            None => continue,
            Some(Ok(class_id)) => {
                class_ids.insert(class_id);
            }
            Some(Err(message)) => bail!(
                "{}:{}: {}",
                label_file.display(),
                line_idx + 1,
                message
            ),
        }
    }

    Ok(class_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_path_for() {
        let path = label_path_for(Path::new("/data/test/images/frame_01.jpg"), Path::new("/data/test/labels"));
        assert_eq!(path, PathBuf::from("/data/test/labels/frame_01.txt"));

        // export names carry dots inside the stem
        let path = label_path_for(Path::new("img_jpg.rf.3f9a.jpg"), Path::new("labels"));
        assert_eq!(path, PathBuf::from("labels/img_jpg.rf.3f9a.txt"));
    }

    #[test]
    fn test_parse_class_id() {
        assert_eq!(parse_class_id("1 0.5 0.5 0.2 0.2"), Some(Ok(1)));
        assert_eq!(parse_class_id("2.0 0.5 0.5 0.2 0.2"), Some(Ok(2)));
        assert_eq!(parse_class_id("   "), None);
        assert!(matches!(parse_class_id("bee 0.5"), Some(Err(_))));
    }

    #[test]
    fn test_read_class_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let label = temp_dir.path().join("a.txt");
        fs::write(&label, "0 0.1 0.1 0.2 0.2\n\n2 0.3 0.3 0.1 0.1\n0 0.7 0.7 0.1 0.1\n").unwrap();

        let ids = read_class_ids(&label).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_read_class_ids_empty_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let label = temp_dir.path().join("empty.txt");
        fs::write(&label, "").unwrap();

        assert!(read_class_ids(&label).unwrap().is_empty());
    }

    #[test]
    fn test_read_class_ids_reports_line() {
        let temp_dir = tempfile::tempdir().unwrap();
        let label = temp_dir.path().join("bad.txt");
        fs::write(&label, "0 0.1 0.1 0.2 0.2\nx 0.1\n").unwrap();

        let err = read_class_ids(&label).unwrap_err().to_string();
        assert!(err.contains("bad.txt:2"), "unexpected error: {}", err);
    }
}
