//! Best-effort bulk download of a shared Google Drive folder.

use anyhow::{bail, Result};
use log::{info, warn};
use reqwest::blocking::Client;
use std::ffi::OsStr;
use std::path::Path;

use crate::http::{build_client, download_to_file};
use crate::success;
use crate::types::{BatchReport, ItemOutcome};
use crate::utils::{create_progress_bar, ensure_directory};

/// A file listed in a remote folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub title: String,
}

pub trait FolderSource {
    fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteFile>>;
    fn download(&self, file: &RemoteFile, dest: &Path) -> Result<()>;
}

/// Extract the folder id from a `.../folders/<id>?...` share link
pub fn folder_id_from_url(url: &str) -> Result<String> {
    let Some((_, rest)) = url.split_once("folders/") else {
        bail!("Invalid Google Drive folder URL: {}", url);
    };
    let id = rest.split(['?', '/', '#']).next().unwrap_or_default();
    if id.is_empty() {
        bail!("Invalid Google Drive folder URL: {}", url);
    }
    Ok(id.to_string())
}

/// Download at most `limit` files of the folder into `output_dir`.
///
/// Listing failures are returned; each failed file download is recorded as skipped
/// and the remaining files are still attempted.
pub fn download_first_n(
    source: &dyn FolderSource,
    folder_url: &str,
    output_dir: &Path,
    limit: usize,
) -> Result<BatchReport> {
    info!("Listing Google Drive folder: {}", folder_url);
    let folder_id = folder_id_from_url(folder_url)?;
    let files = source.list_folder(&folder_id)?;

    let mut report = BatchReport::new();
    if files.is_empty() {
        warn!("Could not parse folder contents.");
        return Ok(report);
    }

    ensure_directory(output_dir)?;
    info!("Found {} files, downloading first {}", files.len(), limit);
    let files = &files[..files.len().min(limit)];

    let pb = create_progress_bar(files.len() as u64, "Download");
    for file in files {
        let Some(local_name) = local_file_name(&file.title) else {
            warn!("Skipping file with unusable name: {:?}", file.title);
            report.push(ItemOutcome::Skipped {
                item: file.title.clone().into(),
                reason: "file name is empty or a path component".to_string(),
            });
            pb.inc(1);
            continue;
        };
        let output_path = output_dir.join(local_name);
        let outcome = match source.download(file, &output_path) {
            Ok(()) => ItemOutcome::Done {
                item: file.title.clone().into(),
                output: output_path,
            },
            Err(e) => {
                warn!("Error downloading file {}: {:#}", file.title, e);
                ItemOutcome::Skipped {
                    item: file.title.clone().into(),
                    reason: format!("{:#}", e),
                }
            }
        };
        report.push(outcome);
        pb.inc(1);
    }
    pb.finish_and_clear();

    success!("Download complete (limited).");
    Ok(report)
}

/// Last component of a remote title, so a download always lands directly in the output folder
pub fn local_file_name(title: &str) -> Option<&OsStr> {
    Path::new(title).file_name()
}

/// Public Google Drive folders, listed through the embedded folder view
pub struct GoogleDriveFolder {
    client: Client,
}

impl GoogleDriveFolder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
        })
    }
}

impl FolderSource for GoogleDriveFolder {
    fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        let url = format!(
            "https://drive.google.com/embeddedfolderview?id={}",
            folder_id
        );
        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            bail!("Folder listing failed with status: {}", response.status());
        }
        Ok(parse_folder_listing(&response.text()?))
    }

    fn download(&self, file: &RemoteFile, dest: &Path) -> Result<()> {
        let url = format!(
            "https://drive.usercontent.google.com/download?id={}&export=download&confirm=t",
            file.id
        );
        info!("Downloading {}", file.title);
        download_to_file(&self.client, &url, dest)?;
        Ok(())
    }
}

/// Parse file entries out of an embedded folder view page, in page order.
///
/// Sub-folders are ignored.
pub fn parse_folder_listing(html: &str) -> Vec<RemoteFile> {
    html.split("id=\"entry-")
        .skip(1)
        .filter(|chunk| chunk.contains("/file/d/"))
        .filter_map(|chunk| {
            let id = chunk.split('"').next()?.to_string();
            let title = chunk
                .split_once("class=\"flip-entry-title\">")?
                .1
                .split('<')
                .next()?;
            (!id.is_empty() && !title.is_empty()).then(|| RemoteFile {
                id,
                title: unescape_html(title.trim()),
            })
        })
        .collect()
}

fn unescape_html(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_id_from_url() {
        assert_eq!(
            folder_id_from_url("https://drive.google.com/drive/folders/15XOsqiTSNlE4Dho9ZuhIPKQOom7R3j4N")
                .unwrap(),
            "15XOsqiTSNlE4Dho9ZuhIPKQOom7R3j4N"
        );
        assert_eq!(
            folder_id_from_url("https://drive.google.com/drive/folders/abc123?usp=sharing").unwrap(),
            "abc123"
        );
        assert!(folder_id_from_url("https://drive.google.com/file/d/abc123/view").is_err());
        assert!(folder_id_from_url("https://drive.google.com/drive/folders/").is_err());
    }

    #[test]
    fn test_parse_folder_listing() {
        let html = r#"
            <div class="flip-entries">
            <div class="flip-entry" id="entry-1AAA" tabindex="0" role="link">
              <div class="flip-entry-info"><a href="https://drive.google.com/file/d/1AAA/view?usp=drive_web">
              <div class="flip-entry-title">hive_01.mp4</div></a></div></div>
            <div class="flip-entry" id="entry-1FOLDER" tabindex="0" role="link">
              <div class="flip-entry-info"><a href="https://drive.google.com/drive/folders/1FOLDER">
              <div class="flip-entry-title">old</div></a></div></div>
            <div class="flip-entry" id="entry-1BBB" tabindex="0" role="link">
              <div class="flip-entry-info"><a href="https://drive.google.com/file/d/1BBB/view?usp=drive_web">
              <div class="flip-entry-title">bees &amp; mites.mp4</div></a></div></div>
            </div>"#;

        let files = parse_folder_listing(html);
        assert_eq!(
            files,
            vec![
                RemoteFile {
                    id: "1AAA".to_string(),
                    title: "hive_01.mp4".to_string()
                },
                RemoteFile {
                    id: "1BBB".to_string(),
                    title: "bees & mites.mp4".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_local_file_name_strips_directories() {
        assert_eq!(local_file_name("hive_01.mp4"), Some(OsStr::new("hive_01.mp4")));
        assert_eq!(local_file_name("../escaped.mp4"), Some(OsStr::new("escaped.mp4")));
        assert_eq!(local_file_name("/tmp/abs.mp4"), Some(OsStr::new("abs.mp4")));
        assert_eq!(local_file_name(".."), None);
        assert_eq!(local_file_name(""), None);
    }
}
