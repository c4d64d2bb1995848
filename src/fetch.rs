//! Dataset export download from the Roboflow annotation service.

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::config::FetchArgs;
use crate::http::{build_client, download_to_file};
use crate::success;
use crate::utils::ensure_directory;

pub const ROBOFLOW_API_URL: &str = "https://api.roboflow.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: String,
    /// Version numbers in the order the service lists them
    pub versions: Vec<u32>,
}

/// Annotation-hosting service: authenticate, resolve workspace/project/version, download
pub trait AnnotationService {
    fn authenticate(&self) -> Result<()>;
    fn workspace(&self, workspace: &str) -> Result<WorkspaceInfo>;
    fn project(&self, workspace: &str, project: &str) -> Result<ProjectInfo>;
    /// Download an export and unpack it under `dest_dir`, returning the dataset directory
    fn download_version(
        &self,
        workspace: &str,
        project: &str,
        version: u32,
        format: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf>;
}

/// Pick the requested version, or the last one the service lists
pub fn resolve_version(requested: Option<u32>, versions: &[u32]) -> Result<u32> {
    match requested {
        Some(version) => Ok(version),
        None => versions
            .last()
            .copied()
            .ok_or_else(|| anyhow!("No dataset versions found.")),
    }
}

/// Authenticate, resolve workspace/project/version and download the export into `output_dir`
pub fn fetch_dataset(config: &FetchArgs, service: &dyn AnnotationService) -> Result<PathBuf> {
    info!("Authenticating with Roboflow...");
    service.authenticate().context("Authentication failed")?;

    let workspace = service
        .workspace(&config.workspace)
        .with_context(|| format!("Could not connect to workspace '{}'", config.workspace))?;
    success!("Connected to workspace: {}", workspace.name);

    let project = service
        .project(&config.workspace, &config.project)
        .with_context(|| {
            format!(
                "Could not find project '{}' in workspace '{}'",
                config.project, config.workspace
            )
        })?;
    success!("Found project: {}", project.name);

    let version = resolve_version(config.version, &project.versions)?;
    if config.version.is_none() {
        info!("Using latest version: {}", version);
    }

    let output_dir = ensure_directory(&config.output_dir)?;
    info!("Downloading dataset (format={})...", config.format);
    let dataset_dir = service
        .download_version(
            &config.workspace,
            &config.project,
            version,
            &config.format,
            &output_dir,
        )
        .context("Download failed")?;

    success!("Dataset successfully downloaded to: {}", dataset_dir.display());
    Ok(dataset_dir)
}

#[derive(Debug, Deserialize)]
struct WorkspaceResponse {
    workspace: WorkspaceBody,
}

#[derive(Debug, Deserialize)]
struct WorkspaceBody {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    project: ProjectBody,
    #[serde(default)]
    versions: Vec<VersionBody>,
}

#[derive(Debug, Deserialize)]
struct ProjectBody {
    name: String,
}

#[derive(Debug, Deserialize)]
struct VersionBody {
    /// `<workspace>/<project>/<number>`
    id: String,
}

#[derive(Debug, Deserialize)]
struct ExportResponse {
    export: ExportBody,
}

#[derive(Debug, Deserialize)]
struct ExportBody {
    link: String,
}

/// Version number from a `<workspace>/<project>/<number>` id
pub fn version_from_id(id: &str) -> Option<u32> {
    id.rsplit('/').next()?.parse().ok()
}

/// Roboflow REST API client authenticated with an API key
pub struct RoboflowClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl RoboflowClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            api_key: api_key.into(),
            base_url: ROBOFLOW_API_URL.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .map_err(|e| anyhow!("Failed to send HTTP request: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Roboflow request '{}' failed with status: {}", path, status);
        }
        response
            .json::<T>()
            .with_context(|| format!("Unexpected Roboflow response for '{}'", path))
    }
}

impl AnnotationService for RoboflowClient {
    fn authenticate(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url("/"))
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .map_err(|e| anyhow!("Failed to send HTTP request: {}", e))?;
        if !response.status().is_success() {
            bail!("API key rejected with status: {}", response.status());
        }
        Ok(())
    }

    fn workspace(&self, workspace: &str) -> Result<WorkspaceInfo> {
        let response: WorkspaceResponse = self.get_json(workspace)?;
        Ok(WorkspaceInfo {
            name: response.workspace.name,
        })
    }

    fn project(&self, workspace: &str, project: &str) -> Result<ProjectInfo> {
        let response: ProjectResponse = self.get_json(&format!("{}/{}", workspace, project))?;
        Ok(ProjectInfo {
            name: response.project.name,
            versions: response
                .versions
                .iter()
                .filter_map(|v| version_from_id(&v.id))
                .collect(),
        })
    }

    fn download_version(
        &self,
        workspace: &str,
        project: &str,
        version: u32,
        format: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let export: ExportResponse =
            self.get_json(&format!("{}/{}/{}/{}", workspace, project, version, format))?;

        let dataset_dir = dest_dir.join(format!("{}-{}", project, version));
        let archive_path = dest_dir.join(format!("{}-{}.zip", project, version));

        download_to_file(&self.client, &export.export.link, &archive_path)?;
        extract_archive(&archive_path, &dataset_dir)?;
        fs::remove_file(&archive_path)
            .with_context(|| format!("Failed to remove {}", archive_path.display()))?;

        Ok(dataset_dir)
    }
}

/// Unpack a zip archive into `dest`
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Invalid zip archive {}", archive_path.display()))?;
    ensure_directory(dest)?;
    archive
        .extract(dest)
        .with_context(|| format!("Failed to extract into {}", dest.display()))?;
    Ok(())
}
