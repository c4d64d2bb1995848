use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// Blocking client shared by the dataset and video downloaders
pub fn build_client() -> Result<Client> {
    Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(Duration::from_secs(30 * 60))
        .user_agent(concat!("beevision/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Stream `url` into `output_path`, showing a byte progress bar when the size is known
pub fn download_to_file(client: &Client, url: &str, output_path: &Path) -> Result<u64> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| anyhow!("Failed to send HTTP request: {}", e))?;

    let status = response.status();
    log::debug!("HTTP response status: {status}");
    if !status.is_success() {
        return Err(anyhow!("HTTP request failed with status: {}", status));
    }

    let pb = match response.content_length() {
        Some(length) => {
            let pb = ProgressBar::new(length);
            let style = ProgressStyle::default_bar()
                .template(
                    "[{elapsed_precise}] [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})",
                )
                .map_err(|e| anyhow!("Failed to create progress style: {}", e))?
                .progress_chars("#> ");
            pb.set_style(style);
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let mut file = fs::File::create(output_path)
        .with_context(|| format!("Failed to create output file {}", output_path.display()))?;

    let mut downloaded = 0u64;
    let mut buffer = [0; 8192];
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| anyhow!("Failed to read response data: {}", e))?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])
            .with_context(|| format!("Failed to write to file {}", output_path.display()))?;
        downloaded += bytes_read as u64;
        pb.set_position(downloaded);
    }
    pb.finish_and_clear();

    Ok(downloaded)
}
