//! Downloads source files and extracts zip archives.

use std::{
    fs::{self, File},
    io::{copy, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{header, Client};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::{cli::create_progress_bar, report::Report};

/// Flat per-request timeout; a timeout fails that item only.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause after each successful download.
pub const REQUEST_DELAY: Duration = Duration::from_millis(500);
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; NZ-Hackathon-Data-Processor/1.0)";

pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")
}

/// GETs `url` and returns the body as text. Non-2xx statuses are errors.
pub async fn fetch_text(client: &Client, url: &str, accept: &str) -> Result<String> {
    let response = client
        .get(url)
        .header(header::ACCEPT, accept)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;

    if !response.status().is_success() {
        return Err(anyhow!("{} returned {}", url, response.status()));
    }

    let body = response.text().await?;
    info!(url, bytes = body.len(), "fetched");

    Ok(body)
}

/// Streams `url` into `file_path`, turning `progress_bar` into a byte counter
/// when the server reports a content length.
pub async fn download_with_progress(
    client: &Client,
    url: &str,
    file_path: &Path,
    progress_bar: &ProgressBar,
) -> Result<()> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;

    if !response.status().is_success() {
        return Err(anyhow!("{} returned {}", url, response.status()));
    }

    let total_size = response.content_length().unwrap_or(0);
    if total_size > 0 {
        progress_bar.set_length(total_size);
        progress_bar.set_style(
            ProgressStyle::with_template(
                "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
            )?
            .progress_chars("=> "),
        );
    }

    let mut file = File::create(file_path)
        .with_context(|| format!("failed to create {}", file_path.display()))?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("error reading body of {}", url))?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress_bar.set_position(downloaded);
    }

    Ok(())
}

/// One file to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub url: String,
    pub path: PathBuf,
}

/// Downloads each item in turn. A failed item is logged and counted on `report`;
/// the loop moves on to the next. Returns the paths that were written.
pub async fn download_all(client: &Client, items: &[Download], report: &mut Report) -> Vec<PathBuf> {
    let pb = create_progress_bar(items.len() as u64, "Downloading files...".to_string());
    let mut written = Vec::new();

    for item in items {
        let item_bar = ProgressBar::hidden();
        match download_with_progress(client, &item.url, &item.path, &item_bar).await {
            Ok(()) => {
                debug!(url = %item.url, path = %item.path.display(), "downloaded");
                report.fetch_ok();
                written.push(item.path.clone());
                tokio::time::sleep(REQUEST_DELAY).await;
            }
            Err(e) => {
                report.fetch_failed(&item.url, format!("{:#}", e));
                // Drop any partial file so a later reshape does not pick it up.
                let _ = fs::remove_file(&item.path);
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("Downloads finished");

    written
}

/// Extracts every file of a zip archive into `working_dir`, returning their paths.
/// Entries with unsafe names (absolute, or escaping the directory) are skipped.
pub fn extract_zip(zip_path: &Path, working_dir: &Path) -> Result<Vec<PathBuf>> {
    let file =
        File::open(zip_path).with_context(|| format!("failed to open {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("{} is not a zip archive", zip_path.display()))?;

    let pb = create_progress_bar(archive.len() as u64, "Extracting files...".to_string());
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        pb.inc(1);

        let Some(relative) = entry.enclosed_name() else {
            debug!(name = entry.name(), "skipping unsafe zip entry");
            continue;
        };
        let out_path = working_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        copy(&mut entry, &mut out)?;
        extracted.push(out_path);
    }

    pb.finish_and_clear();
    extracted.sort();

    Ok(extracted)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::TempDir;
    use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

    use super::*;

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let mut buf = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buf));
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
            for (name, content) in files {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        fs::write(path, buf).unwrap();
    }

    #[test]
    fn should_extract_zip_members() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("Auckland_Rain.zip");
        write_zip(
            &zip_path,
            &[
                ("Auckland__monthly__Total_rainfall.csv", "YEAR,PERIOD,STATS_VALUE\n"),
                ("nested/Auckland__annual__Rain_Days.csv", "YEAR,STATS_VALUE\n"),
            ],
        );
        let out = dir.path().join("out");

        let files = extract_zip(&zip_path, &out).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.exists()));
        assert!(out.join("nested/Auckland__annual__Rain_Days.csv").exists());
    }

    #[test]
    fn should_reject_non_zip_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.zip");
        fs::write(&path, "not a zip").unwrap();

        assert!(extract_zip(&path, dir.path()).is_err());
    }

    #[test]
    fn should_convert_spinner_to_progress_bar() {
        use crate::cli::create_spinner;

        let pb = create_spinner("Downloading...".to_string());
        pb.set_length(1000);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
                .unwrap()
                .progress_chars("=> "),
        );
        pb.set_position(500);

        assert_eq!(pb.length(), Some(1000));
        assert_eq!(pb.position(), 500);

        pb.finish_with_message("done");
    }

    #[tokio::test]
    async fn should_count_failed_downloads_and_continue() {
        let dir = TempDir::new().unwrap();
        let client = http_client().unwrap();
        let items = vec![
            Download {
                url: "http://127.0.0.1:9/first.csv".to_string(),
                path: dir.path().join("first.csv"),
            },
            Download {
                url: "not a url".to_string(),
                path: dir.path().join("second.csv"),
            },
        ];
        let mut report = Report::new("test");

        let written = download_all(&client, &items, &mut report).await;

        assert!(written.is_empty());
        assert_eq!(report.fetch_failed, 2);
        assert_eq!(report.fetched, 0);
    }
}
