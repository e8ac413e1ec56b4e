use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use tracing::instrument;

use super::{find_inputs, read_input, Settings, Tables};
use crate::{
    download::{download_all, http_client},
    output::Audit,
    report::Report,
    sources::tides::{
        downloads, parse_tide_file, ports_table, predictions_table, statistics_table, DATA_SOURCE,
        FILE_SUFFIX,
    },
};

/// Downloads every port and year into the data directory.
#[instrument(skip_all)]
pub async fn fetch_tides(settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut report = Report::new(DATA_SOURCE);
    fs::create_dir_all(&settings.data_dir)
        .with_context(|| format!("failed to create {}", settings.data_dir.display()))?;

    let client = http_client()?;
    let written = download_all(&client, &downloads(&settings.data_dir), &mut report).await;
    report.summarise();

    if written.is_empty() {
        bail!("no tide files could be downloaded");
    }

    Ok(written)
}

#[instrument(skip_all)]
pub fn tides(settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut report = Report::new(DATA_SOURCE);
    let files = find_inputs(&settings.data_dir, &format!("*{}", FILE_SUFFIX))?;
    if files.is_empty() {
        bail!("no tide prediction files in {}", settings.data_dir.display());
    }

    let mut ports = Vec::new();
    let mut events = Vec::new();
    for path in &files {
        let bytes = read_input(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (port, port_events) = parse_tide_file(&bytes, &file_name, &mut report);
        ports.push(port);
        events.extend(port_events);
    }

    let audit = Audit::new(DATA_SOURCE, report.loaded_at);
    let mut tables = Tables::default();
    tables.extend([
        predictions_table(&ports, &events, &audit),
        statistics_table(&events, &audit),
        ports_table(&ports, &audit),
    ]);

    tables.finish(settings, report)
}
