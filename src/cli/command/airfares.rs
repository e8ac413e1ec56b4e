use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tempfile::TempDir;
use tracing::{info, instrument};

use super::{read_input, Settings, Tables};
use crate::{
    cli::create_spinner,
    download::extract_zip,
    output::Audit,
    report::Report,
    sources::airfares::{airfares_table, DATA_SOURCE, INPUT_ZIP},
};

/// Extracts the archive to a temporary directory and reshapes its first CSV.
#[instrument(skip_all)]
pub fn airfares(settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut report = Report::new(DATA_SOURCE);
    let tmp_dir = TempDir::new()?;

    let bar = create_spinner("Unpacking airfares archive...".to_string());
    let files = extract_zip(&settings.input(INPUT_ZIP), tmp_dir.path())?;
    bar.finish_and_clear();
    info!(files = ?files, "files in archive");

    let csv = files
        .iter()
        .find(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")))
        .ok_or_else(|| anyhow!("no CSV file in {}", INPUT_ZIP))?;

    let audit = Audit::new(DATA_SOURCE, report.loaded_at);
    let mut tables = Tables::default();
    tables.add(INPUT_ZIP, airfares_table(&read_input(csv)?, &audit, &mut report));

    tables.finish(settings, report)
}
