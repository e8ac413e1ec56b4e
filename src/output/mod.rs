//! Handles serialising output tables to disk as CSV or _parquet_.

pub mod csv;
pub mod parquet;
pub mod table;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{info, warn};

pub use table::{Audit, OutputTable, Value};

use crate::report::Report;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Writes `table` to `<dir>/<name>.<ext>`, replacing any earlier file.
///
/// An empty table is not written; `None` is returned instead.
pub fn write_table(
    table: &OutputTable,
    dir: &Path,
    format: OutputFormat,
    report: &mut Report,
) -> Result<Option<PathBuf>> {
    if table.is_empty() {
        warn!(table = %table.name, "no data to save");
        return Ok(None);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format!("{}.{}", table.name, format.extension()));

    match format {
        OutputFormat::Csv => csv::write_csv(table, &path)?,
        OutputFormat::Parquet => parquet::write_parquet(table, &path)?,
    }

    info!(rows = table.len(), path = %path.display(), "saved {}", table.name);
    report.wrote(path.to_string_lossy());

    Ok(Some(path))
}

// -- Tests -------------------------------------------------------------------
