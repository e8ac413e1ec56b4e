pub mod airfares;
pub mod all;
pub mod climate;
pub mod disasters;
pub mod electricity;
pub mod events;
pub mod flood;
pub mod maritime;
pub mod tides;
pub mod tourism;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use tracing::{error, warn};

pub use airfares::airfares;
pub use all::all;
pub use climate::climate;
pub use disasters::disasters;
pub use electricity::electricity;
pub use events::events;
pub use flood::flood;
pub use maritime::maritime;
pub use tides::{fetch_tides, tides};
pub use tourism::tourism;

use crate::{
    error::EtlError,
    output::{write_table, OutputFormat, OutputTable},
    report::Report,
};

/// Where commands read from and write to.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

impl Settings {
    pub fn input(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Writes every table, skipping empty ones, and returns the written paths.
    pub fn save(&self, tables: &[OutputTable], report: &mut Report) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for table in tables {
            if let Some(path) = write_table(table, &self.output_dir, self.format, report)? {
                written.push(path);
            }
        }

        Ok(written)
    }
}

/// Tables built by one command. A table that fails structurally is logged and
/// the rest are still written; the command then fails.
#[derive(Debug, Default)]
pub struct Tables {
    built: Vec<OutputTable>,
    failed: Vec<String>,
}

impl Tables {
    pub fn add(&mut self, what: &str, result: Result<OutputTable, EtlError>) {
        match result {
            Ok(table) => self.built.push(table),
            Err(e) => {
                error!("{} failed: {}", what, e);
                self.failed.push(what.to_string());
            }
        }
    }

    /// Records a table that could not be built for a reason outside the reshape,
    /// such as an unreadable input file.
    pub fn fail(&mut self, what: &str, error: anyhow::Error) {
        error!("{} failed: {:#}", what, error);
        self.failed.push(what.to_string());
    }

    pub fn extend(&mut self, tables: impl IntoIterator<Item = OutputTable>) {
        self.built.extend(tables);
    }

    pub fn finish(self, settings: &Settings, mut report: Report) -> Result<Vec<PathBuf>> {
        let written = settings.save(&self.built, &mut report)?;
        report.summarise();

        if !self.failed.is_empty() {
            bail!("{} could not be processed: {}", report.source, self.failed.join(", "));
        }

        Ok(written)
    }
}

pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Files in `dir` matching `pattern`, sorted.
pub fn find_inputs(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = dir.join(pattern);
    let pattern = pattern.to_string_lossy();
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("bad input pattern {}", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("skipping unreadable path: {}", e);
                None
            }
        })
        .collect();
    paths.sort();

    Ok(paths)
}

// -- Tests -------------------------------------------------------------------
