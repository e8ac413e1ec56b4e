use std::path::PathBuf;

use anyhow::{bail, Result};
use tempfile::TempDir;
use tracing::{info, instrument, warn};

use super::{find_inputs, read_input, Settings, Tables};
use crate::{
    download::extract_zip,
    output::Audit,
    report::Report,
    sources::climate::{parse_archive_name, ClimateKind, ClimateTables, DATA_SOURCE},
};

/// Unpacks every station archive and combines the statistics across stations.
#[instrument(skip_all)]
pub fn climate(settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut report = Report::new(DATA_SOURCE);
    let mut archives = Vec::new();
    for kind in ClimateKind::ALL {
        archives.extend(find_inputs(&settings.data_dir, kind.archive_pattern())?);
    }
    if archives.is_empty() {
        bail!("no NIWA climate archives in {}", settings.data_dir.display());
    }
    info!(archives = archives.len(), "found climate archives");

    let mut climate = ClimateTables::new();
    for archive in &archives {
        let Some((station_id, kind)) = parse_archive_name(archive) else {
            warn!(path = %archive.display(), "unrecognised archive name");
            continue;
        };
        info!(station_id = %station_id, ?kind, "processing station");

        let tmp_dir = TempDir::new()?;
        for member in extract_zip(archive, tmp_dir.path())? {
            if !member.extension().is_some_and(|e| e == "csv") {
                continue;
            }
            let file_name = member
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = read_input(&member)?;
            climate.add_member(&station_id, kind, &file_name, &bytes, &mut report);
        }
    }

    let audit = Audit::new(DATA_SOURCE, report.loaded_at);
    let mut tables = Tables::default();
    tables.extend(climate.tables(&audit));

    tables.finish(settings, report)
}
