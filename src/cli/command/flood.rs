use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::instrument;

use super::{find_inputs, read_input, Settings, Tables};
use crate::{
    output::Audit,
    report::Report,
    sources::flood::{
        boundaries_table, zones_table, BOUNDARIES_PATTERN, DATA_SOURCE, SOURCE_URL, ZONES_PATTERN,
    },
};

/// Reshapes the first zone CSV and boundary GeoJSON found.
#[instrument(skip_all)]
pub fn flood(settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut report = Report::new(DATA_SOURCE);
    let zones = find_inputs(&settings.data_dir, ZONES_PATTERN)?;
    let boundaries = find_inputs(&settings.data_dir, BOUNDARIES_PATTERN)?;
    let (Some(zones), Some(boundaries)) = (zones.first(), boundaries.first()) else {
        bail!("no Waipa flood data files in {}", settings.data_dir.display());
    };

    let mut tables = Tables::default();
    let audit = Audit::new(DATA_SOURCE, report.loaded_at);
    tables.add(
        "flood zones",
        zones_table(&read_input(zones)?, &audit.clone().url(SOURCE_URL), &mut report),
    );
    tables.add(
        "flood boundaries",
        boundaries_table(&read_input(boundaries)?, &audit, &mut report),
    );

    tables.finish(settings, report)
}
