use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::{info, instrument};

use super::{read_input, Settings, Tables};
use crate::{
    output::Audit,
    reading::RawGrid,
    report::Report,
    sources::electricity::{
        annual_fuel_table, quarterly_fuel_table, quarterly_generation_table, zone_table,
        DATA_SOURCE, FUEL_SHEET, QUARTERLY_SHEET, WORKBOOK, ZONE_FILE,
    },
};

#[instrument(skip_all)]
pub fn electricity(settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut report = Report::new(DATA_SOURCE);
    let audit = Audit::new(DATA_SOURCE, report.loaded_at);
    let workbook = settings.input(WORKBOOK);
    if !workbook.is_file() {
        bail!("workbook not found: {}", workbook.display());
    }

    let mut tables = Tables::default();
    match RawGrid::from_workbook(&workbook, FUEL_SHEET) {
        Ok(grid) => {
            tables.add("annual fuel mix", annual_fuel_table(&grid, &audit, &mut report));
            tables.add("quarterly fuel mix", quarterly_fuel_table(&grid, &audit, &mut report));
        }
        Err(e) => tables.add(FUEL_SHEET, Err(e)),
    }
    let quarterly = RawGrid::from_workbook(&workbook, QUARTERLY_SHEET)
        .and_then(|grid| quarterly_generation_table(&grid, &audit, &mut report));
    tables.add("quarterly generation", quarterly);

    let zone_path = settings.input(ZONE_FILE);
    if zone_path.is_file() {
        match read_input(&zone_path) {
            Ok(bytes) => tables.add("zone data", zone_table(&bytes, &audit, &mut report)),
            Err(e) => tables.fail("zone data", e),
        }
    } else {
        info!(path = %zone_path.display(), "no zone data");
    }

    tables.finish(settings, report)
}
