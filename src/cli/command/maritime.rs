use std::path::PathBuf;

use anyhow::Result;
use tracing::instrument;

use super::{read_input, Settings, Tables};
use crate::{
    output::Audit,
    report::Report,
    sources::maritime::{incidents_table, DATA_SOURCE, INPUT_FILE, SOURCE_URL},
};

#[instrument(skip_all)]
pub fn maritime(settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut report = Report::new(DATA_SOURCE);
    let audit = Audit::new(DATA_SOURCE, report.loaded_at).url(SOURCE_URL);
    let bytes = read_input(&settings.input(INPUT_FILE))?;

    let mut tables = Tables::default();
    tables.add(INPUT_FILE, incidents_table(&bytes, &audit, &mut report));

    tables.finish(settings, report)
}
