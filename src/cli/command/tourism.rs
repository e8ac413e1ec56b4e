use std::path::PathBuf;

use anyhow::Result;
use tracing::{instrument, warn};

use super::{read_input, Settings, Tables};
use crate::{
    reading::RawGrid,
    report::Report,
    sources::tourism::{Dataset, INPUT_DIR},
};

/// Reshapes each Stats NZ export that is present; missing exports are skipped.
#[instrument(skip_all)]
pub fn tourism(settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut report = Report::new("Stats NZ");
    let dir = settings.data_dir.join(INPUT_DIR);

    let mut tables = Tables::default();
    for dataset in Dataset::ALL {
        let path = dir.join(dataset.file_name());
        if !path.is_file() {
            warn!(path = %path.display(), "file not found");
            continue;
        }

        let grid = RawGrid::from_csv_bytes(&read_input(&path)?);
        tables.add(dataset.code(), dataset.table(&grid, &mut report));
    }

    tables.finish(settings, report)
}
