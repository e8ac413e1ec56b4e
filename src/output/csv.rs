//! Save an output table as a flat CSV file.

use std::path::Path;

use anyhow::{Context, Result};

use super::table::OutputTable;

/// Writes header plus rows, replacing any existing file at `path`.
pub fn write_csv(table: &OutputTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|v| v.render()))?;
    }
    writer.flush()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
