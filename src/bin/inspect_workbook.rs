//! Workbook Inspection Utility
//!
//! Prints the sheets of a spreadsheet and the first rows of each with their
//! absolute row and column indices, to help pick header rows and value columns
//! for a layout:
//! - Sheet names and dimensions
//! - Leading rows, cell by cell
//! - Rows that look like headers (mostly text, at least three cells)

use std::path::PathBuf;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use clap::Parser;

#[derive(Parser)]
#[command(about = "Show the layout of a spreadsheet workbook")]
struct Args {
    /// Workbook to inspect (.xlsx, .xls, .ods)
    path: PathBuf,

    /// Only show this sheet
    #[arg(long)]
    sheet: Option<String>,

    /// Rows to print per sheet
    #[arg(long, default_value_t = 15)]
    rows: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut workbook = open_workbook_auto(&args.path)
        .with_context(|| format!("failed to open {}", args.path.display()))?;

    let sheets = workbook.sheet_names();
    println!("📒 {} ({} sheets)", args.path.display(), sheets.len());
    for (i, name) in sheets.iter().enumerate() {
        println!("  {}: {}", i, name);
    }

    for name in sheets {
        if args.sheet.as_ref().is_some_and(|s| *s != name) {
            continue;
        }
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("failed to read sheet `{}`", name))?;

        let (height, width) = range.get_size();
        println!("\n📄 {} ({} rows x {} columns)", name, height, width);
        let offset = range.start().map_or(0, |(row, _)| row as usize);

        for (i, row) in range.rows().take(args.rows).enumerate() {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .filter(|(_, cell)| !matches!(cell, Data::Empty))
                .map(|(col, cell)| format!("[{}] {}", col, describe(cell)))
                .collect();
            let marker = if looks_like_header(row) { " <- header?" } else { "" };
            println!("  row {:>3}: {}{}", offset + i, cells.join(" | "), marker);
        }
    }

    Ok(())
}

fn describe(cell: &Data) -> String {
    match cell {
        Data::String(s) => format!("{:?}", s.trim()),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::DateTime(_) => cell
            .as_datetime()
            .map_or_else(|| "date(?)".to_string(), |dt| format!("date({})", dt)),
        other => other.to_string(),
    }
}

fn looks_like_header(row: &[Data]) -> bool {
    let filled = row.iter().filter(|c| !matches!(c, Data::Empty)).count();
    let text = row.iter().filter(|c| matches!(c, Data::String(_))).count();
    filled >= 3 && text * 2 > filled
}
