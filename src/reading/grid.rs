//! Raw table loader: sheets and CSV exports as an untyped grid.
//!
//! No header assumptions are made here. Row and column indices are absolute, so a
//! layout descriptor can address "row 7, column 1" exactly as it appears in the
//! source file.

use std::{borrow::Cow, path::Path};

use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::NaiveDateTime;
use encoding_rs::WINDOWS_1252;
use tracing::{debug, warn};

use crate::error::EtlError;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    pub fn text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// The cell rendered as text; integral numbers print without a fraction.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Cow::Owned(format!("{}", *n as i64))
            }
            Cell::Number(n) => Cow::Owned(n.to_string()),
            Cell::DateTime(dt) => Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(_) => data
                .as_datetime()
                .map(Cell::DateTime)
                .unwrap_or(Cell::Empty),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        RawGrid { rows }
    }

    /// Builds a grid from string rows; convenient for fixtures.
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        RawGrid {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| Cell::text(s.as_ref())).collect())
                .collect(),
        }
    }

    /// Parses a CSV export with no header handling and ragged rows allowed.
    pub fn from_csv_bytes(bytes: &[u8]) -> Self {
        let text = decode_text(bytes);
        Self::from_csv_str(&text)
    }

    pub fn from_csv_str(text: &str) -> Self {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            match record {
                Ok(record) => rows.push(record.iter().map(Cell::text).collect()),
                Err(e) => warn!(line = idx + 1, "skipping unreadable CSV record: {}", e),
            }
        }

        RawGrid { rows }
    }

    /// Loads one named sheet of an xlsx/xls workbook.
    pub fn from_workbook(path: &Path, sheet: &str) -> Result<Self, EtlError> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| EtlError::Workbook(e.to_string()))?;

        let names = workbook.sheet_names();
        if !names.iter().any(|n| n == sheet) {
            return Err(EtlError::SheetNotFound {
                sheet: sheet.to_string(),
                available: names.join(", "),
            });
        }

        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| EtlError::Workbook(e.to_string()))?;

        // calamine trims leading empty rows/columns; pad them back so indices match the sheet.
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; col_offset];
            cells.extend(row.iter().map(Cell::from));
            rows.push(cells);
        }
        debug!(sheet, rows = rows.len(), "loaded sheet");

        Ok(RawGrid { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> &[Cell] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// The cell at (row, col), or an empty cell when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Decodes bytes as UTF-8 (dropping a BOM), falling back to Windows-1252.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            warn!("input is not valid UTF-8, decoding as windows-1252");
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

/// Repairs the UTF-8-read-as-Latin-1 artifacts found in LINZ headers.
pub fn clean_mojibake(s: &str) -> String {
    s.replace("ï»¿", "")
        .replace('\u{feff}', "")
        .replace("Ã‚Â°", "°")
        .replace("Â°", "°")
}

// -- Tests -------------------------------------------------------------------
