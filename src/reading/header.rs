//! Header locator.

use super::{
    coerce::{parse_date, YearAnchor},
    grid::{Cell, RawGrid},
};

/// How a layout finds its header row.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderFinder {
    /// The header is always at this row.
    Fixed(usize),
    /// Scan for a marker keyword in the first cell, then for a date in the second.
    Locate { markers: Vec<String> },
}

/// What to do when [`HeaderFinder::Locate`] finds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFallback {
    Abort,
    UseRow(usize),
}

impl HeaderFinder {
    pub fn locate(markers: &[&str]) -> Self {
        HeaderFinder::Locate {
            markers: markers.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn find(&self, grid: &RawGrid) -> Option<usize> {
        match self {
            HeaderFinder::Fixed(row) => (*row < grid.len()).then_some(*row),
            HeaderFinder::Locate { markers } => locate_header(grid, markers),
        }
    }
}

/// Returns the first row whose first cell contains a marker (case-insensitive).
/// Only when no row has a marker does it fall back to the first row whose second
/// cell holds a date. First match wins in both passes.
pub fn locate_header<S: AsRef<str>>(grid: &RawGrid, markers: &[S]) -> Option<usize> {
    let markers: Vec<String> = markers.iter().map(|m| m.as_ref().to_lowercase()).collect();

    let by_marker = grid.rows().position(|row| {
        let first = row.first().map(|c| c.as_str().to_lowercase()).unwrap_or_default();
        !first.is_empty() && markers.iter().any(|m| first.contains(m.as_str()))
    });

    by_marker.or_else(|| grid.rows().position(|row| row.get(1).is_some_and(is_date_cell)))
}

fn is_date_cell(cell: &Cell) -> bool {
    match cell {
        Cell::DateTime(_) => true,
        // A bare year is a valid date for data rows but too weak a signal for a header.
        Cell::Text(s) => {
            !s.chars().all(|c| c.is_ascii_digit()) && parse_date(s, YearAnchor::JAN_1).is_some()
        }
        _ => false,
    }
}

// -- Tests -------------------------------------------------------------------
