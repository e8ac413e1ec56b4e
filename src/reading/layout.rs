//! Declarative layout descriptors and the generic reshape over them.
//!
//! A [`Layout`] says where the header is, which axis carries periods and which
//! rows or columns are categories. [`reshape`] runs header location, label
//! extraction, record building and coercion for any grid described that way.

use std::ops::RangeInclusive;

use tracing::{error, warn};

use super::{
    coerce::{coerce_number, coerce_period, quarter_from_offset, Period, YearAnchor},
    grid::{Cell, RawGrid},
    header::{HeaderFallback, HeaderFinder},
    labels::extract_labels,
};
use crate::{error::EtlError, report::Report, reshape::records::NormalizedRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum MatchStrategy {
    /// A fixed column (period rows) or row (entity rows).
    Position(usize),
    /// Case-insensitive substring match against the header or row label.
    Keywords(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRule {
    pub name: String,
    pub strategy: MatchStrategy,
}

impl MatchRule {
    pub fn position(name: &str, index: usize) -> Self {
        MatchRule {
            name: name.to_string(),
            strategy: MatchStrategy::Position(index),
        }
    }

    pub fn keywords(name: &str, keywords: &[&str]) -> Self {
        MatchRule {
            name: name.to_string(),
            strategy: MatchStrategy::Keywords(keywords.iter().map(|k| k.to_lowercase()).collect()),
        }
    }

    fn matches_text(&self, text: &str) -> bool {
        match &self.strategy {
            MatchStrategy::Keywords(keywords) => {
                let text = text.to_lowercase();
                keywords.iter().any(|k| text.contains(k.as_str()))
            }
            MatchStrategy::Position(_) => false,
        }
    }
}

/// The first rule that claims `index` by position or `text` by keyword.
pub fn match_rule<'a>(rules: &'a [MatchRule], index: usize, text: &str) -> Option<&'a MatchRule> {
    rules.iter().find(|rule| match rule.strategy {
        MatchStrategy::Position(p) => p == index,
        MatchStrategy::Keywords(_) => !text.is_empty() && rule.matches_text(text),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum CategorySource {
    /// Columns picked by rule; every record belongs to the layout's entity.
    Rules(Vec<MatchRule>),
    /// Header row holds entities (carried forward), the row below holds categories.
    TwoRowLabels,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// One row per period; the period sits in `period_column`.
    PeriodRows {
        period_column: usize,
        categories: CategorySource,
    },
    /// One row per category; periods run across the header row right of `label_column`.
    EntityRows {
        label_column: usize,
        rules: Vec<MatchRule>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodRule {
    Parse { anchor: YearAnchor },
    /// Dates are used when the period cell holds one; otherwise the n-th period
    /// is quarter n counted from Q1 of `epoch_year`.
    QuarterIndex { epoch_year: i32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub source_tag: String,
    pub entity_id: String,
    pub header: HeaderFinder,
    pub fallback: HeaderFallback,
    pub shape: Shape,
    pub period: PeriodRule,
    pub valid_years: RangeInclusive<i32>,
    /// Emit records whose value is blank or unparseable with `value = None`.
    pub keep_nulls: bool,
}

impl Layout {
    pub fn new(source_tag: &str, header: HeaderFinder, shape: Shape) -> Self {
        Layout {
            source_tag: source_tag.to_string(),
            entity_id: source_tag.to_string(),
            header,
            fallback: HeaderFallback::Abort,
            shape,
            period: PeriodRule::Parse {
                anchor: YearAnchor::JAN_1,
            },
            valid_years: 1800..=2100,
            keep_nulls: false,
        }
    }

    pub fn entity(mut self, entity_id: &str) -> Self {
        self.entity_id = entity_id.to_string();
        self
    }

    pub fn fallback(mut self, fallback: HeaderFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn period(mut self, period: PeriodRule) -> Self {
        self.period = period;
        self
    }

    pub fn valid_years(mut self, years: RangeInclusive<i32>) -> Self {
        self.valid_years = years;
        self
    }

    pub fn keep_nulls(mut self) -> Self {
        self.keep_nulls = true;
        self
    }

    fn resolve_period(&self, cell: &Cell, offset: usize) -> Option<Period> {
        match self.period {
            PeriodRule::Parse { anchor } => coerce_period(cell, anchor),
            PeriodRule::QuarterIndex { epoch_year } => coerce_period(cell, YearAnchor::JAN_1)
                .filter(|p| !matches!(p, Period::Year { .. }))
                .or_else(|| Some(quarter_from_offset(epoch_year, offset))),
        }
    }
}

/// One data cell with its resolved coordinates.
struct Slot<'g> {
    entity: String,
    category: String,
    period: Period,
    cell: &'g Cell,
}

/// Runs header location, label extraction, record building and coercion.
///
/// Structural problems (no data, no header under [`HeaderFallback::Abort`]) are
/// errors. Unparseable periods and values are counted on `report` and skipped.
pub fn reshape(
    grid: &RawGrid,
    layout: &Layout,
    report: &mut Report,
) -> Result<Vec<NormalizedRecord>, EtlError> {
    if grid.is_empty() {
        return Err(EtlError::EmptyInput(layout.source_tag.clone()));
    }

    let header_row = match layout.header.find(grid) {
        Some(row) => row,
        None => match layout.fallback {
            HeaderFallback::UseRow(row) => {
                warn!(source = %layout.source_tag, row, "header not found, using fallback row");
                row
            }
            HeaderFallback::Abort => {
                error!(source = %layout.source_tag, "header not found");
                return Err(EtlError::HeaderNotFound {
                    source_tag: layout.source_tag.clone(),
                });
            }
        },
    };

    let slots = match &layout.shape {
        Shape::PeriodRows {
            period_column,
            categories,
        } => period_rows(grid, layout, header_row, *period_column, categories, report),
        Shape::EntityRows { label_column, rules } => {
            entity_rows(grid, layout, header_row, *label_column, rules, report)
        }
    };

    let mut records = Vec::with_capacity(slots.len());
    for slot in slots {
        let value = coerce_number(slot.cell);
        if value.is_none() && !layout.keep_nulls {
            if slot.cell.is_blank() {
                report.drop_silently("blank value");
            } else {
                report.drop_record("unparseable value", slot.cell.as_str());
            }
            continue;
        }
        records.push(NormalizedRecord {
            entity_id: slot.entity,
            period: slot.period.date(),
            period_kind: slot.period.kind(),
            category: slot.category,
            value,
            source_tag: layout.source_tag.clone(),
            load_timestamp: report.loaded_at,
        });
    }
    report.records_emitted += records.len();

    Ok(records)
}

/// Resolves a period and applies the year range, counting failures.
fn checked_period(
    layout: &Layout,
    cell: &Cell,
    offset: usize,
    report: &mut Report,
) -> Option<Period> {
    let Some(period) = layout.resolve_period(cell, offset).filter(|p| p.date().is_some()) else {
        if cell.is_blank() {
            report.drop_silently("blank period");
        } else {
            report.drop_record("unparseable period", cell.as_str());
        }
        return None;
    };

    if !layout.valid_years.contains(&period.year()) {
        report.drop_record("year out of range", period.year());
        return None;
    }

    Some(period)
}

fn period_rows<'g>(
    grid: &'g RawGrid,
    layout: &Layout,
    header_row: usize,
    period_column: usize,
    categories: &CategorySource,
    report: &mut Report,
) -> Vec<Slot<'g>> {
    // (column, entity, category)
    let (columns, data_start): (Vec<(usize, String, String)>, usize) = match categories {
        CategorySource::Rules(rules) => {
            let header = grid.row(header_row);
            let width = grid.width();
            let mut columns = Vec::new();
            for column in 0..width {
                if column == period_column {
                    continue;
                }
                let text = header.get(column).map(|c| c.as_str()).unwrap_or_default();
                if let Some(rule) = match_rule(rules, column, &text) {
                    columns.push((column, layout.entity_id.clone(), rule.name.clone()));
                }
            }
            (columns, header_row + 1)
        }
        CategorySource::TwoRowLabels => {
            let labels = extract_labels(grid.row(header_row), grid.row(header_row + 1));
            let columns = labels
                .into_iter()
                .filter(|l| l.column_index != period_column)
                .map(|l| (l.column_index, l.primary, l.secondary))
                .collect();
            (columns, header_row + 2)
        }
    };

    let mut slots = Vec::new();
    for row in data_start..grid.len() {
        if grid.row(row).iter().all(Cell::is_blank) {
            continue;
        }
        report.rows_read += 1;

        let Some(period) = checked_period(layout, grid.get(row, period_column), row - data_start, report)
        else {
            continue;
        };

        for (column, entity, category) in &columns {
            slots.push(Slot {
                entity: entity.clone(),
                category: category.clone(),
                period,
                cell: grid.get(row, *column),
            });
        }
    }

    slots
}

fn entity_rows<'g>(
    grid: &'g RawGrid,
    layout: &Layout,
    header_row: usize,
    label_column: usize,
    rules: &[MatchRule],
    report: &mut Report,
) -> Vec<Slot<'g>> {
    // Blank header cells are not periods; the quarter index counts only the others.
    let mut periods = Vec::new();
    let header = grid.row(header_row);
    for (column, cell) in header.iter().enumerate().skip(label_column + 1) {
        if cell.is_blank() {
            continue;
        }
        let offset = periods.len();
        if let Some(period) = checked_period(layout, cell, offset, report) {
            periods.push((column, period));
        }
    }

    let mut slots = Vec::new();
    for row in header_row + 1..grid.len() {
        let label = grid.get(row, label_column).as_str();
        let Some(rule) = match_rule(rules, row, &label) else {
            continue;
        };
        report.rows_read += 1;

        for (column, period) in &periods {
            slots.push(Slot {
                entity: layout.entity_id.clone(),
                category: rule.name.clone(),
                period: *period,
                cell: grid.get(row, *column),
            });
        }
    }

    slots
}

// -- Tests -------------------------------------------------------------------
