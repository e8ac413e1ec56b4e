//! Insurance Council of New Zealand natural disaster costs.

use chrono::Datelike;
use serde::Deserialize;
use tracing::info;

use crate::{
    error::EtlError,
    output::{Audit, OutputTable, Value},
    reading::{
        coerce::{clean_numeric, parse_datetime},
        grid::decode_text,
    },
    report::Report,
    reshape::classify::contains_any,
};

pub const DATA_SOURCE: &str = "Insurance Council of New Zealand (ICNZ)";
pub const SOURCE_URL: &str = "https://www.icnz.org.nz/industry/cost-of-natural-disasters/";
pub const INPUT_FILE: &str = "Cost Of Natural Disasters Table (NZ).csv";

const WATER_WORDS: &[&str] = &["flood", "storm", "rain", "cyclone", "water"];

#[derive(Debug, Deserialize)]
struct CostRow {
    #[serde(rename = "Date")]
    date: Option<String>,
    #[serde(rename = "Event")]
    event: Option<String>,
    #[serde(rename = "Categories", default)]
    categories: Option<String>,
    #[serde(rename = "Cost ($m)")]
    cost: Option<String>,
    #[serde(rename = "Inflation adjusted cost ($m)", default)]
    adjusted_cost: Option<String>,
    #[serde(rename = "More Info", default)]
    more_info: Option<String>,
}

/// Builds `icnz_disaster_costs`. Rows without a parseable date or a cost are
/// dropped.
pub fn costs_table(bytes: &[u8], audit: &Audit, report: &mut Report) -> Result<OutputTable, EtlError> {
    let text = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|_| EtlError::EmptyInput(INPUT_FILE.to_string()))?;
    for column in ["Date", "Event", "Cost ($m)"] {
        if !headers.iter().any(|h| h == column) {
            return Err(EtlError::MissingColumn {
                column: column.to_string(),
                source_tag: INPUT_FILE.to_string(),
            });
        }
    }

    let mut table = OutputTable::new(
        "icnz_disaster_costs",
        &[
            "date_original",
            "event_date",
            "event_year",
            "event",
            "categories",
            "primary_category",
            "cost_millions_nzd",
            "inflation_adjusted_cost_millions_nzd",
            "is_water_related",
            "more_info_available",
        ],
    );
    let mut water_related = 0;
    let mut water_cost = 0.0;

    for result in reader.deserialize::<CostRow>() {
        report.rows_read += 1;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                report.drop_record("unreadable row", e);
                continue;
            }
        };

        let raw_date = row.date.as_deref().unwrap_or_default();
        let Some(date) = parse_datetime(raw_date).map(|dt| dt.date()) else {
            report.drop_record("unparseable date", raw_date);
            continue;
        };
        let Some(cost) = row.cost.as_deref().and_then(clean_numeric) else {
            report.drop_silently("missing cost");
            continue;
        };

        let event = row.event.as_deref().unwrap_or_default();
        let categories = row.categories.as_deref().unwrap_or_default();
        let primary = categories.split(',').next().map(str::trim).unwrap_or_default();
        let adjusted = row.adjusted_cost.as_deref().and_then(clean_numeric);
        let is_water = contains_any(&event.to_lowercase(), WATER_WORDS)
            || contains_any(&categories.to_lowercase(), WATER_WORDS);
        let more_info = row.more_info.as_deref().is_some_and(|s| s.contains("btn"));

        if is_water {
            water_related += 1;
            water_cost += adjusted.unwrap_or(0.0);
        }

        table.push(vec![
            Value::from(raw_date),
            Value::from(date),
            Value::from(date.year()),
            Value::from(Some(event).filter(|e| !e.is_empty())),
            Value::from(Some(categories).filter(|c| !c.is_empty())),
            Value::from(Some(primary).filter(|p| !p.is_empty())),
            Value::from(cost),
            Value::from(adjusted),
            Value::from(is_water),
            Value::from(more_info),
        ]);
    }
    report.records_emitted += table.len();

    let years = table
        .rows
        .iter()
        .filter_map(|r| r[2].as_f64())
        .fold(None, |acc: Option<(f64, f64)>, y| {
            Some(acc.map_or((y, y), |(lo, hi)| (lo.min(y), hi.max(y))))
        });
    if let Some((first, last)) = years {
        info!(events = table.len(), first, last, "processed disaster costs");
    }
    info!(
        events = water_related,
        cost_millions_nzd = format!("{:.1}", water_cost),
        "water-related disasters"
    );

    Ok(table.with_audit(audit))
}

// -- Tests -------------------------------------------------------------------
