//! MBIE electricity statistics workbook and the 5-minute zone export.
//!
//! The fuel sheet is read twice: once as an annual table (years down column 1,
//! fuels across) and once as a quarterly table (fuels down column 0, quarters
//! across). The quarterly generation sheet carries a single net generation row.

use std::ops::RangeInclusive;

use chrono::Datelike;
use tracing::info;

use super::upper_snake;
use crate::{
    error::EtlError,
    output::{Audit, OutputTable, Value},
    reading::{
        coerce::{parse_datetime, parse_measure, quarter_of},
        reshape, CategorySource, Cell, HeaderFallback, HeaderFinder, Layout, MatchRule,
        PeriodRule, RawGrid, Shape,
    },
    report::Report,
    reshape::{
        pivot_first,
        yoy::{year_over_year, QuarterValue},
        GenerationMix, PivotRow,
    },
};

pub const DATA_SOURCE: &str = "MBIE Electricity Statistics";
pub const WORKBOOK: &str = "electricity-2025-q1.xlsx";
pub const FUEL_SHEET: &str = "6 - Fuel type (GWh)";
pub const QUARTERLY_SHEET: &str = "1 - Quarterly GWh";
pub const ZONE_FILE: &str = "Zone Data (01 Jul - 29 Jul) [5 intervals] (1).csv";

pub const FUEL_YEARS: RangeInclusive<i32> = 1974..=2030;
pub const QUARTER_EPOCH: i32 = 1974;

/// Fuel category and its output column, in sheet order.
const FUELS: [(&str, &str); 8] = [
    ("hydro", "HYDRO_GWH"),
    ("geothermal", "GEOTHERMAL_GWH"),
    ("biogas", "BIOGAS_GWH"),
    ("wind", "WIND_GWH"),
    ("solar", "SOLAR_PV_GWH"),
    ("oil", "OIL_GWH"),
    ("coal", "COAL_GWH"),
    ("gas", "GAS_GWH"),
];
const FIRST_FUEL_COLUMN: usize = 3;

const SUBTOTAL: &str = "subtotal";
const COGENERATION: &str = "cogeneration";
const TOTAL: &str = "total";
const NET_GENERATION: &str = "net_generation";

const MIX_COLUMNS: [&str; 4] = [
    "RENEWABLE_GWH",
    "FOSSIL_FUEL_GWH",
    "RENEWABLE_PERCENTAGE",
    "FOSSIL_FUEL_PERCENTAGE",
];

/// Years down column 1 from row 7, fuels in columns 3 to 10, then the
/// electricity-only subtotal, cogeneration and total.
pub fn annual_fuel_layout() -> Layout {
    let mut rules: Vec<MatchRule> = FUELS
        .iter()
        .enumerate()
        .map(|(i, (fuel, _))| MatchRule::position(fuel, FIRST_FUEL_COLUMN + i))
        .collect();
    rules.push(MatchRule::position(SUBTOTAL, 11));
    rules.push(MatchRule::position(COGENERATION, 12));
    rules.push(MatchRule::position(TOTAL, 13));

    Layout::new(
        FUEL_SHEET,
        HeaderFinder::Fixed(6),
        Shape::PeriodRows {
            period_column: 1,
            categories: CategorySource::Rules(rules),
        },
    )
    .valid_years(FUEL_YEARS)
}

pub fn quarterly_fuel_layout() -> Layout {
    // Biogas before gas: the first matching keyword claims the row.
    let rules = ["Hydro", "Geothermal", "Biogas", "Wind", "Solar", "Oil", "Coal", "Gas"]
        .into_iter()
        .map(|label| MatchRule::keywords(&label.to_lowercase(), &[label]))
        .collect();

    Layout::new(
        FUEL_SHEET,
        HeaderFinder::locate(&["quarter"]),
        Shape::EntityRows {
            label_column: 0,
            rules,
        },
    )
    .fallback(HeaderFallback::Abort)
    .valid_years(FUEL_YEARS)
}

pub fn quarterly_generation_layout() -> Layout {
    Layout::new(
        QUARTERLY_SHEET,
        HeaderFinder::locate(&["quarter"]),
        Shape::EntityRows {
            label_column: 0,
            rules: vec![MatchRule::keywords(NET_GENERATION, &["generation"])],
        },
    )
    .fallback(HeaderFallback::UseRow(8))
    .period(PeriodRule::QuarterIndex {
        epoch_year: QUARTER_EPOCH,
    })
}

fn fuel_values(row: &PivotRow) -> Vec<Value> {
    FUELS.iter().map(|(fuel, _)| Value::from(row.get(fuel))).collect()
}

fn mix_values(mix: &GenerationMix) -> [Value; 4] {
    [
        Value::from(mix.renewable_gwh),
        Value::from(mix.fossil_gwh),
        Value::from(mix.renewable_percentage),
        Value::from(mix.fossil_percentage),
    ]
}

fn columns(leading: &[&str], trailing: &[&str]) -> Vec<String> {
    leading
        .iter()
        .chain(FUELS.iter().map(|(_, column)| column))
        .chain(trailing)
        .map(|c| c.to_string())
        .collect()
}

pub fn annual_fuel_table(
    grid: &RawGrid,
    audit: &Audit,
    report: &mut Report,
) -> Result<OutputTable, EtlError> {
    let layout = annual_fuel_layout();
    let pivot = pivot_first(&reshape(grid, &layout, report)?);

    let mut trailing = vec![
        "ELECTRICITY_ONLY_SUBTOTAL_GWH",
        "COGENERATION_GWH",
        "TOTAL_GENERATION_GWH",
    ];
    trailing.extend(MIX_COLUMNS);
    trailing.push("SOURCE_SHEET");
    let mut table = OutputTable::from_columns(
        "electricity_generation_by_fuel",
        columns(&["CALENDAR_YEAR"], &trailing),
    );

    for row in &pivot.rows {
        let Some(period) = row.period else { continue };
        let mix = GenerationMix::from_fuels(|fuel| row.get(fuel));

        let mut values = vec![Value::from(period.year())];
        values.extend(fuel_values(row));
        values.push(Value::from(row.get(SUBTOTAL)));
        values.push(Value::from(row.get(COGENERATION)));
        values.push(Value::from(row.get(TOTAL).unwrap_or(mix.total_gwh())));
        values.extend(mix_values(&mix));
        values.push(Value::from(layout.source_tag.as_str()));
        table.push(values);
    }

    info!(years = table.len(), "annual fuel mix");
    Ok(table.with_audit(audit))
}

pub fn quarterly_fuel_table(
    grid: &RawGrid,
    audit: &Audit,
    report: &mut Report,
) -> Result<OutputTable, EtlError> {
    let layout = quarterly_fuel_layout();
    let pivot = pivot_first(&reshape(grid, &layout, report)?);

    let mut trailing = vec!["TOTAL_GENERATION_GWH"];
    trailing.extend(MIX_COLUMNS);
    trailing.push("SOURCE_SHEET");
    let mut table = OutputTable::from_columns(
        "electricity_generation_by_fuel_quarterly",
        columns(&["QUARTER_DATE", "QUARTER_YEAR", "QUARTER_NUMBER"], &trailing),
    );

    for row in &pivot.rows {
        let Some(date) = row.period else { continue };
        let mix = GenerationMix::from_fuels(|fuel| row.get(fuel));

        let mut values = vec![
            Value::from(date),
            Value::from(date.year()),
            Value::from(quarter_of(date)),
        ];
        values.extend(fuel_values(row));
        values.push(Value::from(mix.total_gwh()));
        values.extend(mix_values(&mix));
        values.push(Value::from(layout.source_tag.as_str()));
        table.push(values);
    }

    info!(quarters = table.len(), "quarterly fuel mix");
    Ok(table.with_audit(audit))
}

/// Net generation per quarter with the change against the same quarter four
/// periods earlier.
pub fn quarterly_generation_table(
    grid: &RawGrid,
    audit: &Audit,
    report: &mut Report,
) -> Result<OutputTable, EtlError> {
    let layout = quarterly_generation_layout();
    let pivot = pivot_first(&reshape(grid, &layout, report)?);

    let mut quarters: Vec<(QuarterValue, &PivotRow)> = pivot
        .rows
        .iter()
        .filter_map(|row| {
            let date = row.period?;
            let value = row.get(NET_GENERATION)?;
            let point = QuarterValue {
                year: date.year(),
                quarter: quarter_of(date),
                value,
            };
            Some((point, row))
        })
        .collect();
    quarters.sort_by_key(|(q, _)| (q.year, q.quarter));

    let series: Vec<QuarterValue> = quarters.iter().map(|(q, _)| *q).collect();
    let changes = year_over_year(&series);

    let mut table = OutputTable::new(
        "electricity_quarterly_generation",
        &[
            "CALENDAR_QUARTER",
            "NET_GENERATION_GWH",
            "QUARTER_YEAR",
            "QUARTER_NUMBER",
            "YEAR_OVER_YEAR_CHANGE_PERCENT",
            "SOURCE_SHEET",
        ],
    );
    for ((point, row), change) in quarters.iter().zip(changes) {
        table.push(vec![
            Value::from(row.period),
            Value::from(point.value),
            Value::from(point.year),
            Value::from(point.quarter),
            Value::from(change),
            Value::from(layout.source_tag.as_str()),
        ]);
    }

    info!(quarters = table.len(), "quarterly net generation");
    Ok(table.with_audit(audit))
}

fn zone_value(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Number(n) => Value::from(*n),
        Cell::DateTime(dt) => Value::from(*dt),
        Cell::Text(s) => parse_measure(s)
            .map(Value::from)
            .unwrap_or_else(|| Value::from(s.as_str())),
    }
}

/// Five-minute zone load export. Column names are upper-snake-cased and the
/// `DATE` column becomes a parsed `TIMESTAMP_NZ`.
pub fn zone_table(bytes: &[u8], audit: &Audit, report: &mut Report) -> Result<OutputTable, EtlError> {
    let grid = RawGrid::from_csv_bytes(bytes);
    if grid.is_empty() {
        return Err(EtlError::EmptyInput(ZONE_FILE.to_string()));
    }

    let mut columns: Vec<String> = grid.row(0).iter().map(|c| upper_snake(&c.as_str())).collect();
    let date_column = columns
        .iter()
        .position(|c| c == "DATE")
        .ok_or_else(|| EtlError::MissingColumn {
            column: "DATE".to_string(),
            source_tag: ZONE_FILE.to_string(),
        })?;
    columns[date_column] = "TIMESTAMP_NZ".to_string();

    let mut table = OutputTable::from_columns("electricity_zone_data_5min", columns);
    for row in grid.rows().skip(1) {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        report.rows_read += 1;

        let raw = row.get(date_column).cloned().unwrap_or(Cell::Empty);
        let timestamp = match &raw {
            Cell::DateTime(dt) => Some(*dt),
            other => parse_datetime(&other.as_str()),
        };
        let Some(timestamp) = timestamp else {
            report.drop_record("unparseable timestamp", raw.as_str());
            continue;
        };

        let mut values: Vec<Value> = row.iter().map(zone_value).collect();
        values[date_column] = Value::from(timestamp);
        table.push(values);
    }
    report.records_emitted += table.len();

    if let (Some(first), Some(last)) = (table.rows.first(), table.rows.last()) {
        info!(
            from = %first[date_column].render(),
            to = %last[date_column].render(),
            "zone data range"
        );
    }

    Ok(table.with_audit(audit))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn audit() -> Audit {
        Audit::new(DATA_SOURCE, NaiveDateTime::default())
    }

    /// Pads `rows` below `offset` blank rows so they start at that grid row.
    fn grid_at(offset: usize, rows: &[&[&str]]) -> RawGrid {
        let mut all: Vec<Vec<&str>> = vec![vec![""]; offset];
        all.extend(rows.iter().map(|r| r.to_vec()));
        RawGrid::from_rows(&all)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn should_read_annual_fuel_columns_by_position() {
        let grid = grid_at(
            7,
            &[
                &["", "1973", "", "1", "1", "1", "1", "1", "1", "1", "1", "8", "0", "8"],
                &["", "2023", "", "100", "50", "5", "20", "10", "1", "2", "12", "180", "20", "200"],
                &["", "2024", "", "0", "", "", "", "", "", "", "", "", "", ""],
                &["", "Notes: provisional", ""],
            ],
        );
        let mut report = Report::new("test");

        let table = annual_fuel_table(&grid, &audit(), &mut report).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "CALENDAR_YEAR"), Some(&Value::Int(2023)));
        assert_eq!(table.value(0, "SOLAR_PV_GWH"), Some(&Value::Float(10.0)));
        assert_eq!(table.value(0, "COGENERATION_GWH"), Some(&Value::Float(20.0)));
        assert_eq!(table.value(0, "TOTAL_GENERATION_GWH"), Some(&Value::Float(200.0)));
        assert_eq!(table.value(0, "RENEWABLE_GWH"), Some(&Value::Float(185.0)));
        assert_eq!(table.value(0, "RENEWABLE_PERCENTAGE"), Some(&Value::Float(92.5)));
        assert_eq!(table.value(0, "FOSSIL_FUEL_PERCENTAGE"), Some(&Value::Float(7.5)));
        assert_eq!(table.value(1, "RENEWABLE_PERCENTAGE"), Some(&Value::Float(0.0)));
        assert_eq!(table.value(1, "FOSSIL_FUEL_PERCENTAGE"), Some(&Value::Float(0.0)));
        assert_eq!(table.value(1, "GAS_GWH"), Some(&Value::Null));
        assert_eq!(
            table.value(1, "SOURCE_SHEET"),
            Some(&Value::from("6 - Fuel type (GWh)"))
        );
        assert_eq!(report.dropped("year out of range"), 1);
        assert_eq!(report.dropped("unparseable period"), 1);
    }

    #[test]
    fn should_pivot_quarterly_fuel_rows() {
        let grid = grid_at(
            2,
            &[
                &["Calendar quarter", "2024-03-31", "2024-06-30"],
                &["Hydro", "6000", "6500"],
                &["Biogas", "60", "65"],
                &["Natural gas", "940", "935"],
                &["Total renewable", "6060", "6565"],
            ],
        );
        let mut report = Report::new("test");

        let table = quarterly_fuel_table(&grid, &audit(), &mut report).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "QUARTER_DATE"), Some(&Value::Date(d(2024, 3, 31))));
        assert_eq!(table.value(1, "QUARTER_NUMBER"), Some(&Value::Int(2)));
        assert_eq!(table.value(0, "BIOGAS_GWH"), Some(&Value::Float(60.0)));
        assert_eq!(table.value(0, "GAS_GWH"), Some(&Value::Float(940.0)));
        assert_eq!(table.value(0, "TOTAL_GENERATION_GWH"), Some(&Value::Float(7000.0)));
        assert_eq!(table.value(0, "FOSSIL_FUEL_PERCENTAGE"), Some(&Value::Float(13.43)));
    }

    #[test]
    fn should_drop_quarterly_fuel_before_1974() {
        let grid = grid_at(
            0,
            &[
                &["Calendar quarter", "1960-03-01", "2024-03-01"],
                &["Hydro", "100", "6000"],
            ],
        );
        let mut report = Report::new("test");

        let table = quarterly_fuel_table(&grid, &audit(), &mut report).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "QUARTER_YEAR"), Some(&Value::Int(2024)));
        assert_eq!(report.dropped("year out of range"), 1);
    }

    #[test]
    fn should_abort_quarterly_fuel_without_header() {
        let grid = grid_at(0, &[&["Hydro", "6000"]]);
        let mut report = Report::new("test");

        let result = quarterly_fuel_table(&grid, &audit(), &mut report);

        assert!(matches!(result, Err(EtlError::HeaderNotFound { .. })));
    }

    #[test]
    fn should_compute_year_over_year_generation() {
        let grid = grid_at(
            1,
            &[
                &[
                    "Calendar quarter",
                    "2020-03-31",
                    "2021-03-31",
                    "2022-03-31",
                    "2023-03-31",
                    "2024-03-31",
                ],
                &["Net generation", "100", "110", "121", "133.1", "146.41"],
            ],
        );
        let mut report = Report::new("test");

        let table = quarterly_generation_table(&grid, &audit(), &mut report).unwrap();

        assert_eq!(table.len(), 5);
        for row in 0..4 {
            assert_eq!(
                table.value(row, "YEAR_OVER_YEAR_CHANGE_PERCENT"),
                Some(&Value::Null)
            );
        }
        assert_eq!(
            table.value(4, "YEAR_OVER_YEAR_CHANGE_PERCENT"),
            Some(&Value::Float(46.41))
        );
        assert_eq!(table.value(4, "CALENDAR_QUARTER"), Some(&Value::Date(d(2024, 3, 31))));
        assert_eq!(table.value(4, "QUARTER_NUMBER"), Some(&Value::Int(1)));
    }

    #[test]
    fn should_fall_back_to_row_eight_and_quarter_index() {
        let grid = grid_at(
            8,
            &[
                &["", "Mar", "Jun", "Sep", "Dec", "Mar"],
                &["Net generation", "1", "2", "3", "4", "5"],
            ],
        );
        let mut report = Report::new("test");

        let table = quarterly_generation_table(&grid, &audit(), &mut report).unwrap();

        assert_eq!(table.len(), 5);
        assert_eq!(table.value(0, "CALENDAR_QUARTER"), Some(&Value::Date(d(1974, 1, 1))));
        assert_eq!(table.value(4, "QUARTER_YEAR"), Some(&Value::Int(1975)));
        assert_eq!(table.value(4, "QUARTER_NUMBER"), Some(&Value::Int(1)));
        assert_eq!(
            table.value(4, "YEAR_OVER_YEAR_CHANGE_PERCENT"),
            Some(&Value::Null)
        );
    }

    #[test]
    fn should_clean_zone_columns_and_parse_timestamps() {
        let csv = "DATE,NZ Total(MW),Region (North)\n\
                   2025-07-01 00:05:00,4500.5,North\n\
                   not a date,1,x\n";
        let mut report = Report::new("test");

        let table = zone_table(csv.as_bytes(), &audit(), &mut report).unwrap();

        assert_eq!(
            table.columns[..3],
            ["TIMESTAMP_NZ", "NZ_TOTALMW", "REGION_NORTH"]
        );
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(0, "TIMESTAMP_NZ"),
            Some(&Value::DateTime(d(2025, 7, 1).and_hms_opt(0, 5, 0).unwrap()))
        );
        assert_eq!(table.value(0, "NZ_TOTALMW"), Some(&Value::Float(4500.5)));
        assert_eq!(table.value(0, "REGION_NORTH"), Some(&Value::from("North")));
        assert_eq!(report.dropped("unparseable timestamp"), 1);
    }

    #[test]
    fn should_require_zone_date_column() {
        let mut report = Report::new("test");
        let result = zone_table(b"TIME,MW\n00:05,1\n", &audit(), &mut report);
        assert!(matches!(result, Err(EtlError::MissingColumn { .. })));
    }
}
