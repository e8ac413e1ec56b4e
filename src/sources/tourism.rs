//! Stats NZ Infoshare tourism exports.
//!
//! Every export starts with a title line and one to six rows of header text
//! before the data. The two regional accommodation tables have a merged-cell
//! style header: regions on one row, metrics on the row below.

use chrono::Datelike;
use tracing::info;

use crate::{
    error::EtlError,
    output::{Audit, OutputTable, Value},
    reading::{
        coerce::{coerce_number, YearAnchor},
        labels::UNKNOWN_LABEL,
        reshape, CategorySource, HeaderFinder, Layout, MatchRule, PeriodRule, RawGrid, Shape,
    },
    report::Report,
    reshape::{pivot_first, NormalizedRecord},
};

pub const INPUT_DIR: &str = "tourism";

const PASSENGER_COLUMNS: [&str; 6] = [
    "arrivals_actual",
    "arrivals_sample",
    "departures_actual",
    "departures_sample",
    "total_actual",
    "total_sample",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    VisitorArrivals,
    PassengerMovements,
    GuestNights,
    OccupancyRates,
    MigrantArrivals,
}

impl Dataset {
    pub const ALL: [Dataset; 5] = [
        Dataset::VisitorArrivals,
        Dataset::PassengerMovements,
        Dataset::GuestNights,
        Dataset::OccupancyRates,
        Dataset::MigrantArrivals,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Dataset::VisitorArrivals => "ITM475712_20250803_062609_43.csv",
            Dataset::PassengerMovements => "ITM332206_20250803_062455_0.csv",
            Dataset::GuestNights => "ACS348801_20250803_062820_30.csv",
            Dataset::OccupancyRates => "ACS348401_20250803_062914_74.csv",
            Dataset::MigrantArrivals => "ITM553006_20250803_062257_32.csv",
        }
    }

    /// Infoshare table code, the prefix of the file name.
    pub fn code(&self) -> &'static str {
        match self {
            Dataset::VisitorArrivals => "ITM475712",
            Dataset::PassengerMovements => "ITM332206",
            Dataset::GuestNights => "ACS348801",
            Dataset::OccupancyRates => "ACS348401",
            Dataset::MigrantArrivals => "ITM553006",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Dataset::VisitorArrivals => "visitor_arrivals",
            Dataset::PassengerMovements => "passenger_movements",
            Dataset::GuestNights => "guest_nights_by_region",
            Dataset::OccupancyRates => "occupancy_rates_by_region",
            Dataset::MigrantArrivals => "migrant_arrivals",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Dataset::VisitorArrivals => "Visitor arrival total - month ended annuals",
            Dataset::PassengerMovements => "Total passenger movements",
            Dataset::GuestNights => "Guest Nights by Region (Monthly)",
            Dataset::OccupancyRates => "Occupancy Rate by Region (Monthly)",
            Dataset::MigrantArrivals => {
                "Estimated migrant arrivals by citizenship, visa type (Total)"
            }
        }
    }

    pub fn audit(&self, report: &Report) -> Audit {
        Audit::new(&format!("Stats NZ {}", self.code()), report.loaded_at)
    }

    /// Reshapes one export into its output table.
    pub fn table(&self, grid: &RawGrid, report: &mut Report) -> Result<OutputTable, EtlError> {
        let audit = self.audit(report);
        let table = match self {
            Dataset::VisitorArrivals => visitor_arrivals(self, grid, report)?,
            Dataset::PassengerMovements => passenger_movements(self, grid, report)?,
            Dataset::GuestNights | Dataset::OccupancyRates => regional(self, grid, report)?,
            Dataset::MigrantArrivals => migrant_arrivals(self, grid, report)?,
        };
        info!(dataset = self.code(), rows = table.len(), "processed {}", self.table_name());

        Ok(table.with_audit(&audit))
    }
}

/// Regional names as used by the other tourism tables.
pub fn standard_region(name: &str) -> &str {
    match name {
        "Hawke's Bay, Gisborne" => "Hawke's Bay",
        "Taranaki, Manawatu, Wanganui" => "Taranaki-Manawatu-Whanganui",
        "Nelson, Marlborough, Tasman" => "Tasman-Nelson-Marlborough",
        other => other,
    }
}

fn annual_layout(dataset: &Dataset, header_row: usize, rules: Vec<MatchRule>) -> Layout {
    Layout::new(
        dataset.code(),
        HeaderFinder::Fixed(header_row),
        Shape::PeriodRows {
            period_column: 0,
            categories: CategorySource::Rules(rules),
        },
    )
    .entity("NZ")
    .period(PeriodRule::Parse {
        anchor: YearAnchor::DEC_31,
    })
}

fn count(value: Option<f64>) -> Value {
    Value::from(value.map(|v| v as i64))
}

fn visitor_arrivals(
    dataset: &Dataset,
    grid: &RawGrid,
    report: &mut Report,
) -> Result<OutputTable, EtlError> {
    let layout = annual_layout(dataset, 2, vec![MatchRule::position("visitor_arrivals", 1)]);
    let records = reshape(grid, &layout, report)?;

    let mut table = OutputTable::new(
        dataset.table_name(),
        &[
            "report_year",
            "report_date",
            "period_type",
            "visitor_arrivals",
            "dataset_description",
        ],
    );
    for record in records {
        table.push(vec![
            Value::from(record.period.map(|d| d.year())),
            Value::from(record.period),
            Value::from(record.period_kind),
            count(record.value),
            Value::from(dataset.description()),
        ]);
    }

    Ok(table)
}

fn passenger_movements(
    dataset: &Dataset,
    grid: &RawGrid,
    report: &mut Report,
) -> Result<OutputTable, EtlError> {
    let rules = PASSENGER_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, name)| MatchRule::position(name, i + 1))
        .collect();
    let layout = annual_layout(dataset, 3, rules).keep_nulls();
    let pivot = pivot_first(&reshape(grid, &layout, report)?);

    let mut columns = vec!["report_year", "report_date", "period_type"];
    columns.extend(PASSENGER_COLUMNS);
    columns.push("dataset_description");
    let mut table = OutputTable::new(dataset.table_name(), &columns);

    for row in &pivot.rows {
        let mut values = vec![
            Value::from(row.period.map(|d| d.year())),
            Value::from(row.period),
            Value::from(row.period_kind),
        ];
        values.extend(PASSENGER_COLUMNS.iter().map(|c| count(row.get(c))));
        values.push(Value::from(dataset.description()));
        table.push(values);
    }

    Ok(table)
}

/// Regions on grid row 2, metrics on row 3, monthly periods from row 4.
fn regional(dataset: &Dataset, grid: &RawGrid, report: &mut Report) -> Result<OutputTable, EtlError> {
    let layout = Layout::new(
        dataset.code(),
        HeaderFinder::Fixed(2),
        Shape::PeriodRows {
            period_column: 0,
            categories: CategorySource::TwoRowLabels,
        },
    );

    let records: Vec<NormalizedRecord> = reshape(grid, &layout, report)?
        .into_iter()
        .filter(|r| {
            let known = r.entity_id != UNKNOWN_LABEL;
            if !known {
                report.drop_silently("unknown region");
            }
            known
        })
        .collect();
    let pivot = pivot_first(&records);

    let mut columns = vec!["report_date", "period_type", "region"];
    columns.extend(pivot.categories.iter().map(String::as_str));
    columns.push("dataset_description");
    let mut table = OutputTable::new(dataset.table_name(), &columns);

    for row in &pivot.rows {
        let mut values = vec![
            Value::from(row.period),
            Value::from(row.period_kind),
            Value::from(standard_region(&row.entity_id)),
        ];
        values.extend(pivot.categories.iter().map(|c| Value::from(row.get(c))));
        values.push(Value::from(dataset.description()));
        table.push(values);
    }

    Ok(table)
}

/// Year in column 0 from grid row 7; the total is the last positive number
/// on the row.
fn migrant_arrivals(
    dataset: &Dataset,
    grid: &RawGrid,
    report: &mut Report,
) -> Result<OutputTable, EtlError> {
    const DATA_START: usize = 7;
    const YEARS: std::ops::RangeInclusive<i32> = 2000..=2100;

    if grid.is_empty() {
        return Err(EtlError::EmptyInput(dataset.code().to_string()));
    }

    let mut table = OutputTable::new(
        dataset.table_name(),
        &[
            "report_year",
            "report_date",
            "period_type",
            "total_migrant_arrivals",
            "dataset_description",
        ],
    );

    for row in grid.rows().skip(DATA_START) {
        let Some(first) = row.first() else { continue };
        let Ok(year) = first.as_str().parse::<i32>() else {
            report.drop_silently("unparseable period");
            continue;
        };
        report.rows_read += 1;
        if !YEARS.contains(&year) {
            report.drop_silently("year out of range");
            continue;
        }

        let total = row[1..]
            .iter()
            .rev()
            .filter_map(coerce_number)
            .find(|v| *v > 0.0);
        let Some(total) = total else {
            report.drop_silently("blank value");
            continue;
        };

        table.push(vec![
            Value::from(year),
            Value::from(YearAnchor::APR_30.date(year)),
            Value::from("Annual"),
            Value::Int(total as i64),
            Value::from(dataset.description()),
        ]);
    }
    report.records_emitted += table.len();

    Ok(table)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn grid(rows: &[&[&str]]) -> RawGrid {
        let rows: Vec<Vec<&str>> = rows.iter().map(|r| r.to_vec()).collect();
        RawGrid::from_rows(&rows)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn should_drop_years_outside_range() {
        let g = grid(&[
            &["Visitor arrival totals (Annual-Dec)"],
            &[""],
            &["", "Actual"],
            &["1750", "10"],
            &["2024", "3,456"],
            &["2023", ""],
            &["Table information:"],
        ]);
        let mut report = Report::new("test");

        let table = Dataset::VisitorArrivals.table(&g, &mut report).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "report_year"), Some(&Value::Int(2024)));
        assert_eq!(table.value(0, "report_date"), Some(&Value::Date(d(2024, 12, 31))));
        assert_eq!(table.value(0, "period_type"), Some(&Value::from("Annual")));
        assert_eq!(table.value(0, "visitor_arrivals"), Some(&Value::Int(3456)));
        assert_eq!(
            table.value(0, "data_source"),
            Some(&Value::from("Stats NZ ITM475712"))
        );
        assert_eq!(report.dropped("year out of range"), 1);
    }

    #[test]
    fn should_keep_null_passenger_counts() {
        let g = grid(&[
            &["Total passenger movements"],
            &[""],
            &["", "Arrivals", "", "Departures"],
            &["", "Actual", "Sample", "Actual", "Sample", "Actual", "Sample"],
            &["2020", "5", "", "7", "", "12", ""],
        ]);
        let mut report = Report::new("test");

        let table = Dataset::PassengerMovements.table(&g, &mut report).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "arrivals_actual"), Some(&Value::Int(5)));
        assert_eq!(table.value(0, "arrivals_sample"), Some(&Value::Null));
        assert_eq!(table.value(0, "total_actual"), Some(&Value::Int(12)));
    }

    #[test]
    fn should_pivot_regions_and_drop_unknown() {
        let g = grid(&[
            &["Accommodation Survey: Guest Nights by Region"],
            &[""],
            &["", "", "Hawke's Bay, Gisborne", "", "Otago"],
            &["", "Total", "Total", "Domestic", "Total"],
            &["2024M01", "1", "10", "4", "7"],
        ]);
        let mut report = Report::new("test");

        let table = Dataset::GuestNights.table(&g, &mut report).unwrap();

        assert_eq!(
            table.columns,
            vec![
                "report_date",
                "period_type",
                "region",
                "Domestic",
                "Total",
                "dataset_description",
                "data_source",
                "load_timestamp"
            ]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "region"), Some(&Value::from("Hawke's Bay")));
        assert_eq!(table.value(0, "Domestic"), Some(&Value::Float(4.0)));
        assert_eq!(table.value(0, "report_date"), Some(&Value::Date(d(2024, 1, 1))));
        assert_eq!(table.value(1, "region"), Some(&Value::from("Otago")));
        assert_eq!(table.value(1, "Domestic"), Some(&Value::Null));
        assert_eq!(report.dropped("unknown region"), 1);
    }

    #[test]
    fn should_take_last_positive_migrant_total() {
        let blank: &[&str] = &[""];
        let mut rows = vec![blank; 7];
        rows.push(&["1999", "5", "6"]);
        rows.push(&["2019", "100", "250", ""]);
        rows.push(&["2020", "100", "0"]);
        rows.push(&["Total"]);
        let g = grid(&rows);
        let mut report = Report::new("test");

        let table = Dataset::MigrantArrivals.table(&g, &mut report).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "total_migrant_arrivals"), Some(&Value::Int(250)));
        assert_eq!(table.value(0, "report_date"), Some(&Value::Date(d(2019, 4, 30))));
        assert_eq!(table.value(1, "total_migrant_arrivals"), Some(&Value::Int(100)));
        assert_eq!(report.dropped("year out of range"), 1);
    }

    #[test]
    fn should_standardise_region_names() {
        assert_eq!(
            standard_region("Taranaki, Manawatu, Wanganui"),
            "Taranaki-Manawatu-Whanganui"
        );
        assert_eq!(standard_region("Otago"), "Otago");
    }
}
