//! NIWA climate station archives.
//!
//! Each station ships as `<station>_Rain.zip` or `<station>_Temperature.zip`.
//! Members are one CSV per statistic, named
//! `<station>__<annual|monthly>__<Statistic>.csv`, with `YEAR`, `STATS_VALUE`
//! and, for monthly files, a `PERIOD` month name.

use std::{ops::RangeInclusive, path::Path};

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    output::{Audit, OutputTable, Value},
    reading::{
        coerce::{month_number, parse_measure},
        grid::decode_text,
        layout::match_rule,
        MatchRule,
    },
    report::Report,
    reshape::{pivot_first, NormalizedRecord},
};

pub const DATA_SOURCE: &str = "NIWA CliFlo";
pub const VALID_YEARS: RangeInclusive<i32> = 1800..=2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateKind {
    Rain,
    Temperature,
}

impl ClimateKind {
    pub const ALL: [ClimateKind; 2] = [ClimateKind::Rain, ClimateKind::Temperature];

    /// Glob for this kind's archives under a data directory.
    pub fn archive_pattern(&self) -> &'static str {
        match self {
            ClimateKind::Rain => "*_Rain.zip",
            ClimateKind::Temperature => "*_Temperature.zip",
        }
    }

    fn table_prefix(&self) -> &'static str {
        match self {
            ClimateKind::Rain => "rainfall",
            ClimateKind::Temperature => "temperature",
        }
    }

    /// Statistic name rules, tried in order against member file names.
    pub fn rules(&self) -> Vec<MatchRule> {
        match self {
            ClimateKind::Rain => vec![
                MatchRule::keywords("total_rainfall_mm", &["Total_rainfall"]),
                MatchRule::keywords("rain_days_count", &["Rain_Days"]),
                MatchRule::keywords("total_runoff_mm", &["Total_Runoff"]),
                MatchRule::keywords("total_deficit_mm", &["Total_Deficit"]),
            ],
            // The standard deviation file name also contains "Mean_Air_Temperature".
            ClimateKind::Temperature => vec![
                MatchRule::keywords("temperature_std_dev", &["Standard_Deviation"]),
                MatchRule::keywords("mean_temperature_c", &["Mean_Air_Temperature"]),
                MatchRule::keywords("mean_max_temperature_c", &["Mean_Daily_Maximum"]),
                MatchRule::keywords("mean_min_temperature_c", &["Mean_Daily_Minimum"]),
                MatchRule::keywords("extreme_grass_min_c", &["Extreme_Grass_Minimum"]),
                MatchRule::keywords("earth_temperature_10cm_c", &["10cm_Earth"]),
                MatchRule::keywords("ground_frost_days", &["Ground_Frost"]),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Annual,
    Monthly,
}

/// Station id and kind from an archive name such as `1962_Rain.zip`.
pub fn parse_archive_name(path: &Path) -> Option<(String, ClimateKind)> {
    let stem = path.file_stem()?.to_str()?;
    let (station, kind) = stem.split_once('_')?;
    let kind = match kind.to_lowercase().as_str() {
        "rain" => ClimateKind::Rain,
        "temperature" => ClimateKind::Temperature,
        _ => return None,
    };

    Some((station.to_string(), kind))
}

fn member_frequency(file_name: &str) -> Option<Frequency> {
    match file_name.split("__").nth(1)? {
        "annual" => Some(Frequency::Annual),
        "monthly" => Some(Frequency::Monthly),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct StatRow {
    #[serde(rename = "YEAR")]
    year: Option<String>,
    #[serde(rename = "PERIOD", default)]
    period: Option<String>,
    #[serde(rename = "STATS_VALUE")]
    value: Option<String>,
}

/// Collects statistics across stations, then pivots them into the four
/// combined tables.
#[derive(Debug)]
pub struct ClimateTables {
    records: Vec<(ClimateKind, Frequency, NormalizedRecord)>,
}

impl ClimateTables {
    pub fn new() -> Self {
        ClimateTables {
            records: Vec::new(),
        }
    }

    /// Adds one member CSV. Members whose name matches no statistic rule are
    /// skipped.
    pub fn add_member(
        &mut self,
        station_id: &str,
        kind: ClimateKind,
        file_name: &str,
        bytes: &[u8],
        report: &mut Report,
    ) {
        let Some(frequency) = member_frequency(file_name) else {
            debug!(file_name, "not an annual or monthly statistic");
            return;
        };
        let rules = kind.rules();
        let Some(rule) = match_rule(&rules, usize::MAX, file_name) else {
            debug!(file_name, "no statistic rule matches");
            return;
        };

        let text = decode_text(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let before = self.records.len();
        for result in reader.deserialize::<StatRow>() {
            report.rows_read += 1;
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    report.drop_record("unreadable row", e);
                    continue;
                }
            };

            let Some(period) = row_period(&row, frequency) else {
                report.drop_record(
                    "unparseable period",
                    format!("{:?} {:?}", row.year, row.period),
                );
                continue;
            };
            if !VALID_YEARS.contains(&period.year()) {
                report.drop_record("year out of range", period.year());
                continue;
            }
            let Some(value) = row.value.as_deref().and_then(parse_measure) else {
                report.drop_silently("blank value");
                continue;
            };

            self.records.push((
                kind,
                frequency,
                NormalizedRecord {
                    entity_id: station_id.to_string(),
                    period: Some(period),
                    period_kind: match frequency {
                        Frequency::Annual => "Annual",
                        Frequency::Monthly => "Monthly",
                    },
                    category: rule.name.clone(),
                    value: Some(value),
                    source_tag: kind.table_prefix().to_string(),
                    load_timestamp: report.loaded_at,
                },
            ));
        }

        let added = self.records.len() - before;
        report.records_emitted += added;
        debug!(station_id, file_name, statistic = %rule.name, records = added, "read member");
    }

    pub fn tables(&self, audit: &Audit) -> Vec<OutputTable> {
        let mut tables = Vec::new();
        for kind in ClimateKind::ALL {
            for frequency in [Frequency::Annual, Frequency::Monthly] {
                tables.push(self.table(kind, frequency).with_audit(audit));
            }
        }
        tables
    }

    fn table(&self, kind: ClimateKind, frequency: Frequency) -> OutputTable {
        let records: Vec<NormalizedRecord> = self
            .records
            .iter()
            .filter(|(k, f, _)| *k == kind && *f == frequency)
            .map(|(_, _, r)| r.clone())
            .collect();
        let pivot = pivot_first(&records);

        // Statistic columns in rule order, limited to those present.
        let statistics: Vec<String> = kind
            .rules()
            .into_iter()
            .map(|r| r.name)
            .filter(|name| pivot.categories.contains(name))
            .collect();

        let (name, mut columns) = match frequency {
            Frequency::Annual => (
                format!("{}_annual_combined", kind.table_prefix()),
                vec!["station_id", "station_name", "year"],
            ),
            Frequency::Monthly => (
                format!("{}_monthly_combined", kind.table_prefix()),
                vec!["station_id", "station_name", "year", "month_number", "month_name"],
            ),
        };
        columns.extend(statistics.iter().map(String::as_str));
        let mut table = OutputTable::new(&name, &columns);

        let mut rows: Vec<_> = pivot.rows.iter().collect();
        rows.sort_by(|a, b| (&a.entity_id, a.period).cmp(&(&b.entity_id, b.period)));

        for row in rows {
            let Some(period) = row.period else { continue };
            let station = match row.entity_id.parse::<i64>() {
                Ok(id) => Value::Int(id),
                Err(_) => Value::from(row.entity_id.as_str()),
            };
            let mut values = vec![
                station,
                Value::from(format!("NIWA Station {}", row.entity_id)),
                Value::from(period.year()),
            ];
            if frequency == Frequency::Monthly {
                values.push(Value::from(period.month()));
                values.push(Value::from(period.format("%B").to_string()));
            }
            values.extend(statistics.iter().map(|s| Value::from(row.get(s))));
            table.push(values);
        }

        info!(table = %name, rows = table.len(), "combined climate table");
        table
    }
}

impl Default for ClimateTables {
    fn default() -> Self {
        Self::new()
    }
}

fn row_period(row: &StatRow, frequency: Frequency) -> Option<NaiveDate> {
    let year: i32 = row.year.as_deref()?.trim().parse().ok()?;
    match frequency {
        Frequency::Annual => NaiveDate::from_ymd_opt(year, 1, 1),
        Frequency::Monthly => {
            let month = month_number(row.period.as_deref()?)?;
            NaiveDate::from_ymd_opt(year, month, 1)
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDateTime;

    use super::*;

    fn audit() -> Audit {
        Audit::new(DATA_SOURCE, NaiveDateTime::default())
    }

    #[test]
    fn should_parse_archive_names() {
        assert_eq!(
            parse_archive_name(&PathBuf::from("data/1962_Rain.zip")),
            Some(("1962".to_string(), ClimateKind::Rain))
        );
        assert_eq!(
            parse_archive_name(&PathBuf::from("4960_Temperature.zip")),
            Some(("4960".to_string(), ClimateKind::Temperature))
        );
        assert_eq!(parse_archive_name(&PathBuf::from("readme.zip")), None);
    }

    #[test]
    fn should_match_standard_deviation_before_mean() {
        let rules = ClimateKind::Temperature.rules();
        let name = "4960__annual__Standard_Deviation_of_Mean_Air_Temperature__DegC.csv";
        assert_eq!(
            match_rule(&rules, usize::MAX, name).map(|r| r.name.as_str()),
            Some("temperature_std_dev")
        );
    }

    #[test]
    fn should_pivot_annual_statistics_per_station() {
        let mut climate = ClimateTables::new();
        let mut report = Report::new("test");
        climate.add_member(
            "1962",
            ClimateKind::Rain,
            "1962__annual__Total_rainfall__mm.csv",
            b"YEAR,STATS_VALUE\n2020,1200.5\n2021,\n",
            &mut report,
        );
        climate.add_member(
            "1962",
            ClimateKind::Rain,
            "1962__annual__Rain_Days__with_0_1mm_or_more___days.csv",
            b"YEAR,STATS_VALUE\n2020,150\n2021,140\n",
            &mut report,
        );

        let tables = climate.tables(&audit());
        let annual = &tables[0];

        assert_eq!(annual.name, "rainfall_annual_combined");
        assert_eq!(
            annual.columns[..5],
            ["station_id", "station_name", "year", "total_rainfall_mm", "rain_days_count"]
        );
        assert_eq!(annual.len(), 2);
        assert_eq!(annual.value(0, "station_id"), Some(&Value::Int(1962)));
        assert_eq!(annual.value(0, "total_rainfall_mm"), Some(&Value::Float(1200.5)));
        assert_eq!(annual.value(1, "total_rainfall_mm"), Some(&Value::Null));
        assert_eq!(annual.value(1, "rain_days_count"), Some(&Value::Float(140.0)));
        assert!(tables[1].is_empty());
        assert_eq!(report.dropped("blank value"), 1);
    }

    #[test]
    fn should_resolve_monthly_periods_from_month_names() {
        let mut climate = ClimateTables::new();
        let mut report = Report::new("test");
        climate.add_member(
            "4960",
            ClimateKind::Temperature,
            "4960__monthly__Mean_Air_Temperature__Deg_C.csv",
            b"YEAR,PERIOD,STATS_VALUE\n2020,March,-1.5\n2020,January,18.2\n2020,Smarch,3\n",
            &mut report,
        );

        let tables = climate.tables(&audit());
        let monthly = &tables[3];

        assert_eq!(monthly.name, "temperature_monthly_combined");
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly.value(0, "month_number"), Some(&Value::Int(1)));
        assert_eq!(monthly.value(0, "month_name"), Some(&Value::from("January")));
        assert_eq!(monthly.value(1, "mean_temperature_c"), Some(&Value::Float(-1.5)));
        assert_eq!(report.dropped("unparseable period"), 1);
    }

    #[test]
    fn should_drop_years_outside_range() {
        let mut climate = ClimateTables::new();
        let mut report = Report::new("test");
        climate.add_member(
            "1962",
            ClimateKind::Rain,
            "1962__annual__Total_rainfall__mm.csv",
            b"YEAR,STATS_VALUE\n1750,900\n2024,1200\n",
            &mut report,
        );

        let tables = climate.tables(&audit());
        let annual = &tables[0];

        assert_eq!(annual.len(), 1);
        assert_eq!(annual.value(0, "year"), Some(&Value::Int(2024)));
        assert_eq!(report.dropped("year out of range"), 1);
    }

    #[test]
    fn should_skip_unknown_members() {
        let mut climate = ClimateTables::new();
        let mut report = Report::new("test");
        climate.add_member(
            "1962",
            ClimateKind::Rain,
            "1962__annual__Max_1_day_rainfall__mm.csv",
            b"YEAR,STATS_VALUE\n2020,80\n",
            &mut report,
        );

        assert!(climate.tables(&audit()).iter().all(|t| t.is_empty()));
    }
}
