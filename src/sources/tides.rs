//! LINZ tide prediction tables.
//!
//! Each file has three header lines (port, reference date, time zone) followed by
//! one line per day: `day,weekday,month,year` and up to four `time,height` pairs.

use std::{collections::BTreeMap, ops::RangeInclusive, path::Path};

use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    download::Download,
    output::{Audit, OutputTable, Value},
    reading::{
        coerce::{parse_measure, round_to},
        grid::{clean_mojibake, decode_text},
        RawGrid,
    },
    report::Report,
};

pub const DATA_SOURCE: &str = "LINZ Tide Predictions";
pub const BASE_URL: &str = "https://static.charts.linz.govt.nz/tide-tables/maj-ports/csv/";
pub const CITIES: [&str; 6] = ["Auckland", "Wellington", "Tauranga", "Lyttelton", "Dunedin", "Napier"];
pub const VALID_YEARS: RangeInclusive<i32> = 2024..=2026;
pub const FILE_SUFFIX: &str = "_tide_predictions.csv";

const HEADER_LINES: usize = 3;
const MAX_TIDES_PER_DAY: usize = 4;

static PORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+),([^,]+),([^,]+),([^,]+)").unwrap());

/// One download per city and year, saved as `<City>_<year>_tide_predictions.csv`.
pub fn downloads(data_dir: &Path) -> Vec<Download> {
    CITIES
        .iter()
        .flat_map(|city| {
            VALID_YEARS.map(move |year| Download {
                url: format!("{}{}%20{}.csv", BASE_URL, city, year),
                path: data_dir.join(format!("{}_{}{}", city, year, FILE_SUFFIX)),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub code: String,
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub reference_info: String,
    pub timezone_info: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TideEvent {
    pub port_code: String,
    pub port_name: String,
    pub date: NaiveDate,
    pub day_of_week: String,
    pub time: NaiveTime,
    pub time_text: String,
    pub height_m: f64,
    pub sequence: usize,
    pub source_file: String,
}

/// Parses line 1 of a tide file. Falls back to plain comma splitting, then to
/// the city prefix of `file_name`, when the line is not in the expected form.
fn parse_port(lines: &[&str], file_name: &str) -> Port {
    let line = clean_mojibake(lines.first().copied().unwrap_or_default().trim());
    let info = |i: usize, default: &str| {
        lines
            .get(i)
            .map(|l| clean_mojibake(l.trim()))
            .unwrap_or_else(|| default.to_string())
    };
    let reference_info = info(1, "Unknown reference date");
    let timezone_info = info(2, "Local time, heights in metres");

    if let Some(c) = PORT_LINE.captures(&line) {
        return Port {
            code: c[1].to_string(),
            name: c[2].trim().to_string(),
            latitude: c[3].trim().to_string(),
            longitude: c[4].trim().to_string(),
            reference_info,
            timezone_info,
        };
    }

    let parts: Vec<&str> = line.split(',').collect();
    let part = |i: usize| parts.get(i).map(|p| p.trim().to_string());
    Port {
        code: part(0).unwrap_or_else(|| "Unknown".to_string()),
        name: part(1).unwrap_or_else(|| file_name.split('_').next().unwrap_or_default().to_string()),
        latitude: part(2).unwrap_or_else(|| "Unknown".to_string()),
        longitude: part(3).unwrap_or_else(|| "Unknown".to_string()),
        reference_info,
        timezone_info,
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let (hour, minute) = raw.split_once(':')?;
    NaiveTime::from_hms_opt(hour.trim().parse().ok()?, minute.trim().parse().ok()?, 0)
}

/// Parses one tide file into its port and tide events.
pub fn parse_tide_file(bytes: &[u8], file_name: &str, report: &mut Report) -> (Port, Vec<TideEvent>) {
    let text = decode_text(bytes);
    let lines: Vec<&str> = text.lines().collect();
    let port = parse_port(&lines, file_name);

    let body = lines.get(HEADER_LINES..).unwrap_or_default().join("\n");
    let grid = RawGrid::from_csv_str(&body);

    let mut events = Vec::new();
    for (index, row) in grid.rows().enumerate() {
        let line_num = index + HEADER_LINES + 1;
        if row.len() < 4 {
            report.drop_silently("short line");
            continue;
        }
        report.rows_read += 1;

        let field = |i: usize| row[i].as_str().trim().to_string();
        let (Ok(day), Ok(month), Ok(year)) = (
            field(0).parse::<u32>(),
            field(2).parse::<u32>(),
            field(3).parse::<i32>(),
        ) else {
            report.drop_record("unparseable line", format!("{} line {}", file_name, line_num));
            continue;
        };
        if !VALID_YEARS.contains(&year) {
            report.drop_record("year out of range", format!("{} line {}: {}", file_name, line_num, year));
            continue;
        }
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            report.drop_record(
                "invalid date",
                format!("{} line {}: {}/{}/{}", file_name, line_num, day, month, year),
            );
            continue;
        };
        let day_of_week = row[1].as_str().into_owned();

        for i in 0..MAX_TIDES_PER_DAY {
            let time_cell = row.get(4 + i * 2);
            let height_cell = row.get(5 + i * 2);
            let (Some(time_cell), Some(height_cell)) = (time_cell, height_cell) else {
                break;
            };
            if time_cell.is_blank() || height_cell.is_blank() {
                continue;
            }
            let time_text = time_cell.as_str().into_owned();
            let (Some(time), Some(height_m)) = (parse_time(&time_text), parse_measure(&height_cell.as_str()))
            else {
                report.drop_silently("malformed tide");
                continue;
            };

            events.push(TideEvent {
                port_code: port.code.clone(),
                port_name: port.name.clone(),
                date,
                day_of_week: day_of_week.clone(),
                time,
                time_text,
                height_m,
                sequence: i + 1,
                source_file: file_name.to_string(),
            });
        }
    }

    report.records_emitted += events.len();
    (port, events)
}

/// Per-event table sorted by port name, date and tide sequence.
pub fn predictions_table(ports: &[Port], events: &[TideEvent], audit: &Audit) -> OutputTable {
    let mut table = OutputTable::new(
        "tide_predictions_combined",
        &[
            "port_code",
            "port_name",
            "latitude",
            "longitude",
            "date",
            "day_of_week",
            "tide_datetime",
            "tide_time",
            "tide_height_m",
            "tide_sequence",
            "year",
            "month",
            "day",
            "reference_info",
            "timezone_info",
            "source_file",
        ],
    );

    let by_code: BTreeMap<&str, &Port> = ports.iter().rev().map(|p| (p.code.as_str(), p)).collect();

    let mut sorted: Vec<&TideEvent> = events.iter().collect();
    sorted.sort_by(|a, b| (&a.port_name, a.date, a.sequence).cmp(&(&b.port_name, b.date, b.sequence)));

    for e in sorted {
        let port = by_code.get(e.port_code.as_str());
        let port_field = |f: fn(&Port) -> &String| Value::from(port.map(|p| f(*p).clone()));
        table.push(vec![
            e.port_code.clone().into(),
            e.port_name.clone().into(),
            port_field(|p| &p.latitude),
            port_field(|p| &p.longitude),
            e.date.into(),
            e.day_of_week.clone().into(),
            e.date.and_time(e.time).into(),
            e.time_text.clone().into(),
            e.height_m.into(),
            e.sequence.into(),
            e.date.year().into(),
            e.date.month().into(),
            e.date.day().into(),
            port_field(|p| &p.reference_info),
            port_field(|p| &p.timezone_info),
            e.source_file.clone().into(),
        ]);
    }

    table.with_audit(audit)
}

/// Count, min, max, mean and sample standard deviation of tide height, plus the
/// first and last date, per port and year. Rounded to 3 places.
pub fn statistics_table(events: &[TideEvent], audit: &Audit) -> OutputTable {
    let mut table = OutputTable::new(
        "tide_statistics_by_port",
        &[
            "port_code",
            "port_name",
            "year",
            "tide_height_m_count",
            "tide_height_m_min",
            "tide_height_m_max",
            "tide_height_m_mean",
            "tide_height_m_std",
            "date_min",
            "date_max",
        ],
    );

    let mut groups: BTreeMap<(&str, &str, i32), Vec<&TideEvent>> = BTreeMap::new();
    for e in events {
        groups
            .entry((e.port_code.as_str(), e.port_name.as_str(), e.date.year()))
            .or_default()
            .push(e);
    }

    for ((code, name, year), group) in groups {
        let heights: Vec<f64> = group.iter().map(|e| e.height_m).collect();
        let n = heights.len() as f64;
        let mean = heights.iter().sum::<f64>() / n;
        let std = (heights.len() > 1).then(|| {
            let var = heights.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / (n - 1.0);
            round_to(var.sqrt(), 3)
        });
        let min = heights.iter().copied().fold(f64::INFINITY, f64::min);
        let max = heights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let first = group.iter().map(|e| e.date).min();
        let last = group.iter().map(|e| e.date).max();

        table.push(vec![
            code.into(),
            name.into(),
            year.into(),
            heights.len().into(),
            round_to(min, 3).into(),
            round_to(max, 3).into(),
            round_to(mean, 3).into(),
            std.into(),
            first.into(),
            last.into(),
        ]);
    }

    table.with_audit(audit)
}

/// One row per distinct port code, first occurrence wins.
pub fn ports_table(ports: &[Port], audit: &Audit) -> OutputTable {
    let mut table = OutputTable::new(
        "tide_ports_metadata",
        &[
            "port_code",
            "port_name",
            "latitude",
            "longitude",
            "reference_info",
            "timezone_info",
        ],
    );

    let mut seen = std::collections::HashSet::new();
    for p in ports.iter().filter(|p| seen.insert(p.code.clone())) {
        table.push(vec![
            p.code.clone().into(),
            p.name.clone().into(),
            p.latitude.clone().into(),
            p.longitude.clone().into(),
            p.reference_info.clone().into(),
            p.timezone_info.clone().into(),
        ]);
    }

    table.with_audit(audit)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    const FILE: &str = "\u{feff}1234,Auckland,36Â°51'S,174Â°46'E\n\
        Times are referenced to 1 Jan 2024\n\
        Local time, heights in metres\n\
        1,Mo,1,2024,03:12,2.9,09:20,0.6,15:35,3.0,21:50,0.5\n\
        2,Tu,1,2024,04:01,2.8,bad,0.7,,,22:40,0.4\n\
        31,We,2,2024,04:00,2.8\n\
        1,Th,1,2023,04:00,2.8\n";

    fn audit() -> Audit {
        Audit::new(DATA_SOURCE, NaiveDateTime::default())
    }

    #[test]
    fn should_build_download_list() {
        let items = downloads(Path::new("data"));
        assert_eq!(items.len(), 18);
        assert_eq!(
            items[0].url,
            "https://static.charts.linz.govt.nz/tide-tables/maj-ports/csv/Auckland%202024.csv"
        );
        assert_eq!(items[0].path, Path::new("data/Auckland_2024_tide_predictions.csv"));
    }

    #[test]
    fn should_parse_port_header() {
        let mut report = Report::new("tides");
        let (port, _) = parse_tide_file(FILE.as_bytes(), "Auckland_2024_tide_predictions.csv", &mut report);

        assert_eq!(port.code, "1234");
        assert_eq!(port.name, "Auckland");
        assert_eq!(port.latitude, "36°51'S");
        assert_eq!(port.reference_info, "Times are referenced to 1 Jan 2024");
    }

    #[test]
    fn should_parse_tide_events() {
        let mut report = Report::new("tides");
        let (_, events) = parse_tide_file(FILE.as_bytes(), "Auckland_2024_tide_predictions.csv", &mut report);

        assert_eq!(events.len(), 6);
        assert_eq!(events[0].height_m, 2.9);
        assert_eq!(events[3].sequence, 4);
        assert_eq!(events[5].sequence, 4);
        assert_eq!(events[5].time, NaiveTime::from_hms_opt(22, 40, 0).unwrap());
        assert_eq!(report.dropped("malformed tide"), 1);
        assert_eq!(report.dropped("invalid date"), 1);
        assert_eq!(report.dropped("year out of range"), 1);
    }

    #[test]
    fn should_reject_years_that_overflow() {
        let file = "1234,Auckland,36S,174E\nref\ntz\n1,Mo,1,4294969320,01:00,1.5\n2,Tu,1,2024,01:00,1.5\n";
        let mut report = Report::new("tides");

        let (_, events) = parse_tide_file(file.as_bytes(), "Auckland_2024_tide_predictions.csv", &mut report);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(report.dropped("unparseable line"), 1);
    }

    #[test]
    fn should_fall_back_when_port_line_is_malformed() {
        let mut report = Report::new("tides");
        let (port, _) = parse_tide_file(b"Napier\n", "Napier_2025_tide_predictions.csv", &mut report);

        assert_eq!(port.code, "Napier");
        assert_eq!(port.name, "Napier");
        assert_eq!(port.latitude, "Unknown");
        assert_eq!(port.timezone_info, "Local time, heights in metres");
    }

    #[test]
    fn should_summarise_heights_per_port_year() {
        let mut report = Report::new("tides");
        let (_, events) = parse_tide_file(FILE.as_bytes(), "Auckland_2024_tide_predictions.csv", &mut report);

        let table = statistics_table(&events, &audit());

        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "tide_height_m_count"), Some(&Value::Int(6)));
        assert_eq!(table.value(0, "tide_height_m_min"), Some(&Value::Float(0.4)));
        assert_eq!(table.value(0, "tide_height_m_max"), Some(&Value::Float(3.0)));
        assert_eq!(table.value(0, "tide_height_m_mean"), Some(&Value::Float(1.7)));
        assert_eq!(
            table.value(0, "date_max"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()))
        );
    }

    #[test]
    fn should_sort_predictions_and_dedupe_ports() {
        let mut report = Report::new("tides");
        let (port, mut events) = parse_tide_file(FILE.as_bytes(), "Auckland_2024_tide_predictions.csv", &mut report);
        events.reverse();
        let ports = vec![port.clone(), port];

        let predictions = predictions_table(&ports, &events, &audit());
        let metadata = ports_table(&ports, &audit());

        assert_eq!(predictions.value(0, "tide_sequence"), Some(&Value::Int(1)));
        assert_eq!(predictions.value(0, "tide_datetime").map(Value::render).unwrap(), "2024-01-01 03:12:00");
        assert_eq!(predictions.value(0, "month"), Some(&Value::Int(1)));
        assert_eq!(predictions.value(0, "latitude"), Some(&Value::from("36°51'S")));
        assert_eq!(metadata.len(), 1);
    }
}
