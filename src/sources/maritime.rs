//! Maritime NZ accident and incident reports.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::EtlError,
    output::{Audit, OutputTable, Value},
    reading::{
        coerce::{parse_date, parse_measure, quarter_of, YearAnchor},
        grid::decode_text,
    },
    report::Report,
    reshape::classify::incident_severity,
};

pub const DATA_SOURCE: &str = "Maritime NZ";
pub const SOURCE_URL: &str =
    "https://maritimenz.govt.nz/media/accacvzc/accident-incident-reporting-data.csv";
pub const INPUT_FILE: &str = "accident-incident-reporting-data.csv";

const REQUIRED_COLUMNS: [&str; 4] = ["Event ID", "Event Date", "Latitude", "Longitude"];

const COLUMNS: [&str; 23] = [
    "event_id",
    "event_date_original",
    "event_date",
    "event_year",
    "event_month",
    "event_quarter",
    "brief_description",
    "what_happened",
    "incident_severity",
    "event_location",
    "latitude_decimal",
    "longitude_decimal",
    "nz_region",
    "where_happened",
    "sector",
    "injured_persons",
    "vessel_type",
    "safety_system",
    "country_flag",
    "gross_tonnage",
    "length_overall",
    "year_of_build",
    "vessel_age_at_incident",
];

#[derive(Debug, Deserialize)]
struct IncidentRow {
    #[serde(rename = "Event ID")]
    event_id: Option<String>,
    #[serde(rename = "Event Date")]
    event_date: Option<String>,
    #[serde(rename = "Brief Description", default)]
    brief_description: Option<String>,
    #[serde(rename = "What happened", default)]
    what_happened: Option<String>,
    #[serde(rename = "Event Location", default)]
    event_location: Option<String>,
    #[serde(rename = "Latitude")]
    latitude: Option<String>,
    #[serde(rename = "Longitude")]
    longitude: Option<String>,
    #[serde(rename = "NZ Region", default)]
    nz_region: Option<String>,
    #[serde(rename = "Where Happened", default)]
    where_happened: Option<String>,
    #[serde(rename = "Sector", default)]
    sector: Option<String>,
    #[serde(rename = "Number of Injured Persons", default)]
    injured_persons: Option<String>,
    #[serde(rename = "Vessel Type", default)]
    vessel_type: Option<String>,
    #[serde(rename = "Safety System", default)]
    safety_system: Option<String>,
    #[serde(rename = "Country Flag", default)]
    country_flag: Option<String>,
    #[serde(rename = "Gross Tonnage", default)]
    gross_tonnage: Option<String>,
    #[serde(rename = "Length Overall", default)]
    length_overall: Option<String>,
    #[serde(rename = "Year of Build", default)]
    year_of_build: Option<String>,
}

/// Trimmed text; blank and `NULL` are null.
fn text(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
}

fn measure(field: &Option<String>) -> Option<f64> {
    text(field).and_then(parse_measure)
}

fn event_date(raw: Option<&str>, event_id: &str) -> Option<NaiveDate> {
    let raw = raw?;
    let date = parse_date(raw, YearAnchor::JAN_1);
    if date.is_none() {
        warn!(event_id, "could not parse date: {}", raw);
    }
    date
}

/// Builds `maritime_incidents_processed`. Rows without both coordinates are
/// dropped.
pub fn incidents_table(bytes: &[u8], audit: &Audit, report: &mut Report) -> Result<OutputTable, EtlError> {
    let text_input = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(text_input.as_bytes());

    let headers = reader
        .headers()
        .map_err(|_| EtlError::EmptyInput(INPUT_FILE.to_string()))?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(EtlError::MissingColumn {
                column: column.to_string(),
                source_tag: INPUT_FILE.to_string(),
            });
        }
    }

    let mut table = OutputTable::new("maritime_incidents_processed", &COLUMNS);
    let mut severity_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut total_injuries = 0.0;
    let mut with_injuries = 0;

    for result in reader.deserialize::<IncidentRow>() {
        report.rows_read += 1;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                report.drop_record("unreadable row", e);
                continue;
            }
        };

        let (Some(latitude), Some(longitude)) = (measure(&row.latitude), measure(&row.longitude))
        else {
            report.drop_silently("missing coordinates");
            continue;
        };

        let event_id = text(&row.event_id).unwrap_or_default();
        let date = event_date(text(&row.event_date), event_id);
        let injured = measure(&row.injured_persons);
        let year_of_build = measure(&row.year_of_build);
        let vessel_age = date
            .zip(year_of_build)
            .map(|(d, built)| d.year() as f64 - built);

        let severity = incident_severity(
            text(&row.what_happened).unwrap_or_default(),
            injured,
            text(&row.brief_description).unwrap_or_default(),
        );
        *severity_counts.entry(severity).or_insert(0) += 1;
        if let Some(n) = injured {
            total_injuries += n;
            if n > 0.0 {
                with_injuries += 1;
            }
        }

        table.push(vec![
            Value::from(text(&row.event_id)),
            Value::from(text(&row.event_date)),
            Value::from(date),
            Value::from(date.map(|d| d.year())),
            Value::from(date.map(|d| d.month())),
            Value::from(date.map(quarter_of)),
            Value::from(text(&row.brief_description)),
            Value::from(text(&row.what_happened)),
            Value::from(severity),
            Value::from(text(&row.event_location)),
            Value::from(latitude),
            Value::from(longitude),
            Value::from(text(&row.nz_region)),
            Value::from(text(&row.where_happened)),
            Value::from(text(&row.sector)),
            Value::from(injured),
            Value::from(text(&row.vessel_type)),
            Value::from(text(&row.safety_system)),
            Value::from(text(&row.country_flag)),
            Value::from(measure(&row.gross_tonnage)),
            Value::from(measure(&row.length_overall)),
            Value::from(year_of_build),
            Value::from(vessel_age),
        ]);
    }
    report.records_emitted += table.len();

    info!(incidents = table.len(), "processed maritime incidents");
    for (severity, count) in &severity_counts {
        info!(severity, count, "severity breakdown");
    }
    info!(total_injuries, incidents = with_injuries, "injuries");

    Ok(table.with_audit(audit))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    const HEADER: &str = "Event ID,Event Date,Brief Description,What happened,Event Location,\
                          Latitude,Longitude,NZ Region,Where Happened,Sector,\
                          Number of Injured Persons,Vessel Type,Safety System,Country Flag,\
                          Gross Tonnage,Length Overall,Year of Build";

    fn audit() -> Audit {
        Audit::new(DATA_SOURCE, NaiveDateTime::default()).url(SOURCE_URL)
    }

    fn csv(rows: &[&str]) -> String {
        let mut out = HEADER.to_string();
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out.push('\n');
        out
    }

    #[test]
    fn should_derive_incident_fields() {
        let input = csv(&[
            "101,5/11/2019, Vessel sank at mooring ,Vessel foundered,Lyttelton,-43.6,172.7,Canterbury,Port,Commercial,0,Fishing,MOSS,NZ,45,18.5,1990",
        ]);
        let mut report = Report::new("test");

        let table = incidents_table(input.as_bytes(), &audit(), &mut report).unwrap();

        assert_eq!(table.columns.len(), 26);
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "event_id"), Some(&Value::from("101")));
        assert_eq!(
            table.value(0, "event_date"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2019, 11, 5).unwrap()))
        );
        assert_eq!(table.value(0, "event_quarter"), Some(&Value::Int(4)));
        assert_eq!(table.value(0, "incident_severity"), Some(&Value::from("Critical")));
        assert_eq!(
            table.value(0, "brief_description"),
            Some(&Value::from("Vessel sank at mooring"))
        );
        assert_eq!(table.value(0, "latitude_decimal"), Some(&Value::Float(-43.6)));
        assert_eq!(table.value(0, "vessel_age_at_incident"), Some(&Value::Float(29.0)));
        assert_eq!(table.value(0, "source_url"), Some(&Value::from(SOURCE_URL)));
    }

    #[test]
    fn should_drop_rows_without_coordinates() {
        let input = csv(&[
            "1,1/1/2020,,Collision,,NULL,174.8,,,,,,,,,,",
            "2,1/1/2020,,Contact with wharf,,-41.3,174.8,,,,2,,,,,,",
        ]);
        let mut report = Report::new("test");

        let table = incidents_table(input.as_bytes(), &audit(), &mut report).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "incident_severity"), Some(&Value::from("Major")));
        assert_eq!(table.value(0, "injured_persons"), Some(&Value::Float(2.0)));
        assert_eq!(table.value(0, "year_of_build"), Some(&Value::Null));
        assert_eq!(report.dropped("missing coordinates"), 1);
    }

    #[test]
    fn should_keep_rows_with_unparseable_dates() {
        let input = csv(&["3,sometime,,Near miss,,-36.8,174.7,,,,0,,,,,,2000"]);
        let mut report = Report::new("test");

        let table = incidents_table(input.as_bytes(), &audit(), &mut report).unwrap();

        assert_eq!(table.value(0, "event_date"), Some(&Value::Null));
        assert_eq!(table.value(0, "event_date_original"), Some(&Value::from("sometime")));
        assert_eq!(table.value(0, "vessel_age_at_incident"), Some(&Value::Null));
        assert_eq!(table.value(0, "incident_severity"), Some(&Value::from("Moderate")));
    }

    #[test]
    fn should_reject_missing_required_columns() {
        let mut report = Report::new("test");
        let result = incidents_table(b"Event ID,Event Date\n1,1/1/2020\n", &audit(), &mut report);
        assert!(matches!(result, Err(EtlError::MissingColumn { .. })));
    }
}
