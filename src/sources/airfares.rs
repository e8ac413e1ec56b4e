//! Kaggle "airfares in New Zealand" dataset.
//!
//! Columns are classified by keywords in their snake-cased names, and each class
//! gets its own cleaning: prices to numbers, dates parsed, route ends mapped to
//! city names and airlines title-cased.

use std::collections::BTreeMap;

use chrono::{NaiveTime, Timelike};
use tracing::{debug, info};

use super::snake_case;
use crate::{
    error::EtlError,
    output::{Audit, OutputTable, Value},
    reading::{
        coerce::{clean_numeric, parse_datetime},
        grid::Cell,
        RawGrid,
    },
    report::Report,
    reshape::classify::{Bucket, KeywordClassifier},
};

pub const DATA_SOURCE: &str = "Kaggle - shashwatwork/airfares-in-new-zealand";
pub const INPUT_ZIP: &str = "NZ airfares.csv.zip";
const DESCRIPTION: &str = "New Zealand domestic and international airfares dataset";
const FRESHNESS: &str = "Historical airfare data for tourism analysis";

const COLUMN_BUCKETS: &[Bucket] = &[
    ("price", &["price", "fare", "cost", "amount", "nzd"]),
    ("date", &["date", "time", "year", "month", "day"]),
    (
        "route",
        &["origin", "destination", "route", "from", "to", "departure", "arrival"],
    ),
    ("airline", &["airline", "carrier", "operator"]),
];

const COLUMN_KIND: KeywordClassifier = KeywordClassifier::new(COLUMN_BUCKETS, "text");

const LOCATIONS: [(&str, &str); 20] = [
    ("akl", "Auckland"),
    ("auckland", "Auckland"),
    ("wlg", "Wellington"),
    ("wellington", "Wellington"),
    ("chc", "Christchurch"),
    ("christchurch", "Christchurch"),
    ("dud", "Dunedin"),
    ("dunedin", "Dunedin"),
    ("qtn", "Queenstown"),
    ("queenstown", "Queenstown"),
    ("npm", "New Plymouth"),
    ("new plymouth", "New Plymouth"),
    ("rot", "Rotorua"),
    ("rotorua", "Rotorua"),
    ("tau", "Tauranga"),
    ("tauranga", "Tauranga"),
    ("nsn", "Nelson"),
    ("nelson", "Nelson"),
    ("pmr", "Palmerston North"),
    ("palmerston north", "Palmerston North"),
];

const TIME_FORMATS: [&str; 3] = ["%I:%M %p", "%H:%M", "%H:%M:%S"];

/// Upper-cases the first letter of every run of letters and lower-cases the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Airport codes and city names resolve to the city; anything else is
/// title-cased as is.
pub fn standard_location(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    LOCATIONS
        .iter()
        .find(|(key, _)| *key == lower)
        .map(|(_, city)| city.to_string())
        .unwrap_or_else(|| title_case(&lower))
}

fn date_value(raw: &str) -> Value {
    if let Some(dt) = parse_datetime(raw) {
        return if dt.num_seconds_from_midnight() == 0 {
            Value::Date(dt.date())
        } else {
            Value::DateTime(dt)
        };
    }
    // Departure and arrival times carry no date.
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(raw.trim(), f).ok())
        .map(|t| Value::from(format!("{:02}:{:02}", t.hour(), t.minute())))
        .unwrap_or(Value::Null)
}

fn clean(kind: &str, cell: &Cell) -> Value {
    if cell.is_blank() {
        return Value::Null;
    }
    let raw = cell.as_str();
    match kind {
        "price" => Value::from(clean_numeric(&raw)),
        "date" => match cell {
            Cell::DateTime(dt) => Value::DateTime(*dt),
            _ => date_value(&raw),
        },
        "route" => Value::from(standard_location(&raw)),
        "airline" => Value::from(title_case(raw.trim())),
        _ => Value::from(&*raw),
    }
}

/// Builds `nz_airfares` from the extracted CSV.
pub fn airfares_table(bytes: &[u8], audit: &Audit, report: &mut Report) -> Result<OutputTable, EtlError> {
    let grid = RawGrid::from_csv_bytes(bytes);
    if grid.is_empty() {
        return Err(EtlError::EmptyInput(INPUT_ZIP.to_string()));
    }

    let original: Vec<String> = grid.row(0).iter().map(|c| c.as_str().into_owned()).collect();
    let columns: Vec<String> = original.iter().map(|c| snake_case(c)).collect();
    let kinds: Vec<&'static str> = columns.iter().map(|c| COLUMN_KIND.classify(&[c.as_str()])).collect();
    for ((from, to), kind) in original.iter().zip(&columns).zip(&kinds) {
        debug!(kind, "{} -> {}", from, to);
    }

    let mut names = columns.clone();
    names.extend(["dataset_description", "data_freshness"].map(String::from));
    let mut table = OutputTable::from_columns("nz_airfares", names);

    for row in grid.rows().skip(1) {
        if row.iter().all(Cell::is_blank) {
            report.drop_silently("empty row");
            continue;
        }
        report.rows_read += 1;

        let mut values: Vec<Value> = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| clean(kind, row.get(i).unwrap_or(&Cell::Empty)))
            .collect();
        values.push(Value::from(DESCRIPTION));
        values.push(Value::from(FRESHNESS));
        table.push(values);
    }
    report.records_emitted += table.len();

    summarise(&table, &columns, &kinds);
    Ok(table.with_audit(audit))
}

fn summarise(table: &OutputTable, columns: &[String], kinds: &[&str]) {
    info!(records = table.len(), columns = table.columns.len(), "processed airfares");

    for (i, (column, kind)) in columns.iter().zip(kinds).enumerate() {
        let values = table.rows.iter().map(|r| &r[i]);
        match *kind {
            "price" => {
                let prices: Vec<f64> = values.filter_map(Value::as_f64).collect();
                if prices.is_empty() {
                    continue;
                }
                let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
                let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mean = prices.iter().sum::<f64>() / prices.len() as f64;
                info!(column = %column, min, max, mean, "price range");
            }
            "airline" => {
                let mut counts: BTreeMap<String, usize> = BTreeMap::new();
                for v in values.filter(|v| !v.is_null()) {
                    *counts.entry(v.render()).or_insert(0) += 1;
                }
                let mut top: Vec<_> = counts.into_iter().collect();
                top.sort_by(|a, b| b.1.cmp(&a.1));
                for (airline, flights) in top.into_iter().take(5) {
                    info!(column = %column, airline = %airline, flights, "top airline");
                }
            }
            _ => {}
        }

        let nulls = table.rows.iter().filter(|r| r[i].is_null()).count();
        if !table.is_empty() && nulls * 10 > table.len() {
            info!(column = %column, nulls, "column more than 10% null");
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn audit() -> Audit {
        Audit::new(DATA_SOURCE, NaiveDateTime::default())
    }

    #[test]
    fn should_title_case_words() {
        assert_eq!(title_case("air new ZEALAND"), "Air New Zealand");
        assert_eq!(title_case("jetstar-asia"), "Jetstar-Asia");
    }

    #[test]
    fn should_standardise_locations() {
        assert_eq!(standard_location(" AKL "), "Auckland");
        assert_eq!(standard_location("palmerston north"), "Palmerston North");
        assert_eq!(standard_location("ZQN"), "Zqn");
    }

    #[test]
    fn should_classify_columns_by_name() {
        assert_eq!(COLUMN_KIND.classify(&["airfare_nz"]), "price");
        assert_eq!(COLUMN_KIND.classify(&["travel_date"]), "date");
        assert_eq!(COLUMN_KIND.classify(&["destination"]), "route");
        assert_eq!(COLUMN_KIND.classify(&["airline"]), "airline");
        assert_eq!(COLUMN_KIND.classify(&["baggage"]), "text");
    }

    #[test]
    fn should_clean_airfare_rows() {
        let input = "Travel Date,Origin,Destination,Dep. time,Airline,Airfare(NZ$),Baggage\n\
                     19/09/2019,AKL,chc,6:25 AM,air new zealand,$1 268,Included\n\
                     ,,,,,,\n";
        let mut report = Report::new("test");

        let table = airfares_table(input.as_bytes(), &audit(), &mut report).unwrap();

        assert_eq!(
            table.columns[..7],
            ["travel_date", "origin", "destination", "dep_time", "airline", "airfare_nz", "baggage"]
        );
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(0, "travel_date"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2019, 9, 19).unwrap()))
        );
        assert_eq!(table.value(0, "origin"), Some(&Value::from("Auckland")));
        assert_eq!(table.value(0, "destination"), Some(&Value::from("Christchurch")));
        assert_eq!(table.value(0, "dep_time"), Some(&Value::from("06:25")));
        assert_eq!(table.value(0, "airline"), Some(&Value::from("Air New Zealand")));
        assert_eq!(table.value(0, "airfare_nz"), Some(&Value::Float(1268.0)));
        assert_eq!(table.value(0, "baggage"), Some(&Value::from("Included")));
        assert_eq!(table.value(0, "data_source"), Some(&Value::from(DATA_SOURCE)));
        assert_eq!(report.dropped("empty row"), 1);
    }
}
