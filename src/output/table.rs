//! Output tables: fixed column order plus trailing audit columns.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders the value as a CSV field; null is the empty string.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(_) => String::new(),
            Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::DateTime(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Provenance appended to every row of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Audit {
    pub data_source: String,
    pub source_url: Option<String>,
    pub load_timestamp: NaiveDateTime,
}

impl Audit {
    pub fn new(data_source: &str, load_timestamp: NaiveDateTime) -> Self {
        Audit {
            data_source: data_source.to_string(),
            source_url: None,
            load_timestamp,
        }
    }

    pub fn url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl OutputTable {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        OutputTable {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_columns(name: &str, columns: Vec<String>) -> Self {
        OutputTable {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row; short rows are padded with nulls, long rows truncated.
    pub fn push(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Appends `data_source`, `source_url` (when known) and `load_timestamp`.
    pub fn with_audit(mut self, audit: &Audit) -> Self {
        self.columns.push("data_source".to_string());
        if audit.source_url.is_some() {
            self.columns.push("source_url".to_string());
        }
        self.columns.push("load_timestamp".to_string());

        for row in &mut self.rows {
            row.push(Value::Text(audit.data_source.clone()));
            if let Some(url) = &audit.source_url {
                row.push(Value::Text(url.clone()));
            }
            row.push(Value::DateTime(audit.load_timestamp));
        }

        self
    }

    /// Reads a CSV written by [`super::csv::write_csv`]. Every field comes back as
    /// text; empty fields are null.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let columns = reader
            .headers()
            .context("failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut table = OutputTable::from_columns(&name, columns);
        for record in reader.records() {
            let record = record.context("failed to read CSV record")?;
            table.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            Value::Null
                        } else {
                            Value::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }

        Ok(table)
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 3)
            .unwrap()
            .and_hms_opt(6, 26, 9)
            .unwrap()
    }

    #[test]
    fn should_render_values() {
        assert_eq!(Value::Null.render(), "");
        assert_eq!(Value::Float(1234.5).render(), "1234.5");
        assert_eq!(Value::Float(f64::NAN).render(), "");
        assert_eq!(Value::Int(-3).render(), "-3");
        assert_eq!(Value::Bool(true).render(), "True");
        assert_eq!(Value::from(NaiveDate::from_ymd_opt(2024, 3, 1)).render(), "2024-03-01");
        assert_eq!(Value::from(timestamp()).render(), "2025-08-03 06:26:09");
        assert_eq!(Value::from(None::<f64>), Value::Null);
    }

    #[test]
    fn should_append_audit_columns() {
        let mut table = OutputTable::new("t", &["a", "b"]);
        table.push(vec![Value::Int(1)]);

        let audit = Audit::new("Maritime NZ", timestamp()).url("https://example.test/data.csv");
        let table = table.with_audit(&audit);

        assert_eq!(
            table.columns,
            vec!["a", "b", "data_source", "source_url", "load_timestamp"]
        );
        assert_eq!(table.rows[0][1], Value::Null);
        assert_eq!(table.value(0, "data_source"), Some(&Value::from("Maritime NZ")));
        assert_eq!(table.value(0, "load_timestamp"), Some(&Value::DateTime(timestamp())));
    }

    #[test]
    fn should_omit_unknown_source_url() {
        let table = OutputTable::new("t", &["a"]).with_audit(&Audit::new("Stats NZ", timestamp()));
        assert_eq!(table.columns, vec!["a", "data_source", "load_timestamp"]);
    }
}
