//! Save an output table to a parquet file.
//!
//! Column types are inferred from the values: a column whose non-null values are
//! all integers becomes Int64, integers mixed with floats become Float64, and so
//! on. Anything mixed beyond that, and timestamps, are written as Utf8 text.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};

use super::table::{OutputTable, Value};

fn infer_type(table: &OutputTable, column: usize) -> DataType {
    let mut inferred: Option<DataType> = None;

    for value in table.rows.iter().filter_map(|r| r.get(column)) {
        let this = match value {
            Value::Null => continue,
            Value::Int(_) => DataType::Int64,
            Value::Float(_) => DataType::Float64,
            Value::Bool(_) => DataType::Boolean,
            Value::Date(_) => DataType::Date32,
            Value::Text(_) | Value::DateTime(_) => DataType::Utf8,
        };
        inferred = Some(match (inferred, this) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int64), DataType::Float64) | (Some(DataType::Float64), DataType::Int64) => {
                DataType::Float64
            }
            _ => return DataType::Utf8,
        });
    }

    inferred.unwrap_or(DataType::Utf8)
}

fn days_since_epoch(date: &NaiveDate) -> i32 {
    date.signed_duration_since(NaiveDate::default()).num_days() as i32
}

fn build_array(table: &OutputTable, column: usize, data_type: &DataType) -> ArrayRef {
    let values = table
        .rows
        .iter()
        .map(|r| r.get(column).unwrap_or(&Value::Null));

    match data_type {
        DataType::Int64 => Arc::new(Int64Array::from(
            values
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Float64 => Arc::new(Float64Array::from(
            values.map(Value::as_f64).collect::<Vec<_>>(),
        )),
        DataType::Boolean => Arc::new(BooleanArray::from(
            values
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Date32 => Arc::new(Date32Array::from(
            values
                .map(|v| match v {
                    Value::Date(d) => Some(days_since_epoch(d)),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            values
                .map(|v| (!v.is_null()).then(|| v.render()))
                .collect::<Vec<_>>(),
        )),
    }
}

pub fn write_parquet(table: &OutputTable, path: &Path) -> Result<()> {
    let file = File::create(path)?;

    let types: Vec<DataType> = (0..table.columns.len())
        .map(|c| infer_type(table, c))
        .collect();

    let schema = Arc::new(Schema::new(
        table
            .columns
            .iter()
            .zip(&types)
            .map(|(name, data_type)| Field::new(name, data_type.clone(), true))
            .collect::<Vec<_>>(),
    ));

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let columns: Vec<ArrayRef> = types
        .iter()
        .enumerate()
        .map(|(c, data_type)| build_array(table, c, data_type))
        .collect();

    let batch = RecordBatch::try_new(schema, columns)?;

    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
