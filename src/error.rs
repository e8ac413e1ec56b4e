//! Structural failures that abort a single source.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("sheet `{sheet}` not found (available: {available})")]
    SheetNotFound { sheet: String, available: String },
    #[error("no header row found for {source_tag}")]
    HeaderNotFound { source_tag: String },
    #[error("column `{column}` missing from {source_tag}")]
    MissingColumn { column: String, source_tag: String },
    #[error("{0} contains no data")]
    EmptyInput(String),
    #[error("failed to read workbook: {0}")]
    Workbook(String),
    #[error("invalid geometry: {0}")]
    Geometry(String),
    #[error("invalid RSS feed: {0}")]
    Feed(String),
}
