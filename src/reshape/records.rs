//! Long-format records produced by the reshape pipeline.

use chrono::{NaiveDate, NaiveDateTime};

/// One (entity, period, category) observation.
///
/// `entity_id + period + category` is the natural key within one source batch.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub entity_id: String,
    pub period: Option<NaiveDate>,
    /// `Daily`, `Monthly`, `Quarterly` or `Annual`.
    pub period_kind: &'static str,
    pub category: String,
    pub value: Option<f64>,
    pub source_tag: String,
    pub load_timestamp: NaiveDateTime,
}

impl NormalizedRecord {
    pub fn key(&self) -> (&str, Option<NaiveDate>, &str) {
        (&self.entity_id, self.period, &self.category)
    }
}
