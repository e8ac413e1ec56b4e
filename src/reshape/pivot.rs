//! Long to wide pivot with "first" conflict resolution.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::records::NormalizedRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub entity_id: String,
    pub period: Option<NaiveDate>,
    pub period_kind: &'static str,
    pub source_tag: String,
    values: BTreeMap<String, f64>,
}

impl PivotRow {
    pub fn get(&self, category: &str) -> Option<f64> {
        self.values.get(category).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pivot {
    /// Every category seen, alphabetical.
    pub categories: Vec<String>,
    /// Ordered by (period, entity_id).
    pub rows: Vec<PivotRow>,
}

/// Pivots records into one row per (entity_id, period, source_tag).
///
/// The first non-null value seen for a (row, category) pair is kept; later
/// duplicates are ignored, never summed.
pub fn pivot_first(records: &[NormalizedRecord]) -> Pivot {
    let mut rows: BTreeMap<(Option<NaiveDate>, String, String), PivotRow> = BTreeMap::new();
    let mut categories = BTreeSet::new();

    for record in records {
        categories.insert(record.category.clone());

        let key = (
            record.period,
            record.entity_id.clone(),
            record.source_tag.clone(),
        );
        let row = rows.entry(key).or_insert_with(|| PivotRow {
            entity_id: record.entity_id.clone(),
            period: record.period,
            period_kind: record.period_kind,
            source_tag: record.source_tag.clone(),
            values: BTreeMap::new(),
        });

        if let Some(value) = record.value {
            row.values.entry(record.category.clone()).or_insert(value);
        }
    }

    Pivot {
        categories: categories.into_iter().collect(),
        rows: rows.into_values().collect(),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn record(entity: &str, month: u32, category: &str, value: Option<f64>) -> NormalizedRecord {
        NormalizedRecord {
            entity_id: entity.to_string(),
            period: NaiveDate::from_ymd_opt(2024, month, 1),
            period_kind: "Monthly",
            category: category.to_string(),
            value,
            source_tag: "ACS348801".to_string(),
            load_timestamp: NaiveDateTime::default(),
        }
    }

    #[test]
    fn should_keep_first_value_for_duplicates() {
        let records = vec![
            record("Otago", 1, "Total", Some(10.0)),
            record("Otago", 1, "Total", Some(99.0)),
        ];

        let pivot = pivot_first(&records);

        assert_eq!(pivot.rows.len(), 1);
        assert_eq!(pivot.rows[0].get("Total"), Some(10.0));
    }

    #[test]
    fn should_skip_leading_nulls() {
        let records = vec![
            record("Otago", 1, "Total", None),
            record("Otago", 1, "Total", Some(5.0)),
        ];

        assert_eq!(pivot_first(&records).rows[0].get("Total"), Some(5.0));
    }

    #[test]
    fn should_order_rows_and_categories() {
        let records = vec![
            record("Otago", 2, "Total", Some(1.0)),
            record("Otago", 1, "Rate", Some(2.0)),
            record("Auckland", 1, "Total", Some(3.0)),
        ];

        let pivot = pivot_first(&records);

        assert_eq!(pivot.categories, vec!["Rate", "Total"]);
        let order: Vec<(&str, Option<NaiveDate>)> = pivot
            .rows
            .iter()
            .map(|r| (r.entity_id.as_str(), r.period))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Auckland", NaiveDate::from_ymd_opt(2024, 1, 1)),
                ("Otago", NaiveDate::from_ymd_opt(2024, 1, 1)),
                ("Otago", NaiveDate::from_ymd_opt(2024, 2, 1)),
            ]
        );
        assert_eq!(pivot.rows[1].get("Total"), None);
    }
}
