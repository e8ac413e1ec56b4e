//! Year-over-year change for quarterly series.

use std::collections::HashMap;

use crate::reading::coerce::round_to;

/// Periods back, within one quarter-number group, that a value is compared to.
pub const QUARTER_LAG: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuarterValue {
    pub year: i32,
    pub quarter: u32,
    pub value: f64,
}

/// Percent change per quarter number, aligned with `series`.
///
/// `series` must already be sorted by (year, quarter). Values are grouped by
/// quarter number and compared with the value [`QUARTER_LAG`] places earlier in
/// the same group. The result is rounded to 4 places; it is `None` for the
/// first entries of each group and when the base value is zero.
pub fn year_over_year(series: &[QuarterValue]) -> Vec<Option<f64>> {
    let mut seen: HashMap<u32, Vec<f64>> = HashMap::new();

    series
        .iter()
        .map(|point| {
            let group = seen.entry(point.quarter).or_default();
            let change = group
                .len()
                .checked_sub(QUARTER_LAG)
                .map(|i| group[i])
                .filter(|base| *base != 0.0)
                .map(|base| round_to((point.value / base - 1.0) * 100.0, 4));
            group.push(point.value);
            change
        })
        .collect()
}

// -- Tests -------------------------------------------------------------------
