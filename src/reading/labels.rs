//! Label extraction for two-row (merged cell) headers.

use super::grid::Cell;

/// Primary label used for columns that precede every non-blank primary cell.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLabel {
    pub primary: String,
    pub secondary: String,
    pub column_index: usize,
}

/// Pairs each column of two parallel header rows.
///
/// A blank primary cell inherits the last non-blank primary to its left, or
/// [`UNKNOWN_LABEL`] when there is none. Columns whose secondary cell is blank are
/// left out, even if they carry a primary label (that label is still carried).
pub fn extract_labels(primary: &[Cell], secondary: &[Cell]) -> Vec<ColumnLabel> {
    let width = primary.len().max(secondary.len());
    let mut current: Option<String> = None;
    let mut labels = Vec::new();

    for column_index in 0..width {
        let top = primary.get(column_index).unwrap_or(&Cell::Empty);
        let bottom = secondary.get(column_index).unwrap_or(&Cell::Empty);

        if !top.is_blank() {
            current = Some(top.as_str().into_owned());
        }
        if bottom.is_blank() {
            continue;
        }

        labels.push(ColumnLabel {
            primary: current.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            secondary: bottom.as_str().into_owned(),
            column_index,
        });
    }

    labels
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::text(v)).collect()
    }

    #[test]
    fn should_carry_primary_forward() {
        let primary = cells(&["", "Auckland", "", "Wellington", ""]);
        let secondary = cells(&["", "Total", "Occupancy", "Total", "Occupancy"]);

        let labels = extract_labels(&primary, &secondary);

        let pairs: Vec<(&str, &str, usize)> = labels
            .iter()
            .map(|l| (l.primary.as_str(), l.secondary.as_str(), l.column_index))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Auckland", "Total", 1),
                ("Auckland", "Occupancy", 2),
                ("Wellington", "Total", 3),
                ("Wellington", "Occupancy", 4),
            ]
        );
    }

    #[test]
    fn should_default_leading_blanks_to_unknown() {
        let primary = cells(&["", "", "Otago"]);
        let secondary = cells(&["Period", "Total", "Total"]);

        let labels = extract_labels(&primary, &secondary);

        assert_eq!(labels[0].primary, UNKNOWN_LABEL);
        assert_eq!(labels[1].primary, UNKNOWN_LABEL);
        assert_eq!(labels[2].primary, "Otago");
    }

    #[test]
    fn should_exclude_blank_secondary_but_keep_carrying() {
        let primary = cells(&["", "Canterbury", "", ""]);
        let secondary = cells(&["", "", "Total", ""]);

        let labels = extract_labels(&primary, &secondary);

        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].primary, "Canterbury");
        assert_eq!(labels[0].column_index, 2);
    }

    #[test]
    fn should_handle_rows_of_different_length() {
        let primary = cells(&["", "Northland"]);
        let secondary = cells(&["", "Total", "Rate"]);

        let labels = extract_labels(&primary, &secondary);

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[1].primary, "Northland");
        assert_eq!(labels[1].secondary, "Rate");
    }
}
