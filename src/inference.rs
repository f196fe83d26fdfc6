//! Column type inference.
//!
//! Every cell is classified on its own and the classification of the **last** row processed is
//! what ends up in the [`ColumnTypeMap`]. There is no voting across rows: a column whose final
//! value is blank is `TEXT` even if every earlier value was numeric. Callers that care about
//! stable types should pass rows in a meaningful order.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::types::{ColumnType, ColumnTypeMap, RowSet};

/// Which rows the pipeline feeds to inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceScope {
    /// Every row of the file.
    #[default]
    AllRows,
    /// Only the first `n` rows.
    Sample(usize),
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%a %b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Infer a type for every column of `rows`, processing rows in order.
///
/// Columns keep header order. A row set without rows yields an empty map.
pub fn infer_column_types(rows: &RowSet) -> ColumnTypeMap {
    let mut types = ColumnTypeMap::new();
    for row in &rows.rows {
        for (column, raw) in rows.cells(row) {
            types.set(column, infer_value_type(raw));
        }
    }
    types
}

/// Infer types from the rows selected by `scope`.
pub fn infer_with_scope(rows: &RowSet, scope: InferenceScope) -> ColumnTypeMap {
    match scope {
        InferenceScope::AllRows => infer_column_types(rows),
        InferenceScope::Sample(n) => infer_column_types(&rows.head(n)),
    }
}

/// Classify one raw cell.
///
/// - empty or missing: `TEXT`
/// - finite number: `FLOAT` if it contains `.` or is not whole, else `INT`
/// - calendar date (full, `YYYY-MM`, or a common written form): `DATE`
/// - anything else: `TEXT`
pub fn infer_value_type(raw: Option<&str>) -> ColumnType {
    let value = match raw.map(str::trim) {
        None | Some("") => return ColumnType::Text,
        Some(v) => v,
    };

    if let Some(number) = parse_number(value) {
        return if value.contains('.') || number.fract() != 0.0 {
            ColumnType::Float
        } else {
            ColumnType::Int
        };
    }

    if is_date(value) {
        return ColumnType::Date;
    }

    ColumnType::Text
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// True when `value` reads as a calendar date.
pub fn is_date(value: &str) -> bool {
    if DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
    {
        return true;
    }

    // Year-month only; the day is irrelevant to validity.
    if NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").is_ok() {
        return true;
    }

    if DATETIME_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
    {
        return true;
    }

    DateTime::parse_from_rfc3339(value).is_ok() || DateTime::parse_from_rfc2822(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::{infer_column_types, infer_value_type, infer_with_scope, InferenceScope};
    use crate::types::{ColumnType, RowSet};

    #[test]
    fn classifies_single_values() {
        assert_eq!(infer_value_type(Some("42")), ColumnType::Int);
        assert_eq!(infer_value_type(Some(" -7 ")), ColumnType::Int);
        assert_eq!(infer_value_type(Some("1e3")), ColumnType::Int);
        assert_eq!(infer_value_type(Some("1.0")), ColumnType::Float);
        assert_eq!(infer_value_type(Some("1e-3")), ColumnType::Float);
        assert_eq!(infer_value_type(Some("2021-04-05")), ColumnType::Date);
        assert_eq!(infer_value_type(Some("2021-04")), ColumnType::Date);
        assert_eq!(infer_value_type(Some("2021-04-05T10:00:00Z")), ColumnType::Date);
        assert_eq!(infer_value_type(Some("Mar 15, 1999")), ColumnType::Date);
        assert_eq!(infer_value_type(Some("hello")), ColumnType::Text);
        assert_eq!(infer_value_type(Some("NaN")), ColumnType::Text);
        assert_eq!(infer_value_type(Some("   ")), ColumnType::Text);
        assert_eq!(infer_value_type(None), ColumnType::Text);
    }

    #[test]
    fn year_alone_is_a_number_not_a_date() {
        assert_eq!(infer_value_type(Some("1999")), ColumnType::Int);
    }

    #[test]
    fn last_row_wins() {
        let rows = RowSet::from_strings(["a"], [["1"], ["1.5"], ["x"]]);
        let types = infer_column_types(&rows);
        assert_eq!(types.get("a"), Some(ColumnType::Text));

        let rows = RowSet::from_strings(["a"], [["x"], ["1.5"], ["1"]]);
        assert_eq!(infer_column_types(&rows).get("a"), Some(ColumnType::Int));
    }

    #[test]
    fn trailing_blank_overrides_numeric_history() {
        let rows = RowSet::from_strings(["n"], [["1"], ["2"], [""]]);
        assert_eq!(infer_column_types(&rows).get("n"), Some(ColumnType::Text));
    }

    #[test]
    fn every_header_column_gets_exactly_one_entry() {
        let rows = RowSet::new(
            vec!["a".into(), "b".into()],
            vec![vec![Some("1".into())], vec![Some("2".into())]],
        );
        let types = infer_column_types(&rows);
        assert_eq!(types.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(types.get("b"), Some(ColumnType::Text));
    }

    #[test]
    fn no_rows_means_no_columns() {
        let rows = RowSet::new(vec!["a".into()], Vec::new());
        assert!(infer_column_types(&rows).is_empty());
    }

    #[test]
    fn sample_scope_only_looks_at_leading_rows() {
        let rows = RowSet::from_strings(["a"], [["1"], ["2"], ["oops"]]);
        let types = infer_with_scope(&rows, InferenceScope::Sample(2));
        assert_eq!(types.get("a"), Some(ColumnType::Int));
    }
}
