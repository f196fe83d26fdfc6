//! Value preparation ahead of insertion: partial-date repair and null coercion.

use crate::types::{ColumnType, ColumnTypeMap, Value};

/// Columns that get [`repair_date`] applied unless configured otherwise.
pub const DEFAULT_DATE_REPAIR_COLUMNS: &[&str] = &["release_date"];

/// How [`sanitize`] finds the type of the value at a given position.
///
/// When the type map was inferred from the same header the two strategies agree. They differ
/// only when a caller hands in a type map whose column order differs from the row's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeLookup {
    /// Look up the row's own column name at that position.
    #[default]
    ByColumnName,
    /// Use whichever column sits at the same position in the type map. Kept for compatibility
    /// with loaders that relied on the two orders coinciding.
    ByTypeMapPosition,
}

/// Complete a partial `YYYY` or `YYYY-MM` date to a full `YYYY-MM-DD`.
///
/// Empty or missing input yields `None`. Values with three or more `-`-separated parts are
/// returned unchanged; nothing else is validated.
pub fn repair_date(raw: Option<&str>) -> Option<String> {
    let raw = raw.filter(|s| !s.is_empty())?;
    let repaired = match raw.split('-').count() {
        1 => format!("{raw}-01-01"),
        2 => format!("{raw}-01"),
        _ => raw.to_owned(),
    };
    Some(repaired)
}

/// Coerce empty or missing values in numeric columns to `NULL`.
///
/// The output is positionally aligned with `values`. Everything that is not an empty numeric
/// value passes through untouched, so an empty string in a `TEXT` column stays `""`.
pub fn sanitize(
    columns: &[String],
    values: &[Option<String>],
    types: &ColumnTypeMap,
    lookup: TypeLookup,
) -> Vec<Value> {
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            let blank = value.as_deref().is_none_or(str::is_empty);
            let numeric = type_at(idx, columns, types, lookup).is_some_and(|t| t.is_numeric());
            if blank && numeric {
                Value::Null
            } else {
                Value::from(value.clone())
            }
        })
        .collect()
}

fn type_at(
    idx: usize,
    columns: &[String],
    types: &ColumnTypeMap,
    lookup: TypeLookup,
) -> Option<ColumnType> {
    match lookup {
        TypeLookup::ByColumnName => columns.get(idx).and_then(|name| types.get(name)),
        TypeLookup::ByTypeMapPosition => types.column_at(idx).map(|c| c.column_type),
    }
}

/// Turns raw rows into insert parameters for one table.
#[derive(Debug, Clone)]
pub struct RowSanitizer<'a> {
    types: &'a ColumnTypeMap,
    lookup: TypeLookup,
    date_columns: &'a [String],
}

impl<'a> RowSanitizer<'a> {
    pub fn new(types: &'a ColumnTypeMap, lookup: TypeLookup, date_columns: &'a [String]) -> Self {
        Self {
            types,
            lookup,
            date_columns,
        }
    }

    /// Repair dates in the configured columns, then [`sanitize`].
    pub fn prepare_row(&self, columns: &[String], row: &[Option<String>]) -> Vec<Value> {
        let repaired: Vec<Option<String>> = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let raw = row.get(idx).cloned().flatten();
                if self.repairs_dates_in(column) {
                    repair_date(raw.as_deref())
                } else {
                    raw
                }
            })
            .collect();

        sanitize(columns, &repaired, self.types, self.lookup)
    }

    fn repairs_dates_in(&self, column: &str) -> bool {
        self.date_columns.iter().any(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::{repair_date, sanitize, RowSanitizer, TypeLookup};
    use crate::types::{ColumnType, ColumnTypeMap, Value};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|s| Some(s.to_string())).collect()
    }

    #[test]
    fn repairs_partial_dates() {
        assert_eq!(repair_date(Some("1956")).as_deref(), Some("1956-01-01"));
        assert_eq!(repair_date(Some("1956-03")).as_deref(), Some("1956-03-01"));
        assert_eq!(repair_date(Some("1956-03-15")).as_deref(), Some("1956-03-15"));
        assert_eq!(repair_date(Some("")), None);
        assert_eq!(repair_date(None), None);
    }

    #[test]
    fn malformed_dates_with_many_parts_pass_through() {
        assert_eq!(repair_date(Some("a-b-c-d")).as_deref(), Some("a-b-c-d"));
    }

    #[test]
    fn empty_numeric_becomes_null_but_empty_text_stays() {
        let types: ColumnTypeMap = [("n", ColumnType::Int), ("f", ColumnType::Float), ("t", ColumnType::Text)]
            .into_iter()
            .collect();
        let out = sanitize(
            &strings(&["n", "f", "t"]),
            &cells(&["", "", ""]),
            &types,
            TypeLookup::ByColumnName,
        );
        assert_eq!(out, vec![Value::Null, Value::Null, Value::Utf8(String::new())]);
    }

    #[test]
    fn non_empty_values_pass_through_unchanged() {
        let types: ColumnTypeMap = [("n", ColumnType::Int)].into_iter().collect();
        let out = sanitize(&strings(&["n"]), &cells(&[" 12 "]), &types, TypeLookup::ByColumnName);
        assert_eq!(out, vec![Value::Utf8(" 12 ".to_string())]);
    }

    #[test]
    fn positional_lookup_follows_type_map_order() {
        // Type map order differs from the row's column order.
        let types: ColumnTypeMap = [("count", ColumnType::Int), ("label", ColumnType::Text)]
            .into_iter()
            .collect();
        let columns = strings(&["label", "count"]);
        let values = cells(&["", ""]);

        let by_name = sanitize(&columns, &values, &types, TypeLookup::ByColumnName);
        assert_eq!(by_name, vec![Value::Utf8(String::new()), Value::Null]);

        let by_position = sanitize(&columns, &values, &types, TypeLookup::ByTypeMapPosition);
        assert_eq!(by_position, vec![Value::Null, Value::Utf8(String::new())]);
    }

    #[test]
    fn prepare_row_repairs_only_configured_columns() {
        let types: ColumnTypeMap = [
            ("id", ColumnType::Int),
            ("release_date", ColumnType::Date),
            ("year", ColumnType::Int),
        ]
        .into_iter()
        .collect();
        let date_columns = strings(&["release_date"]);
        let sanitizer = RowSanitizer::new(&types, TypeLookup::ByColumnName, &date_columns);
        let columns = strings(&["id", "release_date", "year"]);

        let out = sanitizer.prepare_row(&columns, &cells(&["1", "2000-05", "2000"]));
        assert_eq!(
            out,
            vec![
                Value::Utf8("1".into()),
                Value::Utf8("2000-05-01".into()),
                Value::Utf8("2000".into()),
            ]
        );

        let out = sanitizer.prepare_row(&columns, &[Some("2".into()), Some(String::new()), None]);
        assert_eq!(out, vec![Value::Utf8("2".into()), Value::Null, Value::Null]);
    }
}
