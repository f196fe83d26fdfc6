//! Core data model types for loading.
//!
//! Source files are read into a [`RowSet`] (header + raw string cells). Type inference turns a
//! row set into a [`ColumnTypeMap`], and sanitization turns each row into [`Value`]s ready to be
//! bound as statement parameters. Query results come back as a [`QueryResult`].

use std::fmt;

use serde::Serialize;

/// SQL column type assigned by inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    /// Free text (also the fallback for empty values).
    Text,
    /// Whole number.
    Int,
    /// Number with a decimal point or a fractional value.
    Float,
    /// Calendar date.
    Date,
}

impl ColumnType {
    /// The type name as it appears in generated DDL.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::Date => "DATE",
        }
    }

    /// True for `INT` and `FLOAT`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A single named, typed column in a [`ColumnTypeMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Column name, taken verbatim from the source header.
    pub name: String,
    /// Inferred type.
    pub column_type: ColumnType,
}

impl Column {
    /// Create a new column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered mapping from column name to inferred type.
///
/// Iteration follows first-insertion order. Setting a column that is already present overwrites
/// its type in place, so the position of a column never moves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnTypeMap {
    columns: Vec<Column>,
}

impl ColumnTypeMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the type of `name`, appending the column if it is not present yet.
    pub fn set(&mut self, name: &str, column_type: ColumnType) {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.column_type = column_type,
            None => self.columns.push(Column::new(name, column_type)),
        }
    }

    /// Type of the named column, if present.
    pub fn get(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    /// Column at a position in insertion order.
    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Iterate columns in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Iterate column names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, ColumnType)> for ColumnTypeMap {
    fn from_iter<I: IntoIterator<Item = (S, ColumnType)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, column_type) in iter {
            let name = name.into();
            map.set(&name, column_type);
        }
        map
    }
}

/// Raw rows read from a delimited source file.
///
/// Every row is aligned to `columns`. A `None` cell means the row ended before that column;
/// `Some("")` is an empty field that was present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    /// Header names in source order.
    pub columns: Vec<String>,
    /// Row-major raw cells.
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowSet {
    /// Create a row set from a header and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// Convenience constructor for tests and callers holding plain string cells.
    pub fn from_strings<C, R, V>(columns: C, rows: R) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator<Item = V>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|v| Some(v.into())).collect())
                .collect(),
        }
    }

    /// Number of data rows (the header is not counted).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A copy holding only the first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Iterate the `(column, cell)` pairs of one row in column order.
    pub fn cells<'a>(
        &'a self,
        row: &'a [Option<String>],
    ) -> impl Iterator<Item = (&'a str, Option<&'a str>)> + 'a {
        self.columns
            .iter()
            .enumerate()
            .map(move |(idx, name)| (name.as_str(), row.get(idx).and_then(|v| v.as_deref())))
    }
}

/// A single value bound to, or read from, the relational store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text rendering used when writing CSV; `Null` renders as an empty field.
    pub fn to_field(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int64(v) => v.to_string(),
            Self::Float64(v) => v.to_string(),
            Self::Utf8(s) => s.clone(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Utf8(s.to_owned())
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map(Self::Utf8).unwrap_or(Self::Null)
    }
}

/// Rows returned by [`crate::store::RelationalStore::query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Result column names in select order.
    pub columns: Vec<String>,
    /// Row-major values.
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First column of the first row, if any.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}
