//! SQL statement generation.
//!
//! All identifiers are double-quoted, so table and column names are taken verbatim from file
//! names and headers (case and spaces included).

use crate::types::ColumnTypeMap;

/// Quote an identifier, doubling any embedded `"`.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` for the inferred columns, one column per line in map order.
///
/// No keys, indexes or constraints are emitted.
pub fn create_table_sql(table: &str, types: &ColumnTypeMap) -> String {
    let columns = types
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.as_sql()))
        .collect::<Vec<_>>()
        .join(",\n  ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n);",
        quote_ident(table),
        columns
    )
}

/// Parameterized single-row insert that silently drops rows colliding on a unique constraint.
pub fn insert_sql<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({names}) VALUES ({placeholders}) ON CONFLICT DO NOTHING",
        quote_ident(table)
    )
}

pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_ident(table))
}

pub fn select_all_sql(table: &str) -> String {
    format!("SELECT * FROM {}", quote_ident(table))
}

#[cfg(test)]
mod tests {
    use super::{count_sql, create_table_sql, insert_sql, quote_ident};
    use crate::types::{ColumnType, ColumnTypeMap};

    #[test]
    fn create_table_lists_columns_in_map_order() {
        let types: ColumnTypeMap = [
            ("id", ColumnType::Int),
            ("title", ColumnType::Text),
            ("release_date", ColumnType::Date),
            ("score", ColumnType::Float),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            create_table_sql("tracks", &types),
            "CREATE TABLE IF NOT EXISTS \"tracks\" (\n  \"id\" INT,\n  \"title\" TEXT,\n  \"release_date\" DATE,\n  \"score\" FLOAT\n);"
        );
    }

    #[test]
    fn insert_uses_numbered_placeholders() {
        assert_eq!(
            insert_sql("t", &["a", "b c"]),
            "INSERT INTO \"t\" (\"a\", \"b c\") VALUES ($1, $2) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn identifiers_escape_quotes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(count_sql("t"), "SELECT COUNT(*) FROM \"t\"");
    }
}
