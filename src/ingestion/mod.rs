//! Reading source files.
//!
//! - [`separator`]: sniffs the field delimiter from a file's first lines
//! - [`csv`]: reads every row of a file with a known delimiter into a [`crate::types::RowSet`]

pub mod csv;
pub mod separator;

pub use self::csv::{read_rows, read_rows_from_reader, reader_builder};
pub use separator::{detect_separator, detect_separator_from_reader, separator_for_text, Separator};
