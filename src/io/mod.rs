pub mod document;
pub mod table;
pub mod value;

pub use document::{Block, BlockEntry, CifDocument};
pub use table::LoopTable;
pub use value::{parse_value, ParsedValue, Value};

use thiserror::Error;

/// Fatal CIF grammar, lookup, and shape errors.
#[derive(Debug, Error)]
pub enum CifError {
    #[error("Cannot parse line {index}: '{content}'")]
    MalformedLine { index: usize, content: String },

    #[error("Multiline value opened at line {start} is never closed")]
    UnterminatedMultiline { start: usize },

    #[error("Loop '{name}': {values} data values cannot fill {columns} columns evenly")]
    LoopShape { name: String, columns: usize, values: usize },

    #[error("Loop '{name}' has no data values")]
    EmptyLoop { name: String },

    #[error("Cannot derive a loop name: prefixes '{first}' and '{second}' have equal support")]
    AmbiguousLoopName { first: String, second: String },

    #[error("Two loops in one block resolve to the name '{name}'")]
    LoopNameCollision { name: String },

    #[error("Block '{block}' has none of the keys {tried:?}")]
    MissingKeys { block: String, tried: Vec<String> },

    #[error("Loop '{name}' has none of the columns {tried:?}")]
    MissingColumn { name: String, tried: Vec<String> },

    #[error("Loop '{name}' row {row} out of range ({rows} rows)")]
    RowOutOfRange { name: String, row: usize, rows: usize },

    #[error("Expected a numeric value for '{tag}', got '{got}'")]
    NotNumeric { tag: String, got: String },
}
