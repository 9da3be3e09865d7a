//! Error types for tablesieve.

use thiserror::Error;

use crate::table::Orientation;

/// Configuration errors reported before any page is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("table setting '{name}' cannot be negative (got {value})")]
    NegativeSetting { name: &'static str, value: f64 },

    #[error("table setting '{name}' must be finite")]
    NonFinite { name: &'static str },

    #[error("table setting '{name}' is out of range: expected {expected}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("explicit {orientation:?} edges need at least two explicit lines")]
    MissingExplicitLines { orientation: Orientation },
}

/// Convenience Result type alias for TableError.
pub type Result<T> = std::result::Result<T, TableError>;
