use thiserror::Error;

use crate::normalize::EntityType;

/// Malformed free text in an input row. Every variant carries the offending token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognised day {0:?}")]
    UnknownDay(String),

    #[error("unknown days in range {start:?}-{end:?}")]
    UnknownDayRange { start: String, end: String },

    #[error("invalid schedule (no space between days and hours): {0:?}")]
    MissingHours(String),

    #[error("cannot parse hours (expected a single '-'): {0:?}")]
    MissingRangeSeparator(String),

    #[error("cannot parse hour {0:?}")]
    InvalidHour(String),

    #[error("invalid language {0:?}")]
    UnknownLanguage(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no category named {name:?} for item type {item_type}")]
    CategoryNotFound { item_type: EntityType, name: String },

    #[error("category {name:?} is ambiguous for item type {item_type} ({matches} matches)")]
    AmbiguousCategory {
        item_type: EntityType,
        name: String,
        matches: usize,
    },

    #[error("item type {0} has no category column and no default category")]
    MissingCategory(EntityType),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}
