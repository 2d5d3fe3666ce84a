//! Error types for zone and track input

use thiserror::Error;

/// Errors raised when a zone polygon is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZoneError {
    /// Too few vertices to enclose an area
    #[error("A zone needs at least {min} points, got {actual}")]
    TooFewVertices { min: usize, actual: usize },

    /// A vertex has a NaN or infinite coordinate
    #[error("Zone point {index} is not a finite coordinate")]
    NonFiniteVertex { index: usize },
}

/// Errors raised while parsing uploaded track data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    /// Every row was dropped (or the input was empty)
    #[error("No valid track rows found ({dropped} rows dropped)")]
    NoRows { dropped: usize },
}

/// Reasons a single CSV row is dropped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    /// Fewer than latitude, longitude and type columns
    #[error("Expected at least 3 columns, got {0}")]
    TooFewColumns(usize),

    /// A coordinate or type column did not parse
    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),
}
