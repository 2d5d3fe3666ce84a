//! CSV track ingestion.
//!
//! Rows are `latitude,longitude,type`. Type 0 is the recorded track, every
//! other code is a separate predicted track. Anything that does not parse
//! (header rows, blank lines, short rows, non-numeric or non-finite values)
//! is dropped and counted.

use std::collections::BTreeMap;

use super::{TrackSet, ACTUAL_TRACK_TYPE};
use crate::error::{RowError, TrackError};
use crate::geo::GeoPoint;

/// A single accepted CSV row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRow {
    pub position: GeoPoint,
    pub track_type: u32,
}

/// Result of parsing a CSV document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTracks {
    pub tracks: TrackSet,
    pub accepted: usize,
    pub dropped: usize,
}

/// Parse one CSV line
pub fn parse_row(line: &str) -> Result<TrackRow, RowError> {
    let columns: Vec<&str> = line.split(',').map(|c| c.trim()).collect();
    if columns.len() < 3 {
        return Err(RowError::TooFewColumns(columns.len()));
    }

    let lat = parse_coordinate(columns[0])?;
    let lon = parse_coordinate(columns[1])?;
    let track_type = parse_type(columns[2])?;

    Ok(TrackRow {
        position: GeoPoint::new(lon, lat),
        track_type,
    })
}

fn parse_coordinate(column: &str) -> Result<f64, RowError> {
    match column.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RowError::InvalidNumber(column.to_string())),
    }
}

// Type codes are written as integers, but tolerate "1.0" from spreadsheet exports
fn parse_type(column: &str) -> Result<u32, RowError> {
    if let Ok(code) = column.parse::<u32>() {
        return Ok(code);
    }
    match column.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
            Ok(v as u32)
        }
        _ => Err(RowError::InvalidNumber(column.to_string())),
    }
}

/// Parse a whole CSV document into tracks partitioned by type code.
///
/// Returns [`TrackError::NoRows`] when nothing survives filtering.
pub fn parse_tracks(input: &str) -> Result<ParsedTracks, TrackError> {
    let mut actual = Vec::new();
    let mut predicted: BTreeMap<u32, Vec<GeoPoint>> = BTreeMap::new();
    let mut accepted = 0;
    let mut dropped = 0;

    for line in input.lines() {
        let line = line.trim_start_matches('\u{feff}');
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line) {
            Ok(row) => {
                accepted += 1;
                if row.track_type == ACTUAL_TRACK_TYPE {
                    actual.push(row.position);
                } else {
                    predicted.entry(row.track_type).or_default().push(row.position);
                }
            }
            Err(_) => dropped += 1,
        }
    }

    if accepted == 0 {
        return Err(TrackError::NoRows { dropped });
    }

    Ok(ParsedTracks {
        tracks: TrackSet::new(actual, predicted.into_values().collect()),
        accepted,
        dropped,
    })
}
