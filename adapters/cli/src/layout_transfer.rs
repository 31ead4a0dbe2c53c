#![allow(clippy::missing_errors_doc)]

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use phantom_maze_core::{CellCoord, Tile, TileLayout};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ascii::{glyph, tile_from_glyph};

const SNAPSHOT_DOMAIN: &str = "phantom";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded layout payload.
pub(crate) const SNAPSHOT_HEADER: &str = "phantom:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Encodes a maze layout into a single-line string that can be pasted elsewhere.
pub(crate) fn encode(layout: &TileLayout) -> Result<String, LayoutTransferError> {
    let mut rows = vec![String::new(); layout.rows() as usize];
    for (cell, tile) in layout.iter() {
        if let Some(row) = rows.get_mut(cell.row() as usize) {
            row.push(glyph(tile));
        }
    }

    let payload = SerializableLayout { rows };
    let json = serde_json::to_vec(&payload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!(
        "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
        layout.columns(),
        layout.rows()
    ))
}

/// Decodes a maze layout from the provided string representation.
pub(crate) fn decode(value: &str) -> Result<TileLayout, LayoutTransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LayoutTransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
    let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
    let dimensions = parts.next().ok_or(LayoutTransferError::MissingDimensions)?;
    let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

    if domain != SNAPSHOT_DOMAIN {
        return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != SNAPSHOT_VERSION {
        return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
    }

    let (columns, rows) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
    let decoded: SerializableLayout = serde_json::from_slice(&bytes)?;
    let columns_fit = decoded
        .rows
        .iter()
        .all(|line| line.chars().count() == columns as usize);
    if decoded.rows.len() != rows as usize || !columns_fit {
        return Err(LayoutTransferError::ShapeMismatch);
    }

    let mut layout = TileLayout::filled(columns, rows, Tile::Wall);
    for (row, line) in decoded.rows.iter().enumerate() {
        for (column, symbol) in line.chars().enumerate() {
            let tile = tile_from_glyph(symbol).ok_or(LayoutTransferError::UnknownGlyph(symbol))?;
            let _ = layout.set(CellCoord::new(column as i32, row as i32), tile);
        }
    }
    Ok(layout)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableLayout {
    rows: Vec<String>,
}

/// Errors that can occur while encoding or decoding layout transfer strings.
#[derive(Debug, Error)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("layout payload was empty")]
    EmptyPayload,
    /// The prefix segment was missing from the encoded layout.
    #[error("layout string is missing the prefix")]
    MissingPrefix,
    /// The encoded layout did not contain a version segment.
    #[error("layout string is missing the version")]
    MissingVersion,
    /// The encoded layout did not include grid dimensions.
    #[error("layout string is missing the grid dimensions")]
    MissingDimensions,
    /// The encoded layout did not include the payload segment.
    #[error("layout string is missing the payload")]
    MissingPayload,
    /// The encoded layout used an unexpected prefix segment.
    #[error("layout prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded layout used an unsupported version identifier.
    #[error("layout version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded layout.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode layout payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    #[error("could not process layout payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    /// The payload rows disagree with the advertised dimensions.
    #[error("layout rows do not match the advertised dimensions")]
    ShapeMismatch,
    /// The payload contains a symbol that is not a known tile.
    #[error("layout contains unknown tile symbol '{0}'")]
    UnknownGlyph(char),
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutTransferError> {
    let invalid = || LayoutTransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}
