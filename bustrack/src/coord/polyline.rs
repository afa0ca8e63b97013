//! Encoded polyline decoding.
//!
//! Directions services return route geometry in the encoded polyline format
//! (5 decimal places, zig-zag varints packed into printable ASCII). The
//! decoder here rejects malformed input instead of reading past the end.

use thiserror::Error;

use super::sanitize::{safe_polyline, sanitize_list};
use super::types::Coordinate;

/// Fixed-point scale of the encoded polyline format.
pub const POLYLINE_PRECISION: f64 = 1e5;

/// Lowest and highest bytes a well-formed polyline can contain.
const MIN_CHUNK_BYTE: u8 = 63;
const MAX_CHUNK_BYTE: u8 = 63 + 0x3f;

/// Errors while decoding an encoded polyline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolylineError {
    /// Input ended in the middle of a value.
    #[error("Polyline truncated at byte {0}")]
    Truncated(usize),

    /// Byte outside the polyline alphabet.
    #[error("Invalid polyline byte 0x{byte:02x} at position {position}")]
    InvalidByte { byte: u8, position: usize },

    /// A value, or the running sum of values, does not fit in 64 bits.
    #[error("Polyline value overflows at byte {0}")]
    Overflow(usize),
}

/// Decodes an encoded polyline into coordinates.
///
/// # Example
///
/// ```
/// use bustrack::coord::decode_polyline;
///
/// let points = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(points.len(), 3);
/// assert!((points[0].latitude - 38.5).abs() < 1e-9);
/// assert!((points[0].longitude - -120.2).abs() < 1e-9);
/// ```
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut coordinates = Vec::new();

    while index < bytes.len() {
        let start = index;
        lat = lat
            .checked_add(decode_value(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow(start))?;
        let start = index;
        lng = lng
            .checked_add(decode_value(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow(start))?;

        coordinates.push(Coordinate::new(
            lat as f64 / POLYLINE_PRECISION,
            lng as f64 / POLYLINE_PRECISION,
        ));
    }

    Ok(coordinates)
}

/// Builds the path to draw for a route.
///
/// Uses the decoded geometry when it yields at least one valid point;
/// otherwise draws straight lines between the stops. Never empty.
pub fn route_polyline(
    encoded: Option<&str>,
    stop_coordinates: &[Coordinate],
    fallback: Coordinate,
) -> Vec<Coordinate> {
    if let Some(encoded) = encoded {
        match decode_polyline(encoded) {
            Ok(points) => {
                let points = safe_polyline(&points);
                if !points.is_empty() {
                    return points;
                }
                tracing::debug!("Route polyline decoded to no valid points, using stops");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Route polyline decode failed, using stops");
            }
        }
    }

    sanitize_list(stop_coordinates, fallback)
}

fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let position = *index;
        let byte = *bytes.get(position).ok_or(PolylineError::Truncated(position))?;
        if !(MIN_CHUNK_BYTE..=MAX_CHUNK_BYTE).contains(&byte) {
            return Err(PolylineError::InvalidByte { byte, position });
        }
        let chunk = u64::from(byte - MIN_CHUNK_BYTE);
        let bits = chunk & 0x1f;
        // The 13th chunk has only 4 bits of room left
        if shift > 60 || (shift == 60 && bits >> 4 != 0) {
            return Err(PolylineError::Overflow(position));
        }

        result |= bits << shift;
        shift += 5;
        *index += 1;

        if chunk < 0x20 {
            break;
        }
    }

    // Zig-zag: the low bit carries the sign
    let magnitude = (result >> 1) as i64;
    Ok(if result & 1 != 0 { !magnitude } else { magnitude })
}
