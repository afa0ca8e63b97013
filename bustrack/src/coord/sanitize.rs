//! Boundary sanitization for untrusted geodata.
//!
//! Map rendering and distance math do not tolerate `NaN`, infinities or
//! out-of-range values. Every coordinate entering the tracking pipeline goes
//! through here first, so downstream code can assume valid input.
//!
//! None of these functions fail: invalid input is an expected case and is
//! replaced (single values) or dropped (lists).

use super::types::{Coordinate, DEFAULT_COORDINATES};

/// Returns true if a coordinate is present and satisfies the invariant.
#[inline]
pub fn is_valid_coordinate(candidate: Option<&Coordinate>) -> bool {
    candidate.is_some_and(Coordinate::is_valid)
}

/// Returns `candidate` if it is valid, otherwise `fallback`.
///
/// The result always satisfies the coordinate invariant: an invalid fallback
/// is itself replaced by [`DEFAULT_COORDINATES`].
///
/// # Example
///
/// ```
/// use bustrack::coord::{sanitize, Coordinate};
///
/// let fallback = Coordinate::new(37.7749, -122.4194);
/// assert_eq!(sanitize(Some(Coordinate::new(f64::NAN, 1.0)), fallback), fallback);
/// assert_eq!(sanitize(None, fallback), fallback);
/// ```
pub fn sanitize(candidate: Option<Coordinate>, fallback: Coordinate) -> Coordinate {
    match candidate {
        Some(c) if c.is_valid() => Coordinate::new(c.latitude, c.longitude),
        _ => usable_fallback(fallback),
    }
}

/// Drops invalid entries; never returns an empty list.
///
/// Path renderers cannot draw zero points, so an all-invalid (or empty) input
/// yields `[fallback]`.
pub fn sanitize_list(candidates: &[Coordinate], fallback: Coordinate) -> Vec<Coordinate> {
    let valid = safe_polyline(candidates);
    if valid.is_empty() {
        vec![usable_fallback(fallback)]
    } else {
        valid
    }
}

/// Returns true only if the polyline is non-empty and every point is valid.
pub fn is_valid_polyline(polyline: &[Coordinate]) -> bool {
    !polyline.is_empty() && polyline.iter().all(Coordinate::is_valid)
}

/// Filters out invalid points. Unlike [`sanitize_list`] the result may be empty.
pub fn safe_polyline(polyline: &[Coordinate]) -> Vec<Coordinate> {
    polyline
        .iter()
        .copied()
        .filter(Coordinate::is_valid)
        .collect()
}

fn usable_fallback(fallback: Coordinate) -> Coordinate {
    if fallback.is_valid() {
        fallback
    } else {
        DEFAULT_COORDINATES
    }
}
