//! Geographic coordinate module
//!
//! Validation and sanitization of latitude/longitude pairs, encoded polyline
//! decoding for route geometry, and the great-circle math used for ETA and
//! marker heading.
//!
//! # Invariant
//!
//! A [`Coordinate`] is *valid* when both fields are finite, latitude lies in
//! `[-90, 90]` and longitude in `[-180, 180]`. Everything leaving
//! [`sanitize`] or [`sanitize_list`] is valid.

mod geodesy;
mod polyline;
mod sanitize;
mod types;

pub use geodesy::{
    haversine_distance_m, initial_bearing_deg, normalize_degrees, path_length_m, EARTH_RADIUS_M,
};
pub use polyline::{decode_polyline, route_polyline, PolylineError, POLYLINE_PRECISION};
pub use sanitize::{
    is_valid_coordinate, is_valid_polyline, safe_polyline, sanitize, sanitize_list,
};
pub use types::{Coordinate, DEFAULT_COORDINATES, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
