//! Great-circle distance between two coordinates.
//!
//! Uses the spherical law of cosines. The scale factors convert the central
//! angle (in degrees) to nautical miles, then statute miles, then kilometres,
//! and are applied in that order so results reproduce the established service
//! output exactly.

use std::f64::consts::PI;

use crate::coordinate::Coordinate;

/// Nautical miles per degree of arc.
pub const NAUTICAL_MILES_PER_DEGREE: f64 = 60.0;

/// Statute miles per nautical mile.
pub const STATUTE_MILES_PER_NAUTICAL_MILE: f64 = 1.1515;

/// Kilometres per statute mile.
pub const KILOMETRES_PER_STATUTE_MILE: f64 = 1.609344;

/// Distance from `source` to `candidate`.
///
/// See [`distance_between`].
pub fn great_circle_distance(source: Coordinate, candidate: Coordinate) -> f64 {
    distance_between(source.lat, source.lng, candidate.lat, candidate.lng)
}

/// Distance between two points given as raw latitude/longitude degrees.
///
/// Never fails. Inputs are not range checked, and non-finite inputs propagate
/// to a non-finite output. The cosine term is clamped to at most `1.0` before
/// `acos` so rounding on (near-)identical points cannot produce `NaN`; there
/// is no lower clamp.
pub fn distance_between(
    source_lat: f64,
    source_lng: f64,
    candidate_lat: f64,
    candidate_lng: f64,
) -> f64 {
    let rad_source_lat = PI * source_lat / 180.0;
    let rad_candidate_lat = PI * candidate_lat / 180.0;
    let theta = source_lng - candidate_lng;
    let rad_theta = PI * theta / 180.0;

    let cosine = clamp_cosine(
        rad_source_lat.sin() * rad_candidate_lat.sin()
            + rad_source_lat.cos() * rad_candidate_lat.cos() * rad_theta.cos(),
    );

    let degrees = cosine.acos() * 180.0 / PI;
    degrees * NAUTICAL_MILES_PER_DEGREE * STATUTE_MILES_PER_NAUTICAL_MILE
        * KILOMETRES_PER_STATUTE_MILE
}

// NaN must pass through untouched, so no f64::min here.
fn clamp_cosine(value: f64) -> f64 {
    if value > 1.0 {
        1.0
    } else {
        value
    }
}
