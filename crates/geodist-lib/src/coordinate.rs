//! Geographic coordinate model.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A latitude/longitude pair in degrees.
///
/// No range validation is performed: latitudes beyond ±90 are accepted and
/// flow straight into the distance formula.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// The fixed reference point distances are measured from.
pub type SourceLocation = Coordinate;

/// One of the points distances are measured to.
pub type CandidateLocation = Coordinate;

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Decode a candidate list from its JSON form, `[{"lat":..,"lng":..}, ...]`.
///
/// Missing `lat`/`lng` keys default to `0.0` and unknown keys are ignored.
pub fn parse_candidates(json: &str) -> Result<Vec<CandidateLocation>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn parses_candidate_list() {
        let candidates =
            parse_candidates(r#"[{"lat":55.6,"lng":12.6},{"lat":-33.9,"lng":151.2}]"#).unwrap();
        assert_eq!(
            candidates,
            vec![Coordinate::new(55.6, 12.6), Coordinate::new(-33.9, 151.2)]
        );
    }

    #[test]
    fn parses_empty_list() {
        assert!(parse_candidates("[]").unwrap().is_empty());
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let candidates = parse_candidates(r#"[{"lat":10.0},{"lng":20.0,"name":"x"}]"#).unwrap();
        assert_eq!(candidates[0], Coordinate::new(10.0, 0.0));
        assert_eq!(candidates[1], Coordinate::new(0.0, 20.0));
    }

    #[test]
    fn rejects_malformed_json() {
        for input in ["", "not json", r#"[{"lat":"north"}]"#, r#"{"lat":1,"lng":2}"#] {
            let err = parse_candidates(input).unwrap_err();
            assert!(
                matches!(err, Error::InvalidCandidates(_)),
                "unexpected error for {input:?}: {err:?}"
            );
        }
    }

    #[test]
    fn out_of_range_values_are_accepted() {
        let candidates = parse_candidates(r#"[{"lat":123.0,"lng":-720.0}]"#).unwrap();
        assert_eq!(candidates[0], Coordinate::new(123.0, -720.0));
    }

    #[test]
    fn from_tuple() {
        assert_eq!(Coordinate::from((1.5, -2.5)), Coordinate::new(1.5, -2.5));
    }
}
