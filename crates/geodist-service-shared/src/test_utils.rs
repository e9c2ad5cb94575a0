//! Test utilities for handler testing.
//!
//! Provides an [`AppState`] built from the candidate fixture so handler tests
//! across crates share the same data.

use std::path::PathBuf;
use std::sync::OnceLock;

use geodist_lib::FanOutOptions;

use crate::config::{ServiceConfig, DEFAULT_SOURCE};
use crate::state::AppState;

/// Path to the candidate list fixture.
pub const CANDIDATES_FIXTURE_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../docs/fixtures/candidates.json"
);

/// Number of candidates in the fixture.
pub const FIXTURE_CANDIDATE_COUNT: usize = 5;

/// Index of the fixture candidate that sits exactly on [`DEFAULT_SOURCE`].
pub const FIXTURE_SOURCE_INDEX: usize = 2;

static FIXTURE_JSON: OnceLock<String> = OnceLock::new();

/// Raw JSON of the candidate fixture, read once.
///
/// # Panics
///
/// Panics if the fixture cannot be read. This indicates a test
/// configuration issue.
pub fn fixture_candidates_json() -> String {
    FIXTURE_JSON
        .get_or_init(|| {
            let path = fixture_path();
            std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("failed to read fixture {:?}: {}", path, e))
        })
        .clone()
}

pub fn fixture_path() -> PathBuf {
    PathBuf::from(CANDIDATES_FIXTURE_PATH)
}

/// State with the default source, the fixture candidates, and the given
/// fan-out options.
pub fn test_state_with(options: FanOutOptions) -> AppState {
    AppState::new(&ServiceConfig {
        candidates_json: fixture_candidates_json(),
        fan_out: options,
        ..ServiceConfig::default()
    })
}

/// State with the default source, the fixture candidates, and default options.
pub fn test_state() -> AppState {
    test_state_with(FanOutOptions::default())
}

/// State whose candidate list fails to decode.
pub fn broken_state() -> AppState {
    AppState::from_components(DEFAULT_SOURCE, "{not json", FanOutOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_path_exists() {
        assert!(fixture_path().exists(), "fixture not found at {:?}", fixture_path());
    }

    #[test]
    fn test_state_decodes_fixture() {
        let candidates = test_state().candidates().expect("fixture decodes");
        assert_eq!(candidates.len(), FIXTURE_CANDIDATE_COUNT);
        assert_eq!(candidates[FIXTURE_SOURCE_INDEX], DEFAULT_SOURCE);
    }

    #[test]
    fn test_broken_state_fails_to_decode() {
        assert!(broken_state().candidates().is_err());
    }
}
