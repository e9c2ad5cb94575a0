//! geodist library entry points.
//!
//! This crate exposes the coordinate model, the great-circle distance
//! function, and the concurrent fan-out collector that computes the distance
//! from one source coordinate to many candidates. Higher-level consumers (the
//! HTTP service) should only depend on the items exported here instead of
//! reimplementing behavior.
//!

#![deny(warnings)]

pub mod coordinate;
pub mod distance;
pub mod error;
pub mod fanout;

pub use coordinate::{parse_candidates, CandidateLocation, Coordinate, SourceLocation};
pub use distance::{distance_between, great_circle_distance};
pub use error::{Error, Result};
pub use fanout::{
    compute, Concurrency, DistanceResult, DistanceResultSet, FanOut, FanOutOptions, ResultOrder,
};
