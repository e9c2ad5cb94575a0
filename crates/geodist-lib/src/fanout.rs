//! Concurrent distance fan-out.
//!
//! [`FanOut::compute`] measures the distance from one source coordinate to
//! every candidate concurrently and gathers the results back at the caller.
//!
//! # Dispatch
//!
//! Two dispatch strategies are available through [`Concurrency`]:
//!
//! - [`Concurrency::Unbounded`]: one tokio task per candidate.
//! - [`Concurrency::Bounded`]: a fixed pool of `min(limit, N)` tasks that pull
//!   candidate indices from a shared atomic cursor until the list is drained.
//!
//! Either way, every candidate produces exactly one `(index, distance)`
//! message on a single capacity-1 channel, and the collector performs exactly
//! N receives before closing it.
//!
//! # Ordering
//!
//! Messages arrive in completion order, which is scheduler dependent.
//! [`ResultOrder::Input`] sorts the collected results back into candidate
//! order; [`ResultOrder::Completion`] keeps arrival order. Each
//! [`DistanceResult`] carries its `candidate_index` regardless.
//!
//! # Example
//!
//! ```no_run
//! use geodist_lib::{Coordinate, FanOut, FanOutOptions};
//!
//! # async fn run() -> geodist_lib::Result<()> {
//! let source = Coordinate::new(55.545454, 12.5465465);
//! let candidates = [Coordinate::new(55.6, 12.6), Coordinate::new(55.7, 12.5)];
//!
//! let results = FanOut::new(FanOutOptions::default())
//!     .compute(source, &candidates)
//!     .await?;
//! assert_eq!(results.len(), candidates.len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::coordinate::{CandidateLocation, SourceLocation};
use crate::distance::great_circle_distance;
use crate::error::{Error, Result};

/// Order in which collected distances are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultOrder {
    /// Same order as the candidate list.
    #[default]
    Input,
    /// Order in which each unit of work finished.
    Completion,
}

impl ResultOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultOrder::Input => "input",
            ResultOrder::Completion => "completion",
        }
    }
}

impl fmt::Display for ResultOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "input" => Ok(ResultOrder::Input),
            "completion" => Ok(ResultOrder::Completion),
            _ => Err(Error::UnsupportedOption {
                option: "result order",
                value: s.to_string(),
            }),
        }
    }
}

/// How many units of work may be in flight at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// One task per candidate, no cap.
    Unbounded,
    /// A fixed worker pool of at most this many tasks. `0` is treated as `1`.
    Bounded(usize),
}

impl Concurrency {
    /// Worker pool sized to the available CPUs.
    pub fn available_parallelism() -> Self {
        Concurrency::Bounded(num_cpus::get())
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::available_parallelism()
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concurrency::Unbounded => f.write_str("unbounded"),
            Concurrency::Bounded(limit) => write!(f, "bounded({limit})"),
        }
    }
}

impl FromStr for Concurrency {
    type Err = Error;

    /// Accepts `unbounded`, `bounded` (one worker per CPU), or a worker count.
    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_lowercase();
        match value.as_str() {
            "unbounded" => Ok(Concurrency::Unbounded),
            "bounded" => Ok(Concurrency::available_parallelism()),
            other => other
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .map(Concurrency::Bounded)
                .ok_or_else(|| Error::UnsupportedOption {
                    option: "concurrency",
                    value: s.to_string(),
                }),
        }
    }
}

/// Options controlling a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FanOutOptions {
    pub order: ResultOrder,
    pub concurrency: Concurrency,
}

impl FanOutOptions {
    /// One task per candidate, results in completion order.
    pub fn unordered_unbounded() -> Self {
        Self {
            order: ResultOrder::Completion,
            concurrency: Concurrency::Unbounded,
        }
    }

    pub fn with_order(mut self, order: ResultOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Distance to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceResult {
    /// Position of the candidate in the input sequence.
    pub candidate_index: usize,
    /// Distance from the source to that candidate.
    pub distance: f64,
}

/// Every distance produced by one fan-out.
///
/// Serializes as a bare array of distances.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceResultSet {
    results: Vec<DistanceResult>,
    order: ResultOrder,
}

impl DistanceResultSet {
    fn empty(order: ResultOrder) -> Self {
        Self {
            results: Vec::new(),
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The order the results are arranged in.
    pub fn order(&self) -> ResultOrder {
        self.order
    }

    pub fn results(&self) -> &[DistanceResult] {
        &self.results
    }

    pub fn iter(&self) -> impl Iterator<Item = &DistanceResult> {
        self.results.iter()
    }

    /// The distances alone, in the set's order.
    pub fn distances(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.distance).collect()
    }

    pub fn into_distances(self) -> Vec<f64> {
        self.results.into_iter().map(|r| r.distance).collect()
    }
}

impl Serialize for DistanceResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.results.iter().map(|r| r.distance))
    }
}

impl<'a> IntoIterator for &'a DistanceResultSet {
    type Item = &'a DistanceResult;
    type IntoIter = std::slice::Iter<'a, DistanceResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// The fan-out engine.
///
/// Holds only its options; every call to [`FanOut::compute`] is independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanOut {
    options: FanOutOptions,
}

impl FanOut {
    pub fn new(options: FanOutOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> FanOutOptions {
        self.options
    }

    /// Compute the distance from `source` to each candidate concurrently.
    ///
    /// Must be called from within a tokio runtime. Returns exactly one result
    /// per candidate. An empty candidate list returns immediately without
    /// spawning anything.
    ///
    /// # Errors
    ///
    /// [`Error::IncompleteResults`] if a unit of work disappeared (panic or
    /// runtime shutdown) before reporting, rather than waiting forever.
    pub async fn compute(
        &self,
        source: SourceLocation,
        candidates: &[CandidateLocation],
    ) -> Result<DistanceResultSet> {
        let expected = candidates.len();
        if expected == 0 {
            return Ok(DistanceResultSet::empty(self.options.order));
        }

        let (tx, rx) = mpsc::channel(1);
        let workers = match self.options.concurrency {
            Concurrency::Unbounded => spawn_per_candidate(source, candidates, &tx),
            Concurrency::Bounded(limit) => spawn_worker_pool(source, candidates, limit, &tx),
        };
        // Only the workers hold senders now, so a lost worker closes the channel.
        drop(tx);

        debug!(
            candidates = expected,
            workers,
            order = %self.options.order,
            "dispatched distance fan-out"
        );

        collect(rx, expected, self.options.order).await
    }
}

/// Compute distances with the given options. Shorthand for
/// `FanOut::new(*options).compute(source, candidates)`.
pub async fn compute(
    source: SourceLocation,
    candidates: &[CandidateLocation],
    options: &FanOutOptions,
) -> Result<DistanceResultSet> {
    FanOut::new(*options).compute(source, candidates).await
}

type Message = (usize, f64);

fn spawn_per_candidate(
    source: SourceLocation,
    candidates: &[CandidateLocation],
    results: &mpsc::Sender<Message>,
) -> usize {
    for (index, &candidate) in candidates.iter().enumerate() {
        let results = results.clone();
        tokio::spawn(async move {
            let distance = great_circle_distance(source, candidate);
            // Err only if the collector already gave up.
            let _ = results.send((index, distance)).await;
        });
    }
    candidates.len()
}

fn spawn_worker_pool(
    source: SourceLocation,
    candidates: &[CandidateLocation],
    limit: usize,
    results: &mpsc::Sender<Message>,
) -> usize {
    let queue: Arc<[CandidateLocation]> = Arc::from(candidates);
    let cursor = Arc::new(AtomicUsize::new(0));
    let workers = limit.clamp(1, queue.len());

    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let cursor = Arc::clone(&cursor);
        let results = results.clone();
        tokio::spawn(async move {
            loop {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(&candidate) = queue.get(index) else {
                    break;
                };
                let distance = great_circle_distance(source, candidate);
                if results.send((index, distance)).await.is_err() {
                    break;
                }
            }
        });
    }
    workers
}

async fn collect(
    mut rx: mpsc::Receiver<Message>,
    expected: usize,
    order: ResultOrder,
) -> Result<DistanceResultSet> {
    let mut results = Vec::with_capacity(expected);

    for received in 0..expected {
        match rx.recv().await {
            Some((candidate_index, distance)) => results.push(DistanceResult {
                candidate_index,
                distance,
            }),
            None => {
                warn!(expected, received, "result channel closed early");
                return Err(Error::IncompleteResults { expected, received });
            }
        }
    }
    rx.close();

    if order == ResultOrder::Input {
        results.sort_unstable_by_key(|r| r.candidate_index);
    }

    debug!(collected = results.len(), %order, "collected distance fan-out");
    Ok(DistanceResultSet { results, order })
}
