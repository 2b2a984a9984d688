// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The resource graph and deletion loop (§3–§5 of the design).
//!
//! [`ResourceGraph::assemble`] turns a flat list of discovered [`Tracker`]s
//! into a DAG-shaped adjacency map, folding each tracker's `blocks` and the
//! inverse `blocked` edges declared by its dependents into one map: one
//! owning map of entries, dependencies recorded as keys rather than
//! pointers, and a readiness predicate consulted between — never during —
//! concurrent dispatch.

mod key;
mod kind;
pub mod latch;
mod tracker;

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::time::Duration;

pub use key::GraphKey;
pub use kind::Kind;
pub use tracker::{DeleteError, Deleter, Tracker};

use latch::StopLatch;
use log::{debug, warn};
use parking_lot::Mutex;

/// Consecutive no-progress outer iterations tolerated before the loop
/// declares convergence-fatal failure (§4.3, §5, §8 scenario 5).
pub const MAX_NO_PROGRESS_ITERATIONS: u32 = 30;

/// Default sleep between outer iterations (§4.3). Tests inject a much
/// shorter delay via [`DeletionLoop::with_outer_sleep`] so that exercising
/// 31 outer iterations does not take five real minutes.
pub const DEFAULT_OUTER_SLEEP: Duration = Duration::from_secs(10);

/// A DAG (enforced by construction, not mutation) of [`Tracker`]s plus the
/// adjacency map consulted by the deletion loop.
pub struct ResourceGraph {
    trackers: HashMap<GraphKey, Tracker>,
    /// key -> the set of keys it depends on (must be done, or absent from
    /// `trackers`, before key is eligible).
    edges: HashMap<GraphKey, HashSet<GraphKey>>,
}

impl ResourceGraph {
    /// Assembles a graph from discovered trackers (§4.2).
    ///
    /// `blocks` and `blocked` both describe the same kind of relationship
    /// from opposite ends. For every tracker `T` keyed `k`: each `b` in
    /// `T.blocks` means `T` blocks `b`'s deletion, so `b` is the one that
    /// cannot proceed until `k` is done — edge `b -> k`. Each `x` in
    /// `T.blocked` means `T` itself is the one waiting, on `x` — edge
    /// `k -> x`. A subnet that blocks on its network and a network that is
    /// blocked by that subnet are the same edge stated from each side;
    /// edges are sets, so stating it from both sides is idempotent. Edges
    /// pointing at keys with no tracker are retained but are trivially
    /// satisfied at selection time.
    pub fn assemble(trackers: Vec<Tracker>) -> ResourceGraph {
        let mut edges: HashMap<GraphKey, HashSet<GraphKey>> = HashMap::new();
        for tracker in &trackers {
            let k = tracker.key();
            for b in tracker.blocks() {
                edges.entry(b.clone()).or_default().insert(k.clone());
            }
            for x in tracker.blocked() {
                edges.entry(k.clone()).or_default().insert(x.clone());
            }
        }

        let trackers = trackers.into_iter().map(|t| (t.key(), t)).collect();
        ResourceGraph { trackers, edges }
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &GraphKey> {
        self.trackers.keys()
    }

    pub fn tracker(&self, key: &GraphKey) -> Option<&Tracker> {
        self.trackers.get(key)
    }

    fn dependencies_of(&self, key: &GraphKey) -> impl Iterator<Item = &GraphKey> {
        self.edges.get(key).into_iter().flatten()
    }

    fn is_satisfied(&self, dep: &GraphKey, done: &HashSet<GraphKey>) -> bool {
        done.contains(dep) || !self.trackers.contains_key(dep)
    }
}

/// Per-outer-iteration mutable state, serialized behind one mutex so that
/// concurrently-dispatched deleters within a phase never race (§4.3's
/// concurrency contract).
struct SharedState {
    done: HashSet<GraphKey>,
    failed: HashSet<GraphKey>,
    no_progress: u32,
}

/// Outcome of a converged (or aborted) deletion loop run.
#[derive(Debug)]
pub struct DeletionReport {
    pub outer_iterations: u32,
    pub deleted: usize,
}

/// Drives [`ResourceGraph`] to convergence: repeated phased parallel passes,
/// retrying dependency-violation and other transient errors on the next
/// outer iteration, until every tracker is done or the no-progress budget
/// is exhausted (§4.3).
pub struct DeletionLoop<'g, W> {
    graph: &'g ResourceGraph,
    progress: W,
    outer_sleep: Duration,
    stop: Option<StopLatch>,
}

impl<'g, W: Write> DeletionLoop<'g, W> {
    pub fn new(graph: &'g ResourceGraph, progress: W) -> Self {
        DeletionLoop {
            graph,
            progress,
            outer_sleep: DEFAULT_OUTER_SLEEP,
            stop: None,
        }
    }

    /// Overrides the sleep between outer iterations. Production callers
    /// should leave this at [`DEFAULT_OUTER_SLEEP`]; tests that want to
    /// exercise the no-progress path set it to near-zero.
    pub fn with_outer_sleep(mut self, sleep: Duration) -> Self {
        self.outer_sleep = sleep;
        self
    }

    /// Registers a cooperative stop signal, checked between outer
    /// iterations only (never mid-phase).
    pub fn with_stop_latch(mut self, stop: StopLatch) -> Self {
        self.stop = Some(stop);
        self
    }

    pub async fn run(mut self) -> Result<DeletionReport, String> {
        if self.graph.is_empty() {
            return Ok(DeletionReport {
                outer_iterations: 0,
                deleted: 0,
            });
        }

        let state = Mutex::new(SharedState {
            done: HashSet::new(),
            failed: HashSet::new(),
            no_progress: 0,
        });

        // Trackers already marked done at discovery time are retired
        // immediately, before the first outer iteration runs (§4.2).
        {
            let mut s = state.lock();
            for (key, tracker) in &self.graph.trackers {
                if tracker.is_already_done() {
                    s.done.insert(key.clone());
                }
            }
        }

        let mut outer_iterations: u32 = 0;
        loop {
            outer_iterations += 1;
            {
                let mut s = state.lock();
                s.failed.clear();
            }

            let mut progressed_this_outer = false;
            loop {
                let eligible: Vec<GraphKey> = {
                    let s = state.lock();
                    self.graph
                        .trackers
                        .keys()
                        .filter(|k| !s.done.contains(*k) && !s.failed.contains(*k))
                        .filter(|k| {
                            self.graph
                                .dependencies_of(k)
                                .all(|dep| self.graph.is_satisfied(dep, &s.done))
                        })
                        .cloned()
                        .collect()
                };
                if eligible.is_empty() {
                    break;
                }

                let mut phase: tokio::task::JoinSet<(GraphKey, Result<(), DeleteError>)> =
                    tokio::task::JoinSet::new();
                for key in eligible {
                    let deleter = self
                        .graph
                        .tracker(&key)
                        .expect("eligible key must have a tracker")
                        .deleter();
                    phase.spawn(async move {
                        let result = deleter.delete().await;
                        (key, result)
                    });
                }

                while let Some(joined) = phase.join_next().await {
                    let (key, result) = joined.map_err(|e| {
                        format!("deletion task for a tracker panicked: {e}")
                    })?;
                    match result {
                        Ok(()) => {
                            writeln!(self.progress, "{key}\tok").map_err(|e| e.to_string())?;
                            state.lock().done.insert(key);
                            progressed_this_outer = true;
                        }
                        Err(DeleteError::DependencyViolation) => {
                            writeln!(self.progress, "{key}\tstill has dependencies, will retry")
                                .map_err(|e| e.to_string())?;
                            state.lock().failed.insert(key);
                        }
                        Err(DeleteError::Other(msg)) => {
                            writeln!(
                                self.progress,
                                "{key}\terror deleting resource, will retry: {msg}"
                            )
                            .map_err(|e| e.to_string())?;
                            warn!("deleting {key} failed: {msg}");
                            state.lock().failed.insert(key);
                        }
                    }
                }
            }

            let (done_len, pending): (usize, Vec<GraphKey>) = {
                let s = state.lock();
                (
                    s.done.len(),
                    self.graph
                        .trackers
                        .keys()
                        .filter(|k| !s.done.contains(*k))
                        .cloned()
                        .collect(),
                )
            };
            if done_len == self.graph.len() {
                return Ok(DeletionReport {
                    outer_iterations,
                    deleted: done_len,
                });
            }

            {
                let mut s = state.lock();
                if progressed_this_outer {
                    s.no_progress = 0;
                } else {
                    s.no_progress += 1;
                }
                if s.no_progress > MAX_NO_PROGRESS_ITERATIONS {
                    return Err(format!(
                        "reaper did not converge after {outer_iterations} outer iterations; {} resources remain: {}",
                        pending.len(),
                        pending
                            .iter()
                            .map(GraphKey::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ));
                }
            }

            if let Some(stop) = &self.stop {
                if stop.is_triggered() {
                    return Err(format!(
                        "reaper was stopped; {} resources remain",
                        pending.len()
                    ));
                }
            }

            writeln!(
                self.progress,
                "---- waiting for {} resource(s) to converge ----",
                pending.len()
            )
            .map_err(|e| e.to_string())?;
            let mut sorted_pending = pending;
            sorted_pending.sort();
            for key in &sorted_pending {
                writeln!(self.progress, "    {key}").map_err(|e| e.to_string())?;
            }
            debug!(
                "outer iteration {outer_iterations} made no progress: {}",
                !progressed_this_outer
            );

            tokio::time::sleep(self.outer_sleep).await;
        }
    }
}

#[cfg(test)]
mod tests;
