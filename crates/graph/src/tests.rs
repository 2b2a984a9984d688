// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{DeleteError, DeletionLoop, Deleter, GraphKey, Kind, ResourceGraph, Tracker};

/// A deleter that fails with `DependencyViolation` for its first
/// `fail_times` invocations, then succeeds.
struct FlakyDeleter {
    attempts: AtomicUsize,
    fail_times: usize,
    invocations: Arc<AtomicUsize>,
}

impl FlakyDeleter {
    fn new(fail_times: usize, invocations: Arc<AtomicUsize>) -> Arc<FlakyDeleter> {
        Arc::new(FlakyDeleter {
            attempts: AtomicUsize::new(0),
            fail_times,
            invocations,
        })
    }
}

#[async_trait]
impl Deleter for FlakyDeleter {
    async fn delete(&self) -> Result<(), DeleteError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_times {
            Err(DeleteError::DependencyViolation)
        } else {
            Ok(())
        }
    }
}

struct AlwaysFails;

#[async_trait]
impl Deleter for AlwaysFails {
    async fn delete(&self) -> Result<(), DeleteError> {
        Err(DeleteError::DependencyViolation)
    }
}

fn tracker(kind: Kind, id: &str, deleter: Arc<dyn Deleter>) -> Tracker {
    Tracker::new(kind, id, "", deleter)
}

#[tokio::test]
async fn empty_graph_converges_in_zero_iterations() {
    let graph = ResourceGraph::assemble(vec![]);
    let mut out = Vec::new();
    let report = DeletionLoop::new(&graph, &mut out).run().await.unwrap();
    assert_eq!(report.outer_iterations, 0);
    assert_eq!(report.deleted, 0);
}

/// Scenario 1: vpc:A <- subnet:B <- instance:C, all deleters succeed on
/// first try. Expect convergence in a single outer iteration and that C is
/// deleted strictly before B, and B strictly before A.
#[tokio::test]
async fn linear_chain_deletes_in_dependency_order() {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    struct Recording {
        key: GraphKey,
        order: Arc<parking_lot::Mutex<Vec<GraphKey>>>,
    }

    #[async_trait]
    impl Deleter for Recording {
        async fn delete(&self) -> Result<(), DeleteError> {
            self.order.lock().push(self.key.clone());
            Ok(())
        }
    }

    let a = GraphKey::new(Kind::Vpc, "A");
    let b = GraphKey::new(Kind::Subnet, "B");
    let c = GraphKey::new(Kind::Instance, "C");

    let mut vpc = tracker(
        Kind::Vpc,
        "A",
        Arc::new(Recording {
            key: a.clone(),
            order: order.clone(),
        }),
    );
    let mut subnet = tracker(
        Kind::Subnet,
        "B",
        Arc::new(Recording {
            key: b.clone(),
            order: order.clone(),
        }),
    );
    subnet.blocks_on(a.clone());
    let mut instance = tracker(
        Kind::Instance,
        "C",
        Arc::new(Recording {
            key: c.clone(),
            order: order.clone(),
        }),
    );
    instance.blocks_on(b.clone());
    // Dedup check (open question in the design): add the same edge twice.
    instance.blocks_on(b.clone());

    vpc.blocked_by(b.clone());

    let graph = ResourceGraph::assemble(vec![vpc, subnet, instance]);
    let mut out = Vec::new();
    let report = DeletionLoop::new(&graph, &mut out)
        .with_outer_sleep(Duration::from_millis(1))
        .run()
        .await
        .unwrap();

    assert_eq!(report.outer_iterations, 1);
    let order = order.lock();
    let pos = |k: &GraphKey| order.iter().position(|x| x == k).unwrap();
    assert!(pos(&c) < pos(&b));
    assert!(pos(&b) < pos(&a));
}

/// Scenario 2: vpc:A <- subnet:B. First delete of A returns
/// DependencyViolation; B succeeds. Expect convergence in 2 outer
/// iterations with both done.
#[tokio::test]
async fn dependency_violation_is_retried_next_outer_iteration() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let a = GraphKey::new(Kind::Vpc, "A");

    let vpc = tracker(Kind::Vpc, "A", FlakyDeleter::new(1, invocations.clone()));
    let mut subnet = tracker(Kind::Subnet, "B", FlakyDeleter::new(0, Arc::new(AtomicUsize::new(0))));
    subnet.blocks_on(a.clone());

    let graph = ResourceGraph::assemble(vec![vpc, subnet]);
    let mut out = Vec::new();
    let report = DeletionLoop::new(&graph, &mut out)
        .with_outer_sleep(Duration::from_millis(1))
        .run()
        .await
        .unwrap();

    assert_eq!(report.outer_iterations, 2);
    assert_eq!(report.deleted, 2);
}

/// Scenario 5: a tracker whose deleter always returns DependencyViolation
/// never converges. Expect a terminal error after exactly the 31st
/// no-progress outer iteration.
#[tokio::test]
async fn never_satisfied_dependency_aborts_after_31_no_progress_iterations() {
    let stuck = tracker(Kind::Vpc, "stuck", Arc::new(AlwaysFails));
    let graph = ResourceGraph::assemble(vec![stuck]);
    let mut out = Vec::new();
    let result = DeletionLoop::new(&graph, &mut out)
        .with_outer_sleep(Duration::from_millis(0))
        .run()
        .await;

    assert!(result.is_err());
    // One phase attempt per outer iteration; 31 total before giving up.
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.matches("still has dependencies").count(), 31);
}

#[test]
fn assembly_dedupes_edges_added_from_both_directions() {
    let a = GraphKey::new(Kind::Vpc, "A");
    let b = GraphKey::new(Kind::Subnet, "B");

    let mut subnet = tracker(Kind::Subnet, "B", Arc::new(AlwaysFails));
    subnet.blocks_on(a.clone());
    let mut vpc = tracker(Kind::Vpc, "A", Arc::new(AlwaysFails));
    vpc.blocked_by(b.clone());

    // `subnet.blocks_on(vpc)` and `vpc.blocked_by(subnet)` both say the vpc
    // waits on the subnet; assembly must not duplicate that edge.
    let graph = ResourceGraph::assemble(vec![vpc, subnet]);
    assert_eq!(graph.edges.get(&a).map(|s| s.len()), Some(1));
}

#[test]
fn dangling_dependency_is_trivially_satisfied() {
    let missing = GraphKey::new(Kind::Vpc, "gone");
    let mut only = tracker(Kind::Subnet, "B", Arc::new(AlwaysFails));
    only.blocked_by(missing.clone());
    let graph = ResourceGraph::assemble(vec![only]);
    let key = GraphKey::new(Kind::Subnet, "B");
    assert!(graph.is_satisfied(&missing, &std::collections::HashSet::new()));
    assert!(graph.dependencies_of(&key).any(|d| *d == missing));
}
