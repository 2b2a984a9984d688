// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::key::GraphKey;
use crate::kind::Kind;

/// The result of classifying a failed provider-side delete call (§7 of the
/// design: transient/dependency-violation vs. everything else is retryable
/// too, but logged distinctly).
#[derive(Debug, Clone)]
pub enum DeleteError {
    /// The provider refused because something still references the target.
    /// Always retryable on the next outer iteration.
    DependencyViolation,
    /// Any other non-not-found error. Also retryable, but logged with the
    /// raw provider message so an operator can tell the two apart.
    Other(String),
}

impl fmt::Display for DeleteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteError::DependencyViolation => write!(f, "still has dependencies"),
            DeleteError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// The bound, idempotent deletion operation for one tracker.
///
/// Implementations live in the `cloud` crate (one per resource kind); `graph`
/// only needs to know that a tracker can be asked to delete itself and will
/// report whether the attempt should be retried. Observing "not found" on
/// the provider must be folded into `Ok(())` by the implementation — from
/// the deletion loop's perspective, idempotent-success and actual-deletion
/// are indistinguishable.
#[async_trait]
pub trait Deleter: Send + Sync {
    async fn delete(&self) -> Result<(), DeleteError>;
}

/// One deletable cloud resource, discovered during the fan-out in `cloud`
/// and tracked through graph assembly and the deletion loop.
///
/// `done` is deliberately not a field here: every mutation of it must be
/// serialized across concurrently-dispatched deleters (§5), so it lives in a
/// single `HashSet` behind one mutex in [`crate::ResourceGraph`]'s deletion
/// loop rather than being duplicated per-tracker, addressable only through
/// the owning graph rather than through a free-floating handle to the
/// tracker.
pub struct Tracker {
    kind: Kind,
    id: String,
    name: String,
    blocks: HashSet<GraphKey>,
    blocked: HashSet<GraphKey>,
    already_done: bool,
    deleter: Arc<dyn Deleter>,
}

impl Tracker {
    pub fn new(kind: Kind, id: impl Into<String>, name: impl Into<String>, deleter: Arc<dyn Deleter>) -> Tracker {
        Tracker {
            kind,
            id: id.into(),
            name: name.into(),
            blocks: HashSet::new(),
            blocked: HashSet::new(),
            already_done: false,
            deleter,
        }
    }

    /// Marks this tracker as already deleted at discovery time, so it is
    /// retired from the working set as soon as graph assembly completes
    /// (§4.2: "Trackers whose `done` is already set at end of assembly are
    /// moved into the done set immediately"). No lister in this workspace
    /// currently produces one of these; the hook exists so a future lister
    /// that discovers a resource already mid-teardown can skip dispatching
    /// a delete call for it.
    pub fn mark_already_done(mut self) -> Tracker {
        self.already_done = true;
        self
    }

    pub fn key(&self) -> GraphKey {
        GraphKey::new(self.kind, self.id.clone())
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_already_done(&self) -> bool {
        self.already_done
    }

    /// Declares that this tracker blocks `key`'s deletion: `key` is not
    /// eligible for deletion until this tracker is done or absent from the
    /// graph. An instance calls `blocks_on(vpc)` to say the vpc must wait
    /// for the instance, not the other way around.
    pub fn blocks_on(&mut self, key: GraphKey) {
        self.blocks.insert(key);
    }

    /// Declares the inverse edge: this tracker is the one waiting, on
    /// `key`. A route table calls `blocked_by(subnet)` for each subnet it is
    /// associated with, so the route table is not eligible until that
    /// subnet is done.
    pub fn blocked_by(&mut self, key: GraphKey) {
        self.blocked.insert(key);
    }

    pub fn blocks(&self) -> &HashSet<GraphKey> {
        &self.blocks
    }

    pub fn blocked(&self) -> &HashSet<GraphKey> {
        &self.blocked
    }

    pub(crate) fn deleter(&self) -> Arc<dyn Deleter> {
        Arc::clone(&self.deleter)
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("key", &self.key().to_string())
            .field("name", &self.name)
            .field("blocks", &self.blocks)
            .field("blocked", &self.blocked)
            .finish()
    }
}
