// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use graph::Kind;
use parking_lot::Mutex;

use crate::error::CloudError;
use crate::resource::Resource;

/// The abstract cloud client contract (§6): page-iterating filter queries
/// folded into a flat `Vec`, plus the handful of per-kind pre-step
/// operations the deleters need. Real pagination, credentials, and region
/// resolution live entirely on the other side of this trait — out of
/// scope here, same as `fs`'s `Vfs` trait hides the underlying syscalls
/// behind `stat`/`scandir`.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Every resource of `kind`, tags included, with no filtering applied.
    /// Listers filter by cluster tags in-process (§4.1), matching kinds
    /// whose tags live on a sibling object just as easily as kinds with
    /// native tag filters.
    async fn list_all(&self, kind: Kind) -> Result<Vec<Resource>, CloudError>;

    /// A single resource by id, or `None` if it no longer exists.
    async fn get(&self, kind: Kind, id: &str) -> Result<Option<Resource>, CloudError>;

    /// Deletes (or releases, for elastic IPs) the resource. Implementors
    /// report `CloudError::NotFound` for an already-gone target rather than
    /// silently succeeding, so callers can fold it into success themselves
    /// (§4.4's per-kind not-found table).
    async fn delete(&self, kind: Kind, id: &str) -> Result<(), CloudError>;

    /// Security-group pre-step: revokes every ingress rule so the group
    /// itself can subsequently be deleted.
    async fn revoke_security_group_ingress(&self, id: &str) -> Result<(), CloudError>;

    /// Internet-gateway pre-step: detaches the gateway from one network.
    async fn detach_internet_gateway(&self, id: &str, vpc_id: &str) -> Result<(), CloudError>;

    /// All elastic IP addresses in the account, used by the volume
    /// lister's elastic-IP side-channel (§4.1).
    async fn describe_addresses(&self) -> Result<Vec<Resource>, CloudError>;
}

/// An in-memory `CloudClient` backed by a fixed set of resources, optionally
/// loaded from a JSON state file (`{"<kind>": [Resource, ...], ...}`). Used
/// both by the reaper binary's `--mock-state` flag and by this crate's own
/// tests, since there is no real provider to talk to in this workspace.
pub struct MockCloudClient {
    state: Mutex<HashMap<Kind, Vec<Resource>>>,
    /// Resources that should fail with a `DependencyViolation` the first
    /// `n` times `delete` is called, keyed by `(kind, id)`.
    pending_violations: Mutex<HashMap<(Kind, String), u32>>,
}

impl MockCloudClient {
    pub fn new() -> Arc<MockCloudClient> {
        Arc::new(MockCloudClient {
            state: Mutex::new(HashMap::new()),
            pending_violations: Mutex::new(HashMap::new()),
        })
    }

    /// Parses a JSON object mapping kind names to resource arrays, as
    /// written by `reaper --mock-state <file>`.
    pub fn from_json(json: &str) -> Result<Arc<MockCloudClient>, String> {
        let raw: HashMap<String, Vec<Resource>> =
            serde_json::from_str(json).map_err(|e| format!("invalid mock state: {e}"))?;
        let mut state = HashMap::new();
        for (kind_str, resources) in raw {
            let kind = kind_str.parse::<Kind>()?;
            state.insert(kind, resources);
        }
        Ok(Arc::new(MockCloudClient {
            state: Mutex::new(state),
            pending_violations: Mutex::new(HashMap::new()),
        }))
    }

    pub fn seed(&self, kind: Kind, resource: Resource) {
        self.state.lock().entry(kind).or_default().push(resource);
    }

    /// Makes `delete` return `DependencyViolation` for this resource the
    /// next `times` calls before allowing it through.
    pub fn fail_next_deletes(&self, kind: Kind, id: impl Into<String>, times: u32) {
        self.pending_violations.lock().insert((kind, id.into()), times);
    }
}

#[async_trait]
impl CloudClient for MockCloudClient {
    async fn list_all(&self, kind: Kind) -> Result<Vec<Resource>, CloudError> {
        Ok(self.state.lock().get(&kind).cloned().unwrap_or_default())
    }

    async fn get(&self, kind: Kind, id: &str) -> Result<Option<Resource>, CloudError> {
        Ok(self
            .state
            .lock()
            .get(&kind)
            .and_then(|rs| rs.iter().find(|r| r.id == id).cloned()))
    }

    async fn delete(&self, kind: Kind, id: &str) -> Result<(), CloudError> {
        {
            let mut pending = self.pending_violations.lock();
            if let Some(remaining) = pending.get_mut(&(kind, id.to_string())) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(CloudError::from_code(
                        "DependencyViolation",
                        format!("{kind}:{id} still has dependents"),
                    ));
                }
            }
        }
        let mut state = self.state.lock();
        let Some(resources) = state.get_mut(&kind) else {
            return Err(CloudError::from_code("NotFound", format!("{kind}:{id} not found")));
        };
        let before = resources.len();
        resources.retain(|r| r.id != id);
        if resources.len() == before {
            return Err(CloudError::from_code("NotFound", format!("{kind}:{id} not found")));
        }
        Ok(())
    }

    async fn revoke_security_group_ingress(&self, id: &str) -> Result<(), CloudError> {
        let mut state = self.state.lock();
        if let Some(sgs) = state.get_mut(&Kind::SecurityGroup) {
            if let Some(sg) = sgs.iter_mut().find(|r| r.id == id) {
                sg.has_ip_permissions = false;
            }
        }
        Ok(())
    }

    async fn detach_internet_gateway(&self, id: &str, vpc_id: &str) -> Result<(), CloudError> {
        let mut state = self.state.lock();
        if let Some(igws) = state.get_mut(&Kind::InternetGateway) {
            if let Some(igw) = igws.iter_mut().find(|r| r.id == id) {
                igw.vpc_ids.retain(|v| v != vpc_id);
            }
        }
        Ok(())
    }

    async fn describe_addresses(&self) -> Result<Vec<Resource>, CloudError> {
        Ok(self.state.lock().get(&Kind::ElasticIp).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_removes_the_resource() {
        let client = MockCloudClient::new();
        client.seed(
            Kind::Vpc,
            Resource {
                id: "vpc-1".into(),
                ..Default::default()
            },
        );
        client.delete(Kind::Vpc, "vpc-1").await.unwrap();
        assert!(client.get(Kind::Vpc, "vpc-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_of_missing_resource_is_not_found() {
        let client = MockCloudClient::new();
        let err = client.delete(Kind::Vpc, "vpc-missing").await.unwrap_err();
        assert!(matches!(err, CloudError::NotFound(_)));
    }

    #[tokio::test]
    async fn fail_next_deletes_retries_then_succeeds() {
        let client = MockCloudClient::new();
        client.seed(
            Kind::Vpc,
            Resource {
                id: "vpc-1".into(),
                ..Default::default()
            },
        );
        client.fail_next_deletes(Kind::Vpc, "vpc-1", 1);
        assert!(matches!(
            client.delete(Kind::Vpc, "vpc-1").await.unwrap_err(),
            CloudError::DependencyViolation(_)
        ));
        client.delete(Kind::Vpc, "vpc-1").await.unwrap();
    }
}
