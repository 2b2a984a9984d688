// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::sync::Arc;

use async_trait::async_trait;
use graph::{DeleteError, Deleter, Kind};

use crate::client::CloudClient;
use crate::error::CloudError;

/// The bound deletion operation for one tracker. Dispatch on kind is static
/// (a `match` over the closed `Kind` enum) rather than one struct per kind,
/// per the tagged-variant approach the design favors when the kind set is
/// closed at compile time.
pub struct KindDeleter {
    client: Arc<dyn CloudClient>,
    kind: Kind,
    id: String,
}

impl KindDeleter {
    pub fn new(client: Arc<dyn CloudClient>, kind: Kind, id: impl Into<String>) -> Arc<KindDeleter> {
        Arc::new(KindDeleter {
            client,
            kind,
            id: id.into(),
        })
    }
}

/// `NotFound` always folds into success (the `Deleter` contract); anything
/// else is classified for the caller by `to_delete_error`.
fn ok_if_not_found(result: Result<(), CloudError>) -> Result<Option<CloudError>, DeleteError> {
    match result {
        Ok(()) => Ok(None),
        Err(CloudError::NotFound(_)) => Ok(None),
        Err(other) => Ok(Some(other)),
    }
}

fn to_delete_error(err: CloudError) -> DeleteError {
    match err {
        CloudError::DependencyViolation(_) => DeleteError::DependencyViolation,
        CloudError::NotFound(msg) => DeleteError::Other(msg),
        CloudError::Other(msg) => DeleteError::Other(msg),
    }
}

#[async_trait]
impl Deleter for KindDeleter {
    async fn delete(&self) -> Result<(), DeleteError> {
        match self.kind {
            Kind::SecurityGroup => {
                if let Some(sg) = self
                    .client
                    .get(Kind::SecurityGroup, &self.id)
                    .await
                    .map_err(to_delete_error)?
                {
                    if sg.has_ip_permissions {
                        self.client
                            .revoke_security_group_ingress(&self.id)
                            .await
                            .map_err(to_delete_error)?;
                    }
                } else {
                    return Ok(());
                }
                if let Some(err) =
                    ok_if_not_found(self.client.delete(Kind::SecurityGroup, &self.id).await)?
                {
                    return Err(to_delete_error(err));
                }
                Ok(())
            }
            Kind::InternetGateway => {
                let Some(igw) = self
                    .client
                    .get(Kind::InternetGateway, &self.id)
                    .await
                    .map_err(to_delete_error)?
                else {
                    return Ok(());
                };
                for vpc_id in &igw.vpc_ids {
                    self.client
                        .detach_internet_gateway(&self.id, vpc_id)
                        .await
                        .map_err(to_delete_error)?;
                }
                if let Some(err) =
                    ok_if_not_found(self.client.delete(Kind::InternetGateway, &self.id).await)?
                {
                    return Err(to_delete_error(err));
                }
                Ok(())
            }
            Kind::LaunchConfig => {
                // The original never classifies launch configuration delete
                // errors; every failure is treated as non-retryable here too.
                self.client
                    .delete(Kind::LaunchConfig, &self.id)
                    .await
                    .map_err(|e| DeleteError::Other(e.to_string()))
            }
            _ => {
                if let Some(err) = ok_if_not_found(self.client.delete(self.kind, &self.id).await)? {
                    return Err(to_delete_error(err));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockCloudClient;
    use crate::resource::Resource;

    #[tokio::test]
    async fn security_group_revokes_ingress_before_deleting() {
        let client = MockCloudClient::new();
        client.seed(
            Kind::SecurityGroup,
            Resource {
                id: "sg-1".into(),
                has_ip_permissions: true,
                ..Default::default()
            },
        );
        let deleter = KindDeleter::new(client.clone(), Kind::SecurityGroup, "sg-1");
        deleter.delete().await.unwrap();
        assert!(client.get(Kind::SecurityGroup, "sg-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn internet_gateway_detaches_every_attachment_then_deletes() {
        let client = MockCloudClient::new();
        client.seed(
            Kind::InternetGateway,
            Resource {
                id: "igw-1".into(),
                vpc_ids: vec!["vpc-1".into()],
                ..Default::default()
            },
        );
        let deleter = KindDeleter::new(client.clone(), Kind::InternetGateway, "igw-1");
        deleter.delete().await.unwrap();
        assert!(client.get(Kind::InternetGateway, "igw-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_internet_gateway_is_trivially_ok() {
        let client = MockCloudClient::new();
        let deleter = KindDeleter::new(client, Kind::InternetGateway, "igw-gone");
        deleter.delete().await.unwrap();
    }

    #[tokio::test]
    async fn launch_config_failure_is_never_classified_as_dependency_violation() {
        let client = MockCloudClient::new();
        client.fail_next_deletes(Kind::LaunchConfig, "lc-1", 1);
        client.seed(
            Kind::LaunchConfig,
            Resource {
                id: "lc-1".into(),
                ..Default::default()
            },
        );
        let deleter = KindDeleter::new(client, Kind::LaunchConfig, "lc-1");
        let err = deleter.delete().await.unwrap_err();
        assert!(matches!(err, DeleteError::Other(_)));
    }

    #[tokio::test]
    async fn volume_not_found_is_ok() {
        let client = MockCloudClient::new();
        let deleter = KindDeleter::new(client, Kind::Volume, "vol-gone");
        deleter.delete().await.unwrap();
    }

    #[tokio::test]
    async fn dependency_violation_propagates_as_retryable() {
        let client = MockCloudClient::new();
        client.seed(
            Kind::Vpc,
            Resource {
                id: "vpc-1".into(),
                ..Default::default()
            },
        );
        client.fail_next_deletes(Kind::Vpc, "vpc-1", 1);
        let deleter = KindDeleter::new(client, Kind::Vpc, "vpc-1");
        assert!(matches!(
            deleter.delete().await.unwrap_err(),
            DeleteError::DependencyViolation
        ));
    }
}
