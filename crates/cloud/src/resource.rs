// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One provider-side object as described by `CloudClient`. This is a single
/// shape wide enough to cover every kind in the reaper's closed set; each
/// lister reads only the fields relevant to its kind, the way the original
/// tool's per-kind `Describe*` calls each returned a differently-shaped SDK
/// struct but were funneled into the same `ResourceTracker`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Compute instance lifecycle state (e.g. `running`, `terminated`).
    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub dhcp_options_id: Option<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default)]
    pub volume_ids: Vec<String>,

    /// Route table associations, ELB subnets, or an ASG's zone identifier
    /// list, depending on kind.
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    /// Internet gateway attachments.
    #[serde(default)]
    pub vpc_ids: Vec<String>,

    #[serde(default)]
    pub launch_configuration_name: Option<String>,
    /// Base64-encoded launch configuration user-data.
    #[serde(default)]
    pub user_data: Option<String>,

    #[serde(default)]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub allocation_id: Option<String>,

    /// Whether a security group currently has ingress rules that must be
    /// revoked before it can be deleted.
    #[serde(default)]
    pub has_ip_permissions: bool,
}
