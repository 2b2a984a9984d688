// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashSet;
use std::sync::Arc;

use graph::{GraphKey, Kind, Tracker};

use crate::client::CloudClient;
use crate::deleter::KindDeleter;
use crate::launchconfig::user_data_matches_cluster;
use crate::resource::Resource;
use crate::tags::matches_cluster;

fn tracker_for(client: &Arc<dyn CloudClient>, kind: Kind, resource: &Resource) -> Tracker {
    Tracker::new(
        kind,
        resource.id.clone(),
        resource.name.clone(),
        KindDeleter::new(client.clone(), kind, resource.id.clone()),
    )
}

async fn list_tagged(
    client: &Arc<dyn CloudClient>,
    kind: Kind,
    cluster_name: &str,
) -> Result<Vec<Resource>, String> {
    let all = client.list_all(kind).await.map_err(|e| e.to_string())?;
    Ok(all
        .into_iter()
        .filter(|r| matches_cluster(&r.tags, cluster_name))
        .collect())
}

async fn list_subnets(client: &Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    Ok(list_tagged(client, Kind::Subnet, cluster_name)
        .await?
        .iter()
        .map(|r| {
            let mut t = tracker_for(client, Kind::Subnet, r);
            if let Some(vpc_id) = &r.vpc_id {
                t.blocks_on(GraphKey::new(Kind::Vpc, vpc_id.clone()));
            }
            t
        })
        .collect())
}

async fn list_route_tables(client: &Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    Ok(list_tagged(client, Kind::RouteTable, cluster_name)
        .await?
        .iter()
        .map(|r| {
            let mut t = tracker_for(client, Kind::RouteTable, r);
            if let Some(vpc_id) = &r.vpc_id {
                t.blocks_on(GraphKey::new(Kind::Vpc, vpc_id.clone()));
            }
            for subnet_id in &r.subnet_ids {
                t.blocked_by(GraphKey::new(Kind::Subnet, subnet_id.clone()));
            }
            t
        })
        .collect())
}

async fn list_security_groups(client: &Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    Ok(list_tagged(client, Kind::SecurityGroup, cluster_name)
        .await?
        .iter()
        .map(|r| {
            let mut t = tracker_for(client, Kind::SecurityGroup, r);
            if let Some(vpc_id) = &r.vpc_id {
                t.blocks_on(GraphKey::new(Kind::Vpc, vpc_id.clone()));
            }
            t
        })
        .collect())
}

async fn list_instances(client: &Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    Ok(list_tagged(client, Kind::Instance, cluster_name)
        .await?
        .iter()
        .filter(|r| r.state.as_deref() != Some("terminated"))
        .map(|r| {
            let mut t = tracker_for(client, Kind::Instance, r);
            if let Some(vpc_id) = &r.vpc_id {
                t.blocks_on(GraphKey::new(Kind::Vpc, vpc_id.clone()));
            }
            for volume_id in &r.volume_ids {
                t.blocks_on(GraphKey::new(Kind::Volume, volume_id.clone()));
            }
            for sg_id in &r.security_group_ids {
                t.blocks_on(GraphKey::new(Kind::SecurityGroup, sg_id.clone()));
            }
            if let Some(subnet_id) = &r.subnet_id {
                t.blocks_on(GraphKey::new(Kind::Subnet, subnet_id.clone()));
            }
            t
        })
        .collect())
}

async fn list_dhcp_options(client: &Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    Ok(list_tagged(client, Kind::DhcpOptions, cluster_name)
        .await?
        .iter()
        .map(|r| tracker_for(client, Kind::DhcpOptions, r))
        .collect())
}

async fn list_internet_gateways(client: &Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    Ok(list_tagged(client, Kind::InternetGateway, cluster_name)
        .await?
        .iter()
        .map(|r| {
            let mut t = tracker_for(client, Kind::InternetGateway, r);
            for vpc_id in &r.vpc_ids {
                if !vpc_id.is_empty() {
                    t.blocks_on(GraphKey::new(Kind::Vpc, vpc_id.clone()));
                }
            }
            t
        })
        .collect())
}

async fn list_vpcs(client: &Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    Ok(list_tagged(client, Kind::Vpc, cluster_name)
        .await?
        .iter()
        .map(|r| {
            let mut t = tracker_for(client, Kind::Vpc, r);
            if let Some(dhcp_id) = &r.dhcp_options_id {
                t.blocks_on(GraphKey::new(Kind::DhcpOptions, dhcp_id.clone()));
            }
            t
        })
        .collect())
}

/// Lists volumes, then the elastic-IP side-channel (§4.1): volumes tagged
/// `kubernetes.io/master-ip` name a public IP that should be released
/// alongside the cluster even though elastic IPs carry no cluster tag of
/// their own.
async fn list_volumes_and_elastic_ips(
    client: &Arc<dyn CloudClient>,
    cluster_name: &str,
) -> Result<Vec<Tracker>, String> {
    let volumes = list_tagged(client, Kind::Volume, cluster_name).await?;
    let mut trackers: Vec<Tracker> = volumes.iter().map(|r| tracker_for(client, Kind::Volume, r)).collect();

    let mut elastic_ips: HashSet<String> = HashSet::new();
    for volume in &volumes {
        if let Some(ip) = volume.tags.get("kubernetes.io/master-ip") {
            if !ip.is_empty() {
                elastic_ips.insert(ip.clone());
            }
        }
    }

    if !elastic_ips.is_empty() {
        let addresses = client.describe_addresses().await.map_err(|e| e.to_string())?;
        for address in addresses {
            let Some(ip) = &address.public_ip else { continue };
            if !elastic_ips.contains(ip) {
                continue;
            }
            let allocation_id = address.allocation_id.clone().unwrap_or_default();
            trackers.push(Tracker::new(
                Kind::ElasticIp,
                allocation_id.clone(),
                ip.clone(),
                KindDeleter::new(client.clone(), Kind::ElasticIp, allocation_id),
            ));
        }
    }

    Ok(trackers)
}

async fn list_load_balancers(client: &Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    Ok(list_tagged(client, Kind::LoadBalancer, cluster_name)
        .await?
        .iter()
        .map(|r| {
            let mut t = tracker_for(client, Kind::LoadBalancer, r);
            for sg_id in &r.security_group_ids {
                t.blocks_on(GraphKey::new(Kind::SecurityGroup, sg_id.clone()));
            }
            for subnet_id in &r.subnet_ids {
                t.blocks_on(GraphKey::new(Kind::Subnet, subnet_id.clone()));
            }
            if let Some(vpc_id) = &r.vpc_id {
                t.blocks_on(GraphKey::new(Kind::Vpc, vpc_id.clone()));
            }
            t
        })
        .collect())
}

async fn list_autoscaling_groups(client: &Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    Ok(list_tagged(client, Kind::AutoscalingGroup, cluster_name)
        .await?
        .iter()
        .map(|r| {
            let mut t = tracker_for(client, Kind::AutoscalingGroup, r);
            for subnet_id in &r.subnet_ids {
                if !subnet_id.is_empty() {
                    t.blocks_on(GraphKey::new(Kind::Subnet, subnet_id.clone()));
                }
            }
            if let Some(lc_name) = &r.launch_configuration_name {
                t.blocks_on(GraphKey::new(Kind::LaunchConfig, lc_name.clone()));
            }
            t
        })
        .collect())
}

/// Launch configurations carry no tags; membership is decided purely by
/// `user_data_matches_cluster` (§4.1, scenario 4).
async fn list_launch_configs(client: &Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    let all = client
        .list_all(Kind::LaunchConfig)
        .await
        .map_err(|e| e.to_string())?;
    Ok(all
        .iter()
        .filter(|r| {
            r.user_data
                .as_deref()
                .is_some_and(|u| user_data_matches_cluster(u, cluster_name))
        })
        .map(|r| tracker_for(client, Kind::LaunchConfig, r))
        .collect())
}

/// After all tagged listers complete, synthesizes a tracker for every
/// internet gateway attached to a network already in the graph but not
/// itself discovered — gateways were never tagged by the deployer this
/// tool grew up alongside (§4.1's implicit internet-gateway edge).
async fn list_implicit_internet_gateways(
    client: &Arc<dyn CloudClient>,
    trackers: &[Tracker],
) -> Result<Vec<Tracker>, String> {
    let discovered_vpcs: HashSet<&str> = trackers
        .iter()
        .filter(|t| t.kind() == Kind::Vpc)
        .map(|t| t.id())
        .collect();
    let discovered_gateways: HashSet<&str> = trackers
        .iter()
        .filter(|t| t.kind() == Kind::InternetGateway)
        .map(|t| t.id())
        .collect();

    let all_gateways = client
        .list_all(Kind::InternetGateway)
        .await
        .map_err(|e| e.to_string())?;

    let mut implicit = Vec::new();
    for gateway in all_gateways {
        if discovered_gateways.contains(gateway.id.as_str()) {
            continue;
        }
        let attached_to_known_vpc = gateway
            .vpc_ids
            .iter()
            .any(|vpc_id| discovered_vpcs.contains(vpc_id.as_str()));
        if !attached_to_known_vpc {
            continue;
        }
        let mut t = tracker_for(client, Kind::InternetGateway, &gateway);
        for vpc_id in &gateway.vpc_ids {
            if discovered_vpcs.contains(vpc_id.as_str()) {
                t.blocks_on(GraphKey::new(Kind::Vpc, vpc_id.clone()));
            }
        }
        implicit.push(t);
    }
    Ok(implicit)
}

/// Runs every lister for `cluster_name` and returns the full discovered set,
/// implicit internet gateways included (§4.1). Any lister error aborts
/// discovery; partial results are never returned.
pub async fn discover(client: Arc<dyn CloudClient>, cluster_name: &str) -> Result<Vec<Tracker>, String> {
    let mut trackers = Vec::new();
    trackers.extend(list_subnets(&client, cluster_name).await?);
    trackers.extend(list_route_tables(&client, cluster_name).await?);
    trackers.extend(list_security_groups(&client, cluster_name).await?);
    trackers.extend(list_instances(&client, cluster_name).await?);
    trackers.extend(list_dhcp_options(&client, cluster_name).await?);
    trackers.extend(list_internet_gateways(&client, cluster_name).await?);
    trackers.extend(list_vpcs(&client, cluster_name).await?);
    trackers.extend(list_volumes_and_elastic_ips(&client, cluster_name).await?);
    trackers.extend(list_load_balancers(&client, cluster_name).await?);
    trackers.extend(list_autoscaling_groups(&client, cluster_name).await?);
    trackers.extend(list_launch_configs(&client, cluster_name).await?);

    let implicit = list_implicit_internet_gateways(&client, &trackers).await?;
    log::debug!("discovered {} implicit internet gateway(s)", implicit.len());
    trackers.extend(implicit);

    log::debug!("discovery for cluster {cluster_name:?} found {} resource(s)", trackers.len());
    Ok(trackers)
}
