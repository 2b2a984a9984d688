// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The `reap` subcommand: discover every resource tagged for a cluster,
//! assemble the dependency graph, and drive it to convergence.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use cloud::{CloudClient, MockCloudClient};
use graph::latch::StopLatch;
use graph::{DeletionLoop, Kind, ResourceGraph};
use log::info;

pub async fn run(cluster_name: &str, mock_state_path: Option<&str>) -> Result<(), String> {
    let client: Arc<dyn CloudClient> = match mock_state_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read mock state file {path}: {e}"))?;
            MockCloudClient::from_json(&json)?
        }
        None => MockCloudClient::new(),
    };

    println!("Deleting cluster resources for {cluster_name:?}");
    info!("starting discovery for cluster {cluster_name}");

    let trackers = cloud::discover(client, cluster_name).await?;

    let mut counts: BTreeMap<Kind, usize> = BTreeMap::new();
    for tracker in &trackers {
        *counts.entry(tracker.kind()).or_default() += 1;
    }
    for (kind, count) in &counts {
        println!("  {kind}: {count}");
    }
    if trackers.is_empty() {
        println!("no resources found for cluster {cluster_name:?}");
        return Ok(());
    }

    let graph = ResourceGraph::assemble(trackers);
    let stop = StopLatch::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("received interrupt, will stop after the current outer iteration");
                stop.trigger();
            }
        });
    }
    let loop_ = DeletionLoop::new(&graph, io::stdout()).with_stop_latch(stop);
    let report = loop_.run().await?;

    println!(
        "deleted {} resource(s) in {} outer iteration(s)",
        report.deleted, report.outer_iterations
    );
    Ok(())
}
