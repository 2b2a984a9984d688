// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The cloud client contract, error taxonomy, per-kind listers and
//! deleters, and the discovery fan-out (§4.1, §6, §7 of the design).

mod client;
mod deleter;
mod error;
mod launchconfig;
mod listers;
mod resource;
mod tags;

pub use client::{CloudClient, MockCloudClient};
pub use deleter::KindDeleter;
pub use error::CloudError;
pub use launchconfig::user_data_matches_cluster;
pub use listers::discover;
pub use resource::Resource;
pub use tags::{cluster_tag_filters, matches_cluster, TagFilter};
