// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;

/// One `{name = "tag:<key>", value = "<v>"}` filter (§6, wire format).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub name: String,
    pub value: String,
}

impl TagFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> TagFilter {
        TagFilter {
            name: format!("tag:{}", key.into()),
            value: value.into(),
        }
    }

    fn key(&self) -> &str {
        self.name.strip_prefix("tag:").unwrap_or(&self.name)
    }

    fn matches(&self, tags: &HashMap<String, String>) -> bool {
        tags.get(self.key()).is_some_and(|v| v == &self.value)
    }
}

/// The cluster-identifying tag sets a resource may carry. A resource
/// belongs to the cluster if it satisfies *all* filters in *any* one set —
/// the modern `kubernetes.io/cluster/<name>=owned` tag, or the legacy
/// `KubernetesCluster=<name>` tag, so that clusters tagged either way are
/// discovered (the original only resolves one tag set from the cloud
/// object's own `Tags()`; this rewrite checks both forms explicitly).
pub fn cluster_tag_filters(cluster_name: &str) -> Vec<Vec<TagFilter>> {
    vec![
        vec![TagFilter::new(
            format!("kubernetes.io/cluster/{cluster_name}"),
            "owned",
        )],
        vec![TagFilter::new("KubernetesCluster", cluster_name)],
    ]
}

/// True if `tags` satisfies every filter in at least one of the cluster's
/// tag sets (conjunction within a set, disjunction across sets).
pub fn matches_cluster(tags: &HashMap<String, String>, cluster_name: &str) -> bool {
    cluster_tag_filters(cluster_name)
        .iter()
        .any(|set| set.iter().all(|f| f.matches(tags)))
}

#[cfg(test)]
mod tests {
    use super::matches_cluster;
    use std::collections::HashMap;

    #[test]
    fn matches_modern_tag_form() {
        let mut tags = HashMap::new();
        tags.insert("kubernetes.io/cluster/prod".to_string(), "owned".to_string());
        assert!(matches_cluster(&tags, "prod"));
    }

    #[test]
    fn matches_legacy_tag_form() {
        let mut tags = HashMap::new();
        tags.insert("KubernetesCluster".to_string(), "prod".to_string());
        assert!(matches_cluster(&tags, "prod"));
    }

    #[test]
    fn rejects_resources_from_other_clusters() {
        let mut tags = HashMap::new();
        tags.insert("kubernetes.io/cluster/staging".to_string(), "owned".to_string());
        assert!(!matches_cluster(&tags, "prod"));
    }

    #[test]
    fn rejects_untagged_resources() {
        assert!(!matches_cluster(&HashMap::new(), "prod"));
    }
}
