//! List envelopes and list filters.

use serde::{Deserialize, Serialize};

use crate::resource::{ClusterId, ClusterState};

/// The envelope every list endpoint answers with: `{"data": [...]}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Collection<T> {
    /// The listed resources.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Collection<T> {
    /// Wrap a list of resources.
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

/// Query-string filters applied to a list request.
///
/// Keys may repeat (`state_ne=inactive&state_ne=stopped`), so filters are
/// kept as ordered pairs rather than a map.
///
/// # Examples
///
/// ```
/// use devtool_models::ListOpts;
///
/// let opts = ListOpts::new().filter("name", "team-x");
/// assert_eq!(opts.pairs(), &[("name".to_string(), "team-x".to_string())]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOpts {
    filters: Vec<(String, String)>,
}

impl ListOpts {
    /// An empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one `key=value` filter.
    #[must_use]
    pub fn filter(mut self, key: &str, value: impl ToString) -> Self {
        self.filters.push((key.to_string(), value.to_string()));
        self
    }

    /// The filters as ordered `(key, value)` pairs.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.filters
    }

    /// All values given for `key`, in order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.filters
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Filters used when listing clusters.
    ///
    /// No result limit, every cluster visible to the caller, removed and
    /// system clusters hidden, and clusters in an [excluded
    /// state](ClusterState::EXCLUDED) skipped.
    pub fn clusters() -> Self {
        let mut opts = Self::new()
            .filter("limit", -1)
            .filter("all", true)
            .filter("removed_null", 1)
            .filter("system", false);
        for state in ClusterState::EXCLUDED {
            opts = opts.filter("state_ne", state);
        }
        opts
    }

    /// Filters used when listing the projects of one cluster.
    pub fn projects_in(cluster: &ClusterId) -> Self {
        Self::new().filter("limit", -1).filter("clusterId", cluster)
    }

    /// Filters used when listing namespaces.
    pub fn namespaces() -> Self {
        Self::new().filter("limit", -1)
    }
}

impl From<Vec<(String, String)>> for ListOpts {
    fn from(filters: Vec<(String, String)>) -> Self {
        Self { filters }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_filters_exclude_inactive_states() {
        let opts = ListOpts::clusters();
        let excluded: Vec<&str> = opts.values("state_ne").collect();
        assert_eq!(excluded, vec!["inactive", "stopped", "removing"]);
        assert_eq!(opts.values("limit").collect::<Vec<_>>(), vec!["-1"]);
        assert_eq!(opts.values("system").collect::<Vec<_>>(), vec!["false"]);
    }

    #[test]
    fn project_filters_carry_cluster() {
        let opts = ListOpts::projects_in(&ClusterId::new("c-1"));
        assert_eq!(opts.values("clusterId").collect::<Vec<_>>(), vec!["c-1"]);
    }

    #[test]
    fn collection_tolerates_missing_data() {
        let c: Collection<String> = serde_json::from_str(r#"{"type":"collection"}"#).unwrap();
        assert!(c.data.is_empty());
    }
}
