//! Management API resources: clusters, projects and namespaces.
//!
//! Every resource carries a server-assigned identifier and a human-chosen
//! name.  Projects belong to a cluster and namespaces belong to a project;
//! the owning identifier travels with the child so lookups can be scoped
//! without any client-side session state.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between the cluster and project parts of a [`ProjectId`].
const PROJECT_ID_SEPARATOR: char = ':';

// ---------------------------------------------------------------------------
// ClusterId
// ---------------------------------------------------------------------------

/// Server-assigned identifier of a cluster (e.g. `c-7k2pq`).
///
/// # Examples
///
/// ```
/// use devtool_models::ClusterId;
///
/// let id = ClusterId::new("c-7k2pq");
/// assert_eq!(id.to_string(), "c-7k2pq");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ClusterId(String);

impl ClusterId {
    /// Create a new `ClusterId` from a string slice.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl FromStr for ClusterId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ProjectId
// ---------------------------------------------------------------------------

/// Server-assigned identifier of a project.
///
/// Project identifiers embed the owning cluster: `{cluster}:{project}`.
///
/// # Examples
///
/// ```
/// use devtool_models::{ClusterId, ProjectId};
///
/// let id = ProjectId::new("c-7k2pq:p-x9f4d");
/// assert_eq!(id.cluster_id(), Some(ClusterId::new("c-7k2pq")));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProjectId(String);

impl ProjectId {
    /// Create a new `ProjectId` from a string slice.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Build a project identifier from its cluster and project parts.
    pub fn compose(cluster: &ClusterId, project_part: &str) -> Self {
        Self(format!("{cluster}{PROJECT_ID_SEPARATOR}{project_part}"))
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The cluster this project lives in, if the identifier is well formed.
    pub fn cluster_id(&self) -> Option<ClusterId> {
        self.0
            .split_once(PROJECT_ID_SEPARATOR)
            .map(|(cluster, _)| cluster)
            .filter(|cluster| !cluster.is_empty())
            .map(ClusterId::new)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl FromStr for ProjectId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ClusterState
// ---------------------------------------------------------------------------

/// Lifecycle state reported for a cluster.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClusterState {
    /// Ready to serve workloads.
    Active,
    /// Being created.
    Provisioning,
    /// Being reconfigured.
    Updating,
    /// Agent lost contact.
    Unavailable,
    /// Not running.
    Inactive,
    /// Stopped by an operator.
    Stopped,
    /// Being deleted.
    Removing,
    /// Any state this tool does not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ClusterState {
    /// States that are excluded from cluster listings.
    pub const EXCLUDED: [ClusterState; 3] = [Self::Inactive, Self::Stopped, Self::Removing];
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A downstream Kubernetes cluster managed by the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Server-assigned identifier.
    pub id: ClusterId,
    /// Display name.
    pub name: String,
    /// Lifecycle state.
    #[serde(default)]
    pub state: ClusterState,
    /// Whether this is the server's own (system) cluster.
    #[serde(default)]
    pub internal: bool,
}

/// A tenancy boundary inside a cluster.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Server-assigned identifier (`{cluster}:{project}`).
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Owning cluster.
    pub cluster_id: ClusterId,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Request body for creating a project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    /// Display name.
    pub name: String,
    /// Owning cluster.
    pub cluster_id: ClusterId,
    /// Free-form description.
    pub description: String,
}

/// A Kubernetes namespace assigned to a project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    /// Server-assigned identifier (the namespace name in practice).
    pub id: String,
    /// Namespace name.
    pub name: String,
    /// Owning project.
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

/// Request body for creating a namespace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewNamespace {
    /// Namespace name.
    pub name: String,
    /// Owning project.
    pub project_id: ProjectId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_id_splits_cluster() {
        let id = ProjectId::new("c-abc12:p-xyz89");
        assert_eq!(id.cluster_id(), Some(ClusterId::new("c-abc12")));
    }

    #[test]
    fn project_id_without_separator_has_no_cluster() {
        assert_eq!(ProjectId::new("p-xyz89").cluster_id(), None);
        assert_eq!(ProjectId::new(":p-xyz89").cluster_id(), None);
    }

    #[test]
    fn project_id_compose() {
        let id = ProjectId::compose(&ClusterId::new("c-1"), "p-2");
        assert_eq!(id.as_str(), "c-1:p-2");
    }

    #[test]
    fn cluster_deserializes_from_api_json() {
        let json = r#"{
            "id": "c-abc12",
            "name": "cluster-a",
            "state": "active",
            "type": "cluster",
            "links": {"self": "https://rancher/v3/clusters/c-abc12"}
        }"#;
        let cluster: Cluster = serde_json::from_str(json).unwrap();
        assert_eq!(cluster.id.as_str(), "c-abc12");
        assert_eq!(cluster.state, ClusterState::Active);
        assert!(!cluster.internal);
    }

    #[test]
    fn unknown_cluster_state_is_tolerated() {
        let json = r#"{"id": "c-1", "name": "a", "state": "upgrading"}"#;
        let cluster: Cluster = serde_json::from_str(json).unwrap();
        assert_eq!(cluster.state, ClusterState::Unknown);
    }

    #[test]
    fn new_project_serializes_camel_case() {
        let body = NewProject {
            name: "team-x".into(),
            cluster_id: ClusterId::new("c-1"),
            description: "team-x".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["clusterId"], "c-1");
        assert_eq!(json["description"], "team-x");
    }

    #[test]
    fn cluster_state_display() {
        assert_eq!(ClusterState::Removing.to_string(), "removing");
        assert_eq!("stopped".parse::<ClusterState>().unwrap(), ClusterState::Stopped);
    }
}
