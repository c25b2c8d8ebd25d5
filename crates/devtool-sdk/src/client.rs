//! Name-based lookups and idempotent provisioning on top of [`ManagementApi`].
//!
//! [`RancherClient`] resolves clusters, projects and namespaces by display
//! name and implements the "ensure" operations used by `dev-tool rancher
//! setup`:
//!
//! 1. resolve the parent resources (which must already exist);
//! 2. look the target up by name;
//! 3. create it only when the lookup reported [`ErrorKind::NotFound`].
//!
//! Any other lookup failure aborts without creating anything.  The pipeline
//! is not transactional: a concurrent creator between steps 2 and 3 can
//! still produce a duplicate on the server.
//!
//! [`ErrorKind::NotFound`]: crate::ErrorKind::NotFound
//!
//! # Typical usage
//!
//! ```rust,no_run
//! use devtool_sdk::get_client;
//!
//! # async fn run() -> Result<(), devtool_sdk::SdkError> {
//! let client = get_client("https://rancher.example.com", "token-abc12:s3cret")?;
//! let project = client.ensure_project("cluster-a", "team-x").await?;
//! let namespace = client.ensure_namespace("team-x-dev", "cluster-a", "team-x").await?;
//! println!("{} / {}", project.id, namespace.id);
//! # Ok(())
//! # }
//! ```

use devtool_models::{Cluster, ListOpts, Namespace, NewNamespace, NewProject, NewToken, Project, TokenRecord};
use tracing::{debug, info};

use crate::api::{HttpManagementApi, ManagementApi, ServerConfig};
use crate::error::{ResourceKind, ResultExt, SdkError};

/// Description given to API tokens created by this tool.
pub const TOKEN_DESCRIPTION: &str = "dev-tool";

/// Build a client for `server_url`, authenticated with `token`.
///
/// `token` must have the form `{access_key}:{secret_key}`.
pub fn get_client(server_url: &str, token: &str) -> Result<RancherClient, SdkError> {
    RancherClient::connect(&ServerConfig::new(server_url, token)?)
}

/// Authenticated handle on one management server.
///
/// The client keeps no per-project state; every namespace call names its
/// project explicitly, so a single client can be cloned and shared.
#[derive(Debug, Clone)]
pub struct RancherClient<A = HttpManagementApi> {
    api: A,
}

impl RancherClient<HttpManagementApi> {
    /// Connect to the server described by `config`.
    pub fn connect(config: &ServerConfig) -> Result<Self, SdkError> {
        Ok(Self::with_api(HttpManagementApi::new(config)?))
    }
}

impl<A: ManagementApi> RancherClient<A> {
    /// Wrap an arbitrary transport.
    pub fn with_api(api: A) -> Self {
        Self { api }
    }

    /// The underlying transport.
    pub fn api(&self) -> &A {
        &self.api
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// List every cluster that is neither a system cluster nor inactive,
    /// stopped or being removed.
    pub async fn list_clusters(&self) -> Result<Vec<Cluster>, SdkError> {
        self.api
            .list_clusters(&ListOpts::clusters())
            .await
            .context(|| "listing clusters")
    }

    /// Find an active, non-system cluster by name.
    pub async fn find_cluster(&self, name: &str) -> Result<Cluster, SdkError> {
        let clusters = self.list_clusters().await?;
        select_unique(clusters, ResourceKind::Cluster, name, |c| c.name == name)
    }

    /// Find a project by name inside `cluster`.
    pub async fn find_project(&self, name: &str, cluster: &Cluster) -> Result<Project, SdkError> {
        let projects = self
            .api
            .list_projects(&ListOpts::projects_in(&cluster.id))
            .await
            .context(|| format!("listing projects in cluster {}", cluster.name))?;
        select_unique(projects, ResourceKind::Project, name, |p| {
            p.name == name && p.cluster_id == cluster.id
        })
    }

    /// Find a namespace by name inside `project`.
    pub async fn find_namespace(&self, name: &str, project: &Project) -> Result<Namespace, SdkError> {
        let opts = ListOpts::namespaces().filter("projectId", &project.id);
        let namespaces = self
            .api
            .list_namespaces(&project.id, &opts)
            .await
            .context(|| format!("listing namespaces in project {}", project.name))?;
        select_unique(namespaces, ResourceKind::Namespace, name, |n| {
            n.name == name && n.project_id.as_ref() == Some(&project.id)
        })
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a project inside `cluster`.
    pub async fn create_project(
        &self,
        name: &str,
        description: &str,
        cluster: &Cluster,
    ) -> Result<Project, SdkError> {
        let body = NewProject {
            name: name.to_string(),
            cluster_id: cluster.id.clone(),
            description: description.to_string(),
        };
        let project = self
            .api
            .create_project(&body)
            .await
            .context(|| format!("could not create project {name} in cluster {}", cluster.name))?;
        info!(project = %project.id, cluster = %cluster.id, name, "project created");
        Ok(project)
    }

    /// Create a namespace inside `project`.
    pub async fn create_namespace(&self, name: &str, project: &Project) -> Result<Namespace, SdkError> {
        let body = NewNamespace {
            name: name.to_string(),
            project_id: project.id.clone(),
        };
        let namespace = self
            .api
            .create_namespace(&project.id, &body)
            .await
            .context(|| format!("could not create namespace {name}"))?;
        info!(namespace = %namespace.id, project = %project.id, "namespace created");
        Ok(namespace)
    }

    /// Generate a kubeconfig document for `cluster`.
    pub async fn kubeconfig(&self, cluster: &Cluster) -> Result<String, SdkError> {
        self.api
            .generate_kubeconfig(&cluster.id)
            .await
            .context(|| format!("could not generate kubeconfig for {}", cluster.name))
    }

    /// Create a long-lived API token described as `description`.
    ///
    /// The returned record's `token` field holds the `access:secret` pair.
    pub async fn create_token(&self, description: &str) -> Result<TokenRecord, SdkError> {
        let token = self
            .api
            .create_token(&NewToken {
                description: description.to_string(),
            })
            .await?;
        info!(token = %token.name, "API token created");
        Ok(token)
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Make sure a project named `project_name` exists in `cluster_name`.
    ///
    /// The cluster must exist.  A missing project is created with its name
    /// as description; an existing one is returned untouched.
    pub async fn ensure_project(&self, cluster_name: &str, project_name: &str) -> Result<Project, SdkError> {
        let cluster = self.find_cluster(cluster_name).await?;
        match self.find_project(project_name, &cluster).await {
            Ok(project) => {
                debug!(project = %project.id, "project already exists");
                Ok(project)
            }
            Err(e) if e.is_not_found() => self
                .create_project(project_name, project_name, &cluster)
                .await
                .context(|| format!("could not ensure project {project_name}")),
            Err(e) => Err(e),
        }
    }

    /// Make sure a namespace named `namespace_name` exists in the given
    /// cluster and project.
    ///
    /// Both the cluster and the project must exist; this never creates the
    /// project.
    pub async fn ensure_namespace(
        &self,
        namespace_name: &str,
        cluster_name: &str,
        project_name: &str,
    ) -> Result<Namespace, SdkError> {
        let cluster = self.find_cluster(cluster_name).await?;
        let project = self.find_project(project_name, &cluster).await?;
        match self.find_namespace(namespace_name, &project).await {
            Ok(namespace) => {
                debug!(namespace = %namespace.id, "namespace already exists");
                Ok(namespace)
            }
            Err(e) if e.is_not_found() => self
                .create_namespace(namespace_name, &project)
                .await
                .context(|| format!("could not ensure namespace {namespace_name}")),
            Err(e) => Err(e),
        }
    }

    /// Resolve `cluster_name` and return its kubeconfig document verbatim.
    pub async fn fetch_kubeconfig(&self, cluster_name: &str) -> Result<String, SdkError> {
        let cluster = self.find_cluster(cluster_name).await?;
        self.kubeconfig(&cluster).await
    }
}

/// Pick the single item matching `pred`.
///
/// Zero matches is [`SdkError::NotFound`]; more than one is
/// [`SdkError::Ambiguous`].
fn select_unique<T>(
    items: Vec<T>,
    kind: ResourceKind,
    name: &str,
    pred: impl Fn(&T) -> bool,
) -> Result<T, SdkError> {
    let mut matches: Vec<T> = items.into_iter().filter(|item| pred(item)).collect();
    match matches.len() {
        0 => Err(SdkError::not_found(kind, name)),
        1 => Ok(matches.remove(0)),
        n => Err(SdkError::Ambiguous {
            kind,
            name: name.to_string(),
            matches: n,
        }),
    }
}
