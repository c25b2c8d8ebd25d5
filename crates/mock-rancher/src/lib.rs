//! In-memory stand-in for the Rancher management API.
//!
//! [`MockRancher`] serves the subset of the v3 API the dev-tool SDK talks
//! to, plus an auto-approving browser login:
//!
//! ```text
//! GET    /login?requestId=…&publicKey=…        approve the challenge at once
//! GET    /v3-public/authTokens/{id}            sealed token, 404 until approved
//! DELETE /v3-public/authTokens/{id}            consume the token
//! GET    /v3/clusters                          honours system / state_ne
//! POST   /v3/clusters/{id}?action=generateKubeconfig
//! GET    /v3/projects                          honours clusterId / name
//! POST   /v3/projects
//! GET    /v3/cluster/{cluster}/namespaces      honours projectId / name
//! POST   /v3/cluster/{cluster}/namespaces
//! POST   /v3/tokens
//! ```
//!
//! Every request is counted (see [`RequestCounts`]) so tests can assert on
//! what the client actually sent.

mod error;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use devtool_models::challenge;
use devtool_models::{
    Cluster, ClusterId, ClusterState, Collection, KubeConfigOutput, ListOpts, Namespace,
    NewNamespace, NewProject, NewToken, Project, ProjectId, TokenRecord,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;
use uuid::Uuid;

pub use error::MockError;

/// Token handed out by the browser login unless configured otherwise.
pub const DEFAULT_LOGIN_TOKEN: &str = "token-mock1:mocksecret";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Number of requests served, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    /// `GET /login`.
    pub logins: usize,
    /// `GET /v3-public/authTokens/{id}`.
    pub token_polls: usize,
    /// `DELETE /v3-public/authTokens/{id}`.
    pub token_deletes: usize,
    /// Successful `POST /v3/projects`.
    pub projects_created: usize,
    /// Successful `POST /v3/cluster/{cluster}/namespaces`.
    pub namespaces_created: usize,
    /// Successful `generateKubeconfig` actions.
    pub kubeconfigs_generated: usize,
    /// Successful `POST /v3/tokens`.
    pub tokens_created: usize,
}

#[derive(Debug, Default)]
struct Store {
    clusters: Vec<Cluster>,
    projects: Vec<Project>,
    namespaces: Vec<(ClusterId, Namespace)>,
    /// Sealed login tokens by request id.
    login_tokens: HashMap<String, String>,
    login_token: String,
    enforce_auth: bool,
    accepted_tokens: Vec<String>,
    counts: RequestCounts,
}

/// Handle on a mock server's state.
///
/// Cloning is cheap; all clones share the same resources and counters.
#[derive(Debug, Clone)]
pub struct MockRancher {
    store: Arc<Mutex<Store>>,
}

impl Default for MockRancher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRancher {
    /// Empty server issuing [`DEFAULT_LOGIN_TOKEN`] and accepting any caller.
    pub fn new() -> Self {
        let store = Store {
            login_token: DEFAULT_LOGIN_TOKEN.to_string(),
            accepted_tokens: vec![DEFAULT_LOGIN_TOKEN.to_string()],
            ..Store::default()
        };
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Add a user cluster.
    #[must_use]
    pub fn with_cluster(self, id: &str, name: &str, state: ClusterState) -> Self {
        self.store().clusters.push(Cluster {
            id: ClusterId::new(id),
            name: name.to_string(),
            state,
            internal: false,
        });
        self
    }

    /// Add the server's own (system) cluster.
    #[must_use]
    pub fn with_system_cluster(self, id: &str, name: &str) -> Self {
        self.store().clusters.push(Cluster {
            id: ClusterId::new(id),
            name: name.to_string(),
            state: ClusterState::Active,
            internal: true,
        });
        self
    }

    /// Add a project; `id` has the form `{cluster}:{project}`.
    #[must_use]
    pub fn with_project(self, id: &str, name: &str) -> Self {
        let id = ProjectId::new(id);
        let cluster_id = id.cluster_id().unwrap_or_default();
        self.store().projects.push(Project {
            id,
            name: name.to_string(),
            cluster_id,
            description: String::new(),
        });
        self
    }

    /// Add a namespace to the project `project_id`.
    #[must_use]
    pub fn with_namespace(self, project_id: &str, name: &str) -> Self {
        let project_id = ProjectId::new(project_id);
        let cluster_id = project_id.cluster_id().unwrap_or_default();
        self.store().namespaces.push((
            cluster_id,
            Namespace {
                id: name.to_string(),
                name: name.to_string(),
                project_id: Some(project_id),
            },
        ));
        self
    }

    /// Issue `token` from the browser login instead of the default one.
    #[must_use]
    pub fn with_login_token(self, token: &str) -> Self {
        {
            let mut store = self.store();
            store.login_token = token.to_string();
            store.accepted_tokens.push(token.to_string());
        }
        self
    }

    /// Reject management API calls without a known token.
    ///
    /// Known tokens are the login token and every token created through
    /// `POST /v3/tokens`.
    #[must_use]
    pub fn requiring_auth(self) -> Self {
        self.store().enforce_auth = true;
        self
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Requests served so far.
    pub fn counts(&self) -> RequestCounts {
        self.store().counts
    }

    /// Current projects.
    pub fn projects(&self) -> Vec<Project> {
        self.store().projects.clone()
    }

    /// Current namespaces.
    pub fn namespaces(&self) -> Vec<Namespace> {
        self.store().namespaces.iter().map(|(_, ns)| ns.clone()).collect()
    }

    /// Logins approved but not yet consumed.
    pub fn pending_logins(&self) -> usize {
        self.store().login_tokens.len()
    }

    // ------------------------------------------------------------------
    // Serving
    // ------------------------------------------------------------------

    /// The mock API as an axum router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/login", get(login))
            .route(
                "/v3-public/authTokens/{id}",
                get(get_auth_token).delete(delete_auth_token),
            )
            .route("/v3/clusters", get(list_clusters))
            .route("/v3/clusters/{id}", post(cluster_action))
            .route("/v3/projects", get(list_projects).post(create_project))
            .route(
                "/v3/cluster/{cluster}/namespaces",
                get(list_namespaces).post(create_namespace),
            )
            .route("/v3/tokens", post(create_token))
            .with_state(self.clone())
    }

    /// Serve on `listener` until the process exits.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        axum::serve(listener, self.router()).await
    }

    /// Serve on an ephemeral localhost port in the background.
    ///
    /// Returns the base URL, e.g. `http://127.0.0.1:38211`.
    pub async fn spawn(self) -> std::io::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = self.serve(listener).await {
                tracing::error!(error = %e, "mock server stopped");
            }
        });
        Ok(format!("http://{addr}"))
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), MockError> {
        let store = self.store();
        if !store.enforce_auth {
            return Ok(());
        }
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(presented_token)
            .ok_or(MockError::Unauthorized)?;
        if store.accepted_tokens.contains(&presented) {
            Ok(())
        } else {
            Err(MockError::Unauthorized)
        }
    }
}

/// Extract `access:secret` from a Basic or Bearer authorization header.
fn presented_token(header: &str) -> Option<String> {
    if let Some(encoded) = header.strip_prefix("Basic ") {
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        return String::from_utf8(decoded).ok();
    }
    header.strip_prefix("Bearer ").map(|t| t.trim().to_string())
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..5].to_string()
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginParams {
    request_id: String,
    public_key: String,
}

/// `GET /login` — approve the challenge as if the operator had logged in.
async fn login(
    State(mock): State<MockRancher>,
    Query(params): Query<LoginParams>,
) -> Result<&'static str, MockError> {
    let key = challenge::decode_public_key(&params.public_key)?;
    let mut store = mock.store();
    let sealed = challenge::seal_token(&key, &store.login_token)?;
    store.login_tokens.insert(params.request_id.clone(), sealed);
    store.counts.logins += 1;
    info!(request_id = %params.request_id, "login approved");
    Ok("Login successful. You can close this window.")
}

/// `GET /v3-public/authTokens/{id}`.
async fn get_auth_token(
    State(mock): State<MockRancher>,
    Path(id): Path<String>,
) -> Result<Json<TokenRecord>, MockError> {
    let mut store = mock.store();
    store.counts.token_polls += 1;
    let sealed = store
        .login_tokens
        .get(&id)
        .cloned()
        .ok_or_else(|| MockError::NotFound(format!("authToken {id}")))?;
    Ok(Json(TokenRecord {
        name: id.clone(),
        id,
        token: sealed,
        description: String::new(),
    }))
}

/// `DELETE /v3-public/authTokens/{id}`.
async fn delete_auth_token(
    State(mock): State<MockRancher>,
    Path(id): Path<String>,
) -> Result<StatusCode, MockError> {
    let mut store = mock.store();
    store.counts.token_deletes += 1;
    store
        .login_tokens
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| MockError::NotFound(format!("authToken {id}")))
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// `GET /v3/clusters`.
async fn list_clusters(
    State(mock): State<MockRancher>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<Collection<Cluster>>, MockError> {
    mock.authorize(&headers)?;
    let opts = ListOpts::from(query);
    let excluded: Vec<ClusterState> = opts
        .values("state_ne")
        .filter_map(|s| s.parse().ok())
        .collect();
    let hide_system = opts.values("system").any(|v| v == "false");
    let clusters = mock
        .store()
        .clusters
        .iter()
        .filter(|c| !excluded.contains(&c.state))
        .filter(|c| !(hide_system && c.internal))
        .cloned()
        .collect();
    Ok(Json(Collection::new(clusters)))
}

#[derive(Deserialize)]
struct ActionParams {
    action: Option<String>,
}

/// `POST /v3/clusters/{id}?action=…`.
async fn cluster_action(
    State(mock): State<MockRancher>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<ActionParams>,
) -> Result<Json<KubeConfigOutput>, MockError> {
    mock.authorize(&headers)?;
    if params.action.as_deref() != Some("generateKubeconfig") {
        return Err(MockError::InvalidReference(format!(
            "unsupported action {}",
            params.action.unwrap_or_default()
        )));
    }
    let mut store = mock.store();
    let cluster = store
        .clusters
        .iter()
        .find(|c| c.id.as_str() == id)
        .cloned()
        .ok_or_else(|| MockError::NotFound(format!("cluster {id}")))?;
    store.counts.kubeconfigs_generated += 1;
    Ok(Json(KubeConfigOutput {
        config: render_kubeconfig(&cluster),
    }))
}

fn render_kubeconfig(cluster: &Cluster) -> String {
    let name = &cluster.name;
    let id = &cluster.id;
    let secret = Uuid::new_v4().simple();
    format!(
        "apiVersion: v1
kind: Config
clusters:
- name: \"{name}\"
  cluster:
    server: \"https://rancher.mock/k8s/clusters/{id}\"
users:
- name: \"{name}\"
  user:
    token: \"kubeconfig-u-mock:{secret}\"
contexts:
- name: \"{name}\"
  context:
    user: \"{name}\"
    cluster: \"{name}\"
current-context: \"{name}\"
"
    )
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// `GET /v3/projects`.
async fn list_projects(
    State(mock): State<MockRancher>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<Collection<Project>>, MockError> {
    mock.authorize(&headers)?;
    let opts = ListOpts::from(query);
    let projects = mock
        .store()
        .projects
        .iter()
        .filter(|p| opts.values("clusterId").all(|c| p.cluster_id.as_str() == c))
        .filter(|p| opts.values("name").all(|n| p.name == n))
        .cloned()
        .collect();
    Ok(Json(Collection::new(projects)))
}

/// `POST /v3/projects`.
async fn create_project(
    State(mock): State<MockRancher>,
    headers: HeaderMap,
    Json(body): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>), MockError> {
    mock.authorize(&headers)?;
    let mut store = mock.store();
    if !store.clusters.iter().any(|c| c.id == body.cluster_id) {
        return Err(MockError::InvalidReference(format!(
            "cluster {} does not exist",
            body.cluster_id
        )));
    }
    let project = Project {
        id: ProjectId::compose(&body.cluster_id, &format!("p-{}", short_id())),
        name: body.name,
        cluster_id: body.cluster_id,
        description: body.description,
    };
    store.projects.push(project.clone());
    store.counts.projects_created += 1;
    info!(project = %project.id, name = %project.name, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

// ---------------------------------------------------------------------------
// Namespaces
// ---------------------------------------------------------------------------

/// `GET /v3/cluster/{cluster}/namespaces`.
async fn list_namespaces(
    State(mock): State<MockRancher>,
    headers: HeaderMap,
    Path(cluster): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<Collection<Namespace>>, MockError> {
    mock.authorize(&headers)?;
    let opts = ListOpts::from(query);
    let namespaces = mock
        .store()
        .namespaces
        .iter()
        .filter(|(c, _)| c.as_str() == cluster)
        .map(|(_, ns)| ns)
        .filter(|ns| {
            opts.values("projectId")
                .all(|p| ns.project_id.as_ref().is_some_and(|id| id.as_str() == p))
        })
        .filter(|ns| opts.values("name").all(|n| ns.name == n))
        .cloned()
        .collect();
    Ok(Json(Collection::new(namespaces)))
}

/// `POST /v3/cluster/{cluster}/namespaces`.
async fn create_namespace(
    State(mock): State<MockRancher>,
    headers: HeaderMap,
    Path(cluster): Path<String>,
    Json(body): Json<NewNamespace>,
) -> Result<(StatusCode, Json<Namespace>), MockError> {
    mock.authorize(&headers)?;
    let cluster = ClusterId::new(&cluster);
    let mut store = mock.store();
    if !store
        .projects
        .iter()
        .any(|p| p.id == body.project_id && p.cluster_id == cluster)
    {
        return Err(MockError::InvalidReference(format!(
            "project {} does not exist in cluster {cluster}",
            body.project_id
        )));
    }
    if store
        .namespaces
        .iter()
        .any(|(c, ns)| *c == cluster && ns.name == body.name)
    {
        return Err(MockError::AlreadyExists(format!("namespace {}", body.name)));
    }
    let namespace = Namespace {
        id: body.name.clone(),
        name: body.name,
        project_id: Some(body.project_id),
    };
    store.namespaces.push((cluster, namespace.clone()));
    store.counts.namespaces_created += 1;
    info!(namespace = %namespace.id, "namespace created");
    Ok((StatusCode::CREATED, Json(namespace)))
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// `POST /v3/tokens`.
async fn create_token(
    State(mock): State<MockRancher>,
    headers: HeaderMap,
    Json(body): Json<NewToken>,
) -> Result<(StatusCode, Json<TokenRecord>), MockError> {
    mock.authorize(&headers)?;
    let name = format!("token-{}", short_id());
    let token = format!("{name}:{}", Uuid::new_v4().simple());
    let mut store = mock.store();
    store.accepted_tokens.push(token.clone());
    store.counts.tokens_created += 1;
    info!(token = %name, "API token created");
    Ok((
        StatusCode::CREATED,
        Json(TokenRecord {
            id: name.clone(),
            name,
            token,
            description: body.description,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use devtool_models::ApiErrorBody;

    use super::*;

    fn server(mock: &MockRancher) -> TestServer {
        TestServer::new(mock.router()).unwrap()
    }

    fn seeded() -> MockRancher {
        MockRancher::new()
            .with_system_cluster("local", "local")
            .with_cluster("c-aaaaa", "cluster-a", ClusterState::Active)
            .with_cluster("c-bbbbb", "cluster-b", ClusterState::Inactive)
            .with_project("c-aaaaa:p-11111", "team-x")
            .with_namespace("c-aaaaa:p-11111", "team-x-dev")
    }

    #[tokio::test]
    async fn cluster_listing_honours_filters() {
        let mock = seeded();
        let res = server(&mock)
            .get("/v3/clusters")
            .add_query_param("system", "false")
            .add_query_param("state_ne", "inactive")
            .await;
        res.assert_status_ok();
        let clusters: Collection<Cluster> = res.json();
        let names: Vec<_> = clusters.data.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["cluster-a"]);
    }

    #[tokio::test]
    async fn projects_are_filtered_by_cluster() {
        let mock = seeded().with_project("c-bbbbb:p-22222", "team-x");
        let res = server(&mock)
            .get("/v3/projects")
            .add_query_param("clusterId", "c-bbbbb")
            .await;
        let projects: Collection<Project> = res.json();
        assert_eq!(projects.data.len(), 1);
        assert_eq!(projects.data[0].id, ProjectId::new("c-bbbbb:p-22222"));
    }

    #[tokio::test]
    async fn creating_a_project_needs_an_existing_cluster() {
        let mock = seeded();
        let res = server(&mock)
            .post("/v3/projects")
            .json(&NewProject {
                name: "team-y".into(),
                cluster_id: ClusterId::new("c-zzzzz"),
                description: "team-y".into(),
            })
            .await;
        res.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(mock.counts().projects_created, 0);
    }

    #[tokio::test]
    async fn duplicate_namespace_is_rejected() {
        let mock = seeded();
        let res = server(&mock)
            .post("/v3/cluster/c-aaaaa/namespaces")
            .json(&NewNamespace {
                name: "team-x-dev".into(),
                project_id: ProjectId::new("c-aaaaa:p-11111"),
            })
            .await;
        res.assert_status(StatusCode::CONFLICT);
        let body: ApiErrorBody = res.json();
        assert_eq!(body.code, "AlreadyExists");
    }

    #[tokio::test]
    async fn auth_token_is_missing_until_login() {
        let mock = MockRancher::new();
        let server = server(&mock);
        server
            .get("/v3-public/authTokens/abc")
            .await
            .assert_status_not_found();

        let key = rsa_key();
        server
            .get("/login")
            .add_query_param("requestId", "abc")
            .add_query_param("publicKey", challenge::encode_public_key(&key.to_public_key()))
            .add_query_param("responseType", "json")
            .await
            .assert_status_ok();

        let record: TokenRecord = server.get("/v3-public/authTokens/abc").await.json();
        let plaintext = challenge::open_token(&key, &record.token).unwrap();
        assert_eq!(plaintext, DEFAULT_LOGIN_TOKEN);

        server
            .delete("/v3-public/authTokens/abc")
            .await
            .assert_status(StatusCode::NO_CONTENT);
        assert_eq!(mock.pending_logins(), 0);
        assert_eq!(mock.counts().token_polls, 2);
    }

    #[tokio::test]
    async fn enforced_auth_rejects_unknown_tokens() {
        let mock = seeded().requiring_auth();
        let server = server(&mock);
        server.get("/v3/clusters").await.assert_status_unauthorized();
        server
            .get("/v3/clusters")
            .authorization_bearer("token-nope:nope")
            .await
            .assert_status_unauthorized();
        server
            .get("/v3/clusters")
            .authorization_bearer(DEFAULT_LOGIN_TOKEN)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn created_tokens_are_accepted() {
        let mock = seeded().requiring_auth();
        let server = server(&mock);
        let record: TokenRecord = server
            .post("/v3/tokens")
            .authorization_bearer(DEFAULT_LOGIN_TOKEN)
            .json(&NewToken {
                description: "dev-tool".into(),
            })
            .await
            .json();
        assert_eq!(record.description, "dev-tool");
        server
            .get("/v3/projects")
            .authorization_bearer(&record.token)
            .await
            .assert_status_ok();
    }

    #[test]
    fn basic_and_bearer_headers_are_understood() {
        let basic = format!("Basic {}", STANDARD.encode("token-a:secret"));
        assert_eq!(presented_token(&basic).as_deref(), Some("token-a:secret"));
        assert_eq!(presented_token("Bearer token-a:secret").as_deref(), Some("token-a:secret"));
        assert_eq!(presented_token("Digest xyz"), None);
    }

    fn rsa_key() -> rsa::RsaPrivateKey {
        rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap()
    }
}
