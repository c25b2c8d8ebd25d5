//! Transport to the Rancher v3 management API.
//!
//! [`ManagementApi`] is the seam between the reconciler and the remote
//! service: plain List / Create / Generate calls with no lookup logic.
//! [`HttpManagementApi`] implements it over HTTPS with `reqwest`.
//!
//! Namespace calls take the owning project explicitly; the transport keeps
//! no "current project", so one instance can serve any number of projects
//! concurrently.

use std::future::Future;
use std::time::Duration;

use devtool_models::{
    Cluster, ClusterId, Collection, KubeConfigOutput, ListOpts, Namespace, NewNamespace,
    NewProject, NewToken, Project, ProjectId, TokenRecord,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::credentials::RancherCredentials;
use crate::error::{ResultExt, SdkError};
use crate::paths::ApiPaths;

const APPLICATION_JSON: &str = "application/json";

/// Default timeout of one management API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Server configuration
// ---------------------------------------------------------------------------

/// Connection settings for one management server.
///
/// The URL is reduced to scheme and authority at construction, so
/// `https://rancher.example.com/dashboard/` and `https://rancher.example.com`
/// address the same server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    url: String,
    credentials: RancherCredentials,
    insecure_skip_tls_verify: bool,
    request_timeout: Duration,
}

impl ServerConfig {
    /// Validate `server_url` and split `token` into API credentials.
    pub fn new(server_url: &str, token: &str) -> Result<Self, SdkError> {
        Ok(Self {
            url: normalize_server_url(server_url)?,
            credentials: RancherCredentials::parse(token)?,
            insecure_skip_tls_verify: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Disable TLS certificate verification for this server.
    #[must_use]
    pub fn insecure_skip_tls_verify(mut self, insecure: bool) -> Self {
        self.insecure_skip_tls_verify = insecure;
        self
    }

    /// Give up on a request after `timeout`.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Normalized base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// API credentials.
    pub fn credentials(&self) -> &RancherCredentials {
        &self.credentials
    }

    /// Whether certificate verification is disabled.
    pub fn is_insecure(&self) -> bool {
        self.insecure_skip_tls_verify
    }

    /// Path builder rooted at this server.
    pub fn paths(&self) -> ApiPaths {
        ApiPaths::new(&self.url)
    }
}

/// Reduce a server URL to `scheme://authority`.
///
/// Only absolute `http` / `https` URLs with a host are accepted.
pub fn normalize_server_url(server_url: &str) -> Result<String, SdkError> {
    let invalid = |reason: String| {
        SdkError::Config(format!(
            "failed to parse server URL ({server_url}), make sure it is a valid HTTPS URL \
             (e.g. https://rancher.yourdomain.com or https://1.1.1.1): {reason}"
        ))
    };

    let mut url = Url::parse(server_url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().unwrap_or_default().is_empty() {
        return Err(invalid("missing host".into()));
    }
    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Build the HTTP client shared by the SDK's transports.
pub(crate) fn http_client(
    insecure_skip_tls_verify: bool,
    timeout: Duration,
) -> Result<reqwest::Client, SdkError> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if insecure_skip_tls_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }
    Ok(builder.build()?)
}

/// Turn a response into `T`, or into [`SdkError::Api`] on a non-2xx status.
pub(crate) async fn decode_json<T: DeserializeOwned>(res: Response) -> Result<T, SdkError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(SdkError::Api { status, body });
    }
    let bytes = res.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

// ---------------------------------------------------------------------------
// ManagementApi
// ---------------------------------------------------------------------------

/// List / Create / Generate operations of the management API.
///
/// Implementations report transport and server failures as errors and never
/// as empty results; "nothing matched" decisions belong to the caller.
pub trait ManagementApi: Send + Sync {
    /// List clusters matching `opts`.
    fn list_clusters(
        &self,
        opts: &ListOpts,
    ) -> impl Future<Output = Result<Vec<Cluster>, SdkError>> + Send;

    /// List projects matching `opts`.
    fn list_projects(
        &self,
        opts: &ListOpts,
    ) -> impl Future<Output = Result<Vec<Project>, SdkError>> + Send;

    /// Create a project.
    fn create_project(
        &self,
        project: &NewProject,
    ) -> impl Future<Output = Result<Project, SdkError>> + Send;

    /// List the namespaces visible from `project`'s cluster.
    fn list_namespaces(
        &self,
        project: &ProjectId,
        opts: &ListOpts,
    ) -> impl Future<Output = Result<Vec<Namespace>, SdkError>> + Send;

    /// Create a namespace inside `project`.
    fn create_namespace(
        &self,
        project: &ProjectId,
        namespace: &NewNamespace,
    ) -> impl Future<Output = Result<Namespace, SdkError>> + Send;

    /// Run the `generateKubeconfig` action on a cluster.
    fn generate_kubeconfig(
        &self,
        cluster: &ClusterId,
    ) -> impl Future<Output = Result<String, SdkError>> + Send;

    /// Create a long-lived API token for the authenticated user.
    fn create_token(
        &self,
        token: &NewToken,
    ) -> impl Future<Output = Result<TokenRecord, SdkError>> + Send;
}

// ---------------------------------------------------------------------------
// HttpManagementApi
// ---------------------------------------------------------------------------

/// [`ManagementApi`] over HTTP(S), authenticated with basic auth.
#[derive(Debug, Clone)]
pub struct HttpManagementApi {
    http: reqwest::Client,
    paths: ApiPaths,
    credentials: RancherCredentials,
}

impl HttpManagementApi {
    /// Build a transport for `config`.
    pub fn new(config: &ServerConfig) -> Result<Self, SdkError> {
        Ok(Self {
            http: http_client(config.is_insecure(), config.timeout())?,
            paths: config.paths(),
            credentials: config.credentials().clone(),
        })
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(
            self.credentials.access_key(),
            Some(self.credentials.secret_key()),
        )
        .header(ACCEPT, APPLICATION_JSON)
    }

    async fn list<T: DeserializeOwned>(&self, url: &str, opts: &ListOpts) -> Result<Vec<T>, SdkError> {
        debug!(url, filters = ?opts.pairs(), "list request");
        let res = self
            .authorize(self.http.get(url))
            .query(opts.pairs())
            .send()
            .await?;
        let collection: Collection<T> = decode_json(res).await?;
        Ok(collection.data)
    }

    async fn post<B, T>(&self, url: &str, query: &[(&str, &str)], body: &B) -> Result<T, SdkError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(url, "create request");
        let res = self
            .authorize(self.http.post(url))
            .query(query)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .body(serde_json::to_vec(body)?)
            .send()
            .await?;
        decode_json(res).await
    }

    fn namespace_cluster(project: &ProjectId) -> Result<ClusterId, SdkError> {
        project
            .cluster_id()
            .ok_or_else(|| SdkError::Config(format!("project id {project} does not name a cluster")))
    }
}

impl ManagementApi for HttpManagementApi {
    async fn list_clusters(&self, opts: &ListOpts) -> Result<Vec<Cluster>, SdkError> {
        self.list(&self.paths.clusters(), opts).await
    }

    async fn list_projects(&self, opts: &ListOpts) -> Result<Vec<Project>, SdkError> {
        self.list(&self.paths.projects(), opts).await
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project, SdkError> {
        self.post(&self.paths.projects(), &[], project).await
    }

    async fn list_namespaces(
        &self,
        project: &ProjectId,
        opts: &ListOpts,
    ) -> Result<Vec<Namespace>, SdkError> {
        let cluster = Self::namespace_cluster(project)?;
        self.list(&self.paths.namespaces(&cluster), opts).await
    }

    async fn create_namespace(
        &self,
        project: &ProjectId,
        namespace: &NewNamespace,
    ) -> Result<Namespace, SdkError> {
        let cluster = Self::namespace_cluster(project)?;
        self.post(&self.paths.namespaces(&cluster), &[], namespace)
            .await
    }

    async fn generate_kubeconfig(&self, cluster: &ClusterId) -> Result<String, SdkError> {
        let output: KubeConfigOutput = self
            .post(
                &self.paths.cluster(cluster),
                &[("action", "generateKubeconfig")],
                &serde_json::json!({}),
            )
            .await?;
        Ok(output.config)
    }

    async fn create_token(&self, token: &NewToken) -> Result<TokenRecord, SdkError> {
        self.post(&self.paths.tokens(), &[], token)
            .await
            .context(|| "creating API token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn path_is_stripped_from_server_url() {
        let config = ServerConfig::new("https://rancher.example.com/dashboard/home?x=1", "a:b").unwrap();
        assert_eq!(config.url(), "https://rancher.example.com");
    }

    #[test]
    fn port_is_kept() {
        let url = normalize_server_url("http://127.0.0.1:8443/").unwrap();
        assert_eq!(url, "http://127.0.0.1:8443");
    }

    #[test]
    fn relative_url_is_configuration_error() {
        let err = ServerConfig::new("rancher.example.com", "a:b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("rancher.example.com"));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        assert!(normalize_server_url("ftp://rancher.example.com").is_err());
    }

    #[test]
    fn malformed_token_is_configuration_error() {
        let err = ServerConfig::new("https://rancher.example.com", "changeme").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn tls_verification_is_on_by_default() {
        let config = ServerConfig::new("https://rancher.example.com", "a:b").unwrap();
        assert!(!config.is_insecure());
        assert!(config.insecure_skip_tls_verify(true).is_insecure());
    }

    #[test]
    fn requests_are_bounded_by_default() {
        let config = ServerConfig::new("https://rancher.example.com", "a:b").unwrap();
        assert_eq!(config.timeout(), DEFAULT_REQUEST_TIMEOUT);
        let config = config.request_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn namespace_calls_need_a_cluster_scoped_project() {
        let err = HttpManagementApi::namespace_cluster(&ProjectId::new("p-orphan")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            HttpManagementApi::namespace_cluster(&ProjectId::new("c-1:p-2")).unwrap(),
            ClusterId::new("c-1")
        );
    }
}
