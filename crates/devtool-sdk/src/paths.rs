//! Canonical management API paths.
//!
//! Every URL the SDK requests is built through [`ApiPaths`], so the client
//! and the mock server in tests agree on a single layout.
//!
//! # Path layout
//!
//! ```text
//! /login?requestId=…&publicKey=…&responseType=json   ← opened in the browser
//! /v3-public/authTokens/{requestId}                  ← polled, then deleted
//! /v3/clusters                                       ← list clusters
//! /v3/clusters/{cluster}?action=generateKubeconfig   ← kubeconfig action
//! /v3/projects                                       ← list / create projects
//! /v3/cluster/{cluster}/namespaces                   ← list / create namespaces
//! /v3/tokens                                         ← create API tokens
//! ```

use devtool_models::challenge::RESPONSE_TYPE;
use devtool_models::ClusterId;
use reqwest::Url;

/// Central authority for all management API paths.
///
/// # Examples
///
/// ```
/// use devtool_models::ClusterId;
/// use devtool_sdk::ApiPaths;
///
/// let paths = ApiPaths::new("https://rancher.example.com");
/// assert_eq!(
///     paths.namespaces(&ClusterId::new("c-1")),
///     "https://rancher.example.com/v3/cluster/c-1/namespaces",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPaths {
    base: String,
}

impl ApiPaths {
    /// Paths rooted at `base` (scheme and authority, no trailing slash).
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// The base URL.
    pub fn base(&self) -> &str {
        &self.base
    }

    // ------------------------------------------------------------------
    // Login
    // ------------------------------------------------------------------

    /// Browser login page for a challenge, with a percent-encoded query.
    pub fn login(&self, request_id: &str, encoded_public_key: &str) -> String {
        let mut url = format!("{}/login", self.base);
        if let Ok(mut parsed) = Url::parse(&url) {
            parsed
                .query_pairs_mut()
                .append_pair("requestId", request_id)
                .append_pair("publicKey", encoded_public_key)
                .append_pair("responseType", RESPONSE_TYPE);
            url = parsed.into();
        }
        url
    }

    /// Endpoint the login token is polled from and deleted at.
    pub fn auth_token(&self, request_id: &str) -> String {
        format!("{}/v3-public/authTokens/{request_id}", self.base)
    }

    // ------------------------------------------------------------------
    // Management resources
    // ------------------------------------------------------------------

    /// Cluster collection.
    pub fn clusters(&self) -> String {
        format!("{}/v3/clusters", self.base)
    }

    /// Single cluster; actions are invoked on it with `?action=…`.
    pub fn cluster(&self, cluster: &ClusterId) -> String {
        format!("{}/v3/clusters/{cluster}", self.base)
    }

    /// Project collection.
    pub fn projects(&self) -> String {
        format!("{}/v3/projects", self.base)
    }

    /// Namespace collection of one cluster.
    pub fn namespaces(&self, cluster: &ClusterId) -> String {
        format!("{}/v3/cluster/{cluster}/namespaces", self.base)
    }

    /// API token collection.
    pub fn tokens(&self) -> String {
        format!("{}/v3/tokens", self.base)
    }
}
