//! # dev-tool SDK
//!
//! Client side of the Rancher operator workflow.
//!
//! The SDK provides:
//!
//! * [`get_token`] / [`TokenExchange`] — browser login that hands the CLI
//!   an API token sealed against a one-time RSA key.
//! * [`RancherClient`] — name-based lookups and idempotent
//!   `ensure_project` / `ensure_namespace`, plus kubeconfig retrieval.
//! * [`ManagementApi`] — the transport seam, implemented over HTTPS by
//!   [`HttpManagementApi`].
//! * [`ApiPaths`] — canonical management API paths.
//! * [`SdkError`] — unified error type, classified by [`ErrorKind`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use devtool_sdk::{get_client, get_token, ExchangeSettings, LoginOutcome};
//!
//! # async fn run() -> Result<(), devtool_sdk::SdkError> {
//! let server = "https://rancher.example.com";
//! if let LoginOutcome::Obtained(token) = get_token(server, ExchangeSettings::default()).await? {
//!     let client = get_client(server, token.secret())?;
//!     client.ensure_namespace("team-x-dev", "cluster-a", "team-x").await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod browser;
pub mod client;
pub mod credentials;
pub mod error;
pub mod login;
pub mod paths;

pub use api::{
    normalize_server_url, HttpManagementApi, ManagementApi, ServerConfig, DEFAULT_REQUEST_TIMEOUT,
};
pub use browser::{SystemBrowser, UrlOpener};
pub use client::{get_client, RancherClient, TOKEN_DESCRIPTION};
pub use credentials::RancherCredentials;
pub use error::{ErrorKind, ResourceKind, ResultExt, SdkError};
pub use login::{
    get_token, ExchangeSettings, HttpTokenEndpoint, LoginChallenge, LoginOutcome, Token,
    TokenEndpoint, TokenExchange,
};
pub use paths::ApiPaths;
