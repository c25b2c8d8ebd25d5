//! `mock-rancher` binary — a local management server for trying dev-tool.
//!
//! Listens on `MOCK_RANCHER_PORT` (default 8080) with a small demo
//! inventory.  Point a dev-tool environment at `http://localhost:8080` and
//! run `dev-tool rancher -e local login`: the login page approves at once.

use devtool_models::ClusterState;
use mock_rancher::{MockRancher, DEFAULT_LOGIN_TOKEN};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("MOCK_RANCHER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let mock = MockRancher::new()
        .with_system_cluster("local", "local")
        .with_cluster("c-m8x2k", "cluster-a", ClusterState::Active)
        .with_cluster("c-q4n7w", "cluster-b", ClusterState::Active)
        .with_cluster("c-z1v5t", "cluster-old", ClusterState::Removing)
        .with_project("c-m8x2k:p-default", "Default")
        .with_project("c-m8x2k:p-system", "System")
        .with_namespace("c-m8x2k:p-default", "default");

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(address = %addr, "mock management server listening");
    println!("MOCK-RANCHER: Listening on http://localhost:{port}");
    println!("MOCK-RANCHER: browser logins issue {DEFAULT_LOGIN_TOKEN}");
    mock.serve(listener).await
}
