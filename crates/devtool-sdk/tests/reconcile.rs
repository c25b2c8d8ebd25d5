//! Provisioning against a live mock management server.

use std::time::Duration;

use devtool_models::{ClusterId, ClusterState};
use devtool_sdk::{get_client, ErrorKind, RancherClient, ServerConfig, TOKEN_DESCRIPTION};
use mock_rancher::{MockRancher, DEFAULT_LOGIN_TOKEN};

fn inventory() -> MockRancher {
    MockRancher::new()
        .with_system_cluster("local", "local")
        .with_cluster("c-aaaaa", "cluster-a", ClusterState::Active)
        .with_cluster("c-bbbbb", "cluster-b", ClusterState::Active)
        .with_cluster("c-ccccc", "cluster-old", ClusterState::Stopped)
        .with_project("c-bbbbb:p-00001", "team-x")
        .requiring_auth()
}

async fn connect(mock: &MockRancher) -> RancherClient {
    let base = mock.clone().spawn().await.unwrap();
    get_client(&base, DEFAULT_LOGIN_TOKEN).unwrap()
}

#[tokio::test]
async fn ensure_project_creates_with_name_as_description() {
    let mock = inventory();
    let client = connect(&mock).await;

    let project = client.ensure_project("cluster-a", "team-x").await.unwrap();

    assert_eq!(project.name, "team-x");
    assert_eq!(project.description, "team-x");
    assert_eq!(project.cluster_id, ClusterId::new("c-aaaaa"));
    assert_eq!(project.id.cluster_id(), Some(ClusterId::new("c-aaaaa")));
    assert_eq!(mock.counts().projects_created, 1);
}

#[tokio::test]
async fn ensure_project_is_idempotent() {
    let mock = inventory();
    let client = connect(&mock).await;

    let first = client.ensure_project("cluster-a", "team-y").await.unwrap();
    let second = client.ensure_project("cluster-a", "team-y").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(mock.counts().projects_created, 1);
}

#[tokio::test]
async fn same_project_name_in_other_cluster_is_not_reused() {
    let mock = inventory();
    let client = connect(&mock).await;

    let project = client.ensure_project("cluster-a", "team-x").await.unwrap();

    assert_ne!(project.id.as_str(), "c-bbbbb:p-00001");
    assert_eq!(mock.counts().projects_created, 1);
}

#[tokio::test]
async fn ensure_namespace_is_idempotent() {
    let mock = inventory();
    let client = connect(&mock).await;

    let first = client
        .ensure_namespace("team-x-dev", "cluster-b", "team-x")
        .await
        .unwrap();
    let second = client
        .ensure_namespace("team-x-dev", "cluster-b", "team-x")
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.project_id.unwrap().as_str(), "c-bbbbb:p-00001");
    assert_eq!(mock.counts().namespaces_created, 1);
}

#[tokio::test]
async fn ensure_namespace_never_creates_the_project() {
    let mock = inventory();
    let client = connect(&mock).await;

    let err = client
        .ensure_namespace("team-z-dev", "cluster-a", "team-z")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(mock.counts().projects_created, 0);
    assert_eq!(mock.counts().namespaces_created, 0);
}

#[tokio::test]
async fn stopped_and_system_clusters_are_not_found() {
    let mock = inventory();
    let client = connect(&mock).await;

    for name in ["cluster-old", "local"] {
        let err = client.find_cluster(name).await.unwrap_err();
        assert!(err.is_not_found(), "{name}: {err}");
    }
}

#[tokio::test]
async fn rejected_credentials_are_not_mistaken_for_absence() {
    let mock = inventory();
    let base = mock.clone().spawn().await.unwrap();
    let client = get_client(&base, "token-wrong:wrong").unwrap();

    let err = client.ensure_project("cluster-a", "team-x").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!err.is_not_found());
    assert_eq!(mock.counts().projects_created, 0);
}

#[tokio::test]
async fn kubeconfig_is_returned_verbatim() {
    let mock = inventory();
    let client = connect(&mock).await;

    let document = client.fetch_kubeconfig("cluster-a").await.unwrap();

    assert!(document.starts_with("apiVersion: v1"));
    assert!(document.contains("/k8s/clusters/c-aaaaa"));
    assert_eq!(mock.counts().kubeconfigs_generated, 1);
}

#[tokio::test]
async fn kubeconfig_for_unknown_cluster_is_not_found() {
    let mock = inventory();
    let client = connect(&mock).await;

    let err = client.fetch_kubeconfig("cluster-z").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(mock.counts().kubeconfigs_generated, 0);
}

#[tokio::test]
async fn created_token_authenticates() {
    let mock = inventory();
    let base = mock.clone().spawn().await.unwrap();
    let client = get_client(&base, DEFAULT_LOGIN_TOKEN).unwrap();

    let record = client.create_token(TOKEN_DESCRIPTION).await.unwrap();
    assert_eq!(record.description, TOKEN_DESCRIPTION);

    let long_lived = get_client(&base, &record.token).unwrap();
    long_lived.find_cluster("cluster-a").await.unwrap();
}

#[tokio::test]
async fn stalled_server_fails_instead_of_hanging() {
    // Accepts connections and never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let server = ServerConfig::new(&base, DEFAULT_LOGIN_TOKEN)
        .unwrap()
        .request_timeout(Duration::from_millis(200));
    let client = RancherClient::connect(&server).unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), client.create_token(TOKEN_DESCRIPTION))
        .await
        .expect("request timeout fires first")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}
