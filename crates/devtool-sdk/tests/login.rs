//! Browser login against a live mock management server.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use devtool_models::ClusterState;
use devtool_sdk::{
    get_client, ApiPaths, ErrorKind, ExchangeSettings, HttpTokenEndpoint, LoginOutcome, SdkError,
    TokenEndpoint, TokenExchange, UrlOpener,
};
use mock_rancher::MockRancher;

/// Plays the operator: visits the login page in the background.
struct Operator;

impl UrlOpener for Operator {
    async fn open(&self, url: &str) -> Result<(), SdkError> {
        let url = url.to_string();
        tokio::spawn(async move {
            let _ = reqwest::get(url).await;
        });
        Ok(())
    }
}

/// Never visits the login page.
struct AbsentOperator;

impl UrlOpener for AbsentOperator {
    async fn open(&self, _url: &str) -> Result<(), SdkError> {
        Ok(())
    }
}

fn fast_settings(timeout: Duration) -> ExchangeSettings {
    ExchangeSettings {
        poll_interval: Duration::from_millis(50),
        timeout,
        request_timeout: Duration::from_secs(5),
        invalidate_timeout: Duration::from_secs(5),
        key_bits: 1024,
        insecure_skip_tls_verify: false,
    }
}

fn exchange<O: UrlOpener>(
    base: &str,
    opener: O,
    settings: ExchangeSettings,
) -> TokenExchange<HttpTokenEndpoint, O> {
    let paths = ApiPaths::new(base);
    let endpoint = HttpTokenEndpoint::new(paths.clone(), &settings).unwrap();
    TokenExchange::new(paths, endpoint, opener, settings)
}

#[tokio::test]
async fn login_yields_usable_token_and_consumes_it() {
    let mock = MockRancher::new()
        .with_login_token("token-op123:opsecret")
        .with_cluster("c-aaaaa", "cluster-a", ClusterState::Active)
        .requiring_auth();
    let base = mock.clone().spawn().await.unwrap();

    let outcome = exchange(&base, Operator, fast_settings(Duration::from_secs(10)))
        .run(std::future::pending())
        .await
        .unwrap();

    let token = outcome.token().expect("token obtained");
    assert_eq!(token.secret(), "token-op123:opsecret");
    assert_eq!(token.credentials().unwrap().access_key(), "token-op123");
    assert_eq!(mock.counts().token_deletes, 1);
    assert_eq!(mock.pending_logins(), 0);

    let client = get_client(&base, token.secret()).unwrap();
    client.find_cluster("cluster-a").await.unwrap();
}

#[tokio::test]
async fn unanswered_login_times_out() {
    let mock = MockRancher::new();
    let base = mock.clone().spawn().await.unwrap();

    let outcome = exchange(&base, AbsentOperator, fast_settings(Duration::from_millis(300)))
        .run(std::future::pending())
        .await
        .unwrap();

    assert_eq!(outcome, LoginOutcome::TimedOut);
    let counts = mock.counts();
    assert!(counts.token_polls >= 1);
    assert_eq!(counts.token_deletes, 0);
}

#[tokio::test]
async fn cancelled_login_stops_polling() {
    let mock = MockRancher::new();
    let base = mock.clone().spawn().await.unwrap();

    let cancel = tokio::time::sleep(Duration::from_millis(120));
    let outcome = exchange(&base, AbsentOperator, fast_settings(Duration::from_secs(10)))
        .run(cancel)
        .await
        .unwrap();

    assert_eq!(outcome, LoginOutcome::Cancelled);
    let polls = mock.counts().token_polls;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(mock.counts().token_polls, polls);
}

/// A proxy in front of the server that answers every poll with `503`.
async fn unavailable_upstream() -> String {
    let app = Router::new().route(
        "/v3-public/authTokens/{id}",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    format!("http://{addr}")
}

#[tokio::test]
async fn unknown_request_id_reads_as_pending() {
    let base = MockRancher::new().spawn().await.unwrap();
    let settings = fast_settings(Duration::from_secs(10));
    let endpoint = HttpTokenEndpoint::new(ApiPaths::new(&base), &settings).unwrap();

    let record = endpoint.fetch("nosuchrequest").await.unwrap();

    assert!(record.is_pending());
}

#[tokio::test]
async fn server_error_on_poll_aborts_login() {
    let base = unavailable_upstream().await;
    let settings = fast_settings(Duration::from_secs(10));
    let endpoint = HttpTokenEndpoint::new(ApiPaths::new(&base), &settings).unwrap();

    let err = endpoint.fetch("anyrequest").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(matches!(err, SdkError::Api { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE));

    let err = exchange(&base, AbsentOperator, settings)
        .run(std::future::pending())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}
