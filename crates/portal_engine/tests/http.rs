use std::time::Duration;

use portal_engine::{Credential, FailureKind, HttpClient, HttpSettings, RetryPolicy};
use reqwest::Method;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(request_timeout: Duration, max_attempts: u32) -> HttpSettings {
    HttpSettings {
        connect_timeout: Duration::from_secs(1),
        request_timeout,
        retry: RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(10),
        },
    }
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    let client = HttpClient::new(
        &server.uri(),
        settings(Duration::from_millis(100), 1),
        CancellationToken::new(),
    )
    .unwrap();

    let err = client.get_json::<Value>("slow", &[]).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn cancellation_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let cancel = CancellationToken::new();
    let client = HttpClient::new(
        &server.uri(),
        settings(Duration::from_secs(5), 1),
        cancel.child_token(),
    )
    .unwrap();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = client.get_json::<Value>("slow", &[]).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Cancelled);
}

#[tokio::test]
async fn idempotent_reads_retry_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;
    let client = HttpClient::new(
        &server.uri(),
        settings(Duration::from_secs(2), 3),
        CancellationToken::new(),
    )
    .unwrap();

    let body: Value = client.get_json("flaky", &[]).await.unwrap();
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn default_policy_does_not_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    let client =
        HttpClient::new(&server.uri(), HttpSettings::default(), CancellationToken::new()).unwrap();

    let err = client.get_json::<Value>("flaky", &[]).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(503));
}

#[tokio::test]
async fn writes_are_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;
    let client = HttpClient::new(
        &server.uri(),
        settings(Duration::from_secs(2), 5),
        CancellationToken::new(),
    )
    .unwrap();

    let builder = client.request(Method::POST, "items").unwrap();
    let err = client.send(builder).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(502));
}

#[tokio::test]
async fn unauthorized_is_its_own_kind_and_credentials_are_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/private/"))
        .and(header("Authorization", "Token k-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    let client =
        HttpClient::new(&server.uri(), HttpSettings::default(), CancellationToken::new()).unwrap();
    client
        .credentials()
        .set(Some(Credential::Token("k-1".to_string())));

    let err = client.get_json::<Value>("/api/private/", &[]).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[test]
fn base_url_keeps_its_path() {
    let client = HttpClient::new(
        "http://localhost:8080/server/api",
        HttpSettings::default(),
        CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(
        client.url("core/collections").unwrap().as_str(),
        "http://localhost:8080/server/api/core/collections"
    );
}

#[test]
fn malformed_base_url_is_rejected() {
    let err = HttpClient::new("not a url", HttpSettings::default(), CancellationToken::new())
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
