use std::net::SocketAddr;

use portal_app::platform::proxy::router;
use portal_engine::{HttpSettings, ProxyConfig};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn start_proxy(target: String) -> SocketAddr {
    let config = ProxyConfig {
        target,
        ..ProxyConfig::default()
    };
    let app = router(&config, &HttpSettings::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn forwards_method_path_query_headers_and_body() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/oauth/token"))
        .and(query_param("debug", "1"))
        .and(header("x-request-id", "abc"))
        .and(body_string("grant_type=client_credentials"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-upstream", "koha")
                .set_body_string("{\"access_token\":\"t\"}"),
        )
        .expect(1)
        .mount(&upstream)
        .await;
    let addr = start_proxy(upstream.uri()).await;

    let response = client()
        .post(format!("http://{addr}/api/v1/oauth/token?debug=1"))
        .header("x-request-id", "abc")
        .header("content-type", "application/x-www-form-urlencoded")
        .body("grant_type=client_credentials")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers().get("x-upstream").unwrap().to_str().unwrap(),
        "koha"
    );
    assert_eq!(response.text().await.unwrap(), "{\"access_token\":\"t\"}");
}

#[tokio::test]
async fn prefix_with_trailing_slash_is_forwarded() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("root"))
        .expect(1)
        .mount(&upstream)
        .await;
    let addr = start_proxy(upstream.uri()).await;

    let response = client()
        .get(format!("http://{addr}/api/v1/"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "root");
}

#[tokio::test]
async fn host_header_is_rewritten_to_target() {
    let upstream = MockServer::start().await;
    let upstream_host = upstream.address().to_string();
    Mock::given(method("GET"))
        .and(path("/api/v1/biblios"))
        .and(header("host", upstream_host.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&upstream)
        .await;
    let addr = start_proxy(upstream.uri()).await;

    let response = client()
        .get(format!("http://{addr}/api/v1/biblios"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn adds_permissive_cors_headers() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/biblios"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&upstream)
        .await;
    let addr = start_proxy(upstream.uri()).await;

    let response = client()
        .get(format!("http://{addr}/api/v1/biblios"))
        .header("origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap()
            .to_str()
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn redirects_are_returned_not_followed() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/api/v1/new"))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let addr = start_proxy(upstream.uri()).await;

    let response = client()
        .get(format!("http://{addr}/api/v1/old"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 302);
    assert_eq!(
        response.headers().get("location").unwrap().to_str().unwrap(),
        "/api/v1/new"
    );
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = closed.local_addr().unwrap().port();
    drop(closed);
    let addr = start_proxy(format!("http://127.0.0.1:{port}")).await;

    let response = client()
        .get(format!("http://{addr}/api/v1/biblios"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 502);
}

#[tokio::test]
async fn paths_outside_prefix_are_not_forwarded() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let addr = start_proxy(upstream.uri()).await;

    let response = client()
        .get(format!("http://{addr}/cgi-bin/koha/opac-main.pl"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}
