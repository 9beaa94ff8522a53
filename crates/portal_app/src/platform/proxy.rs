//! Reverse proxy in front of the catalog.
//!
//! Everything under the configured prefix is forwarded unchanged (method,
//! path, query, headers, body) to the target; only `Host` is rewritten to
//! the target's. Redirects are passed back to the caller rather than
//! followed, and every response carries permissive CORS headers.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use portal_engine::{HttpSettings, ProxyConfig};
use portal_logging::{portal_debug, portal_info, portal_warn};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Largest request body the proxy buffers before forwarding.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid proxy target {0:?}")]
    InvalidTarget(String),
    #[error("could not build upstream client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("proxy server failed: {0}")]
    Serve(std::io::Error),
}

struct ProxyState {
    client: reqwest::Client,
    target: Url,
}

pub fn router(config: &ProxyConfig, settings: &HttpSettings) -> Result<Router, ProxyError> {
    let target = Url::parse(&config.target)
        .map_err(|_| ProxyError::InvalidTarget(config.target.clone()))?;
    if target.cannot_be_a_base() {
        return Err(ProxyError::InvalidTarget(config.target.clone()));
    }
    let client = reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let state = Arc::new(ProxyState { client, target });

    let prefix = config.prefix.trim_end_matches('/');
    let mut routes = Router::new().route("/", any(forward));
    if !prefix.is_empty() {
        // The wildcard needs a non-empty tail, so `{prefix}/` is its own route.
        routes = Router::new()
            .route(prefix, any(forward))
            .route(&format!("{prefix}/"), any(forward));
    }
    Ok(routes
        .route(&format!("{prefix}/{{*path}}"), any(forward))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state))
}

/// Serves the proxy until `shutdown` is cancelled.
pub async fn serve(
    config: &ProxyConfig,
    settings: &HttpSettings,
    shutdown: CancellationToken,
) -> Result<(), ProxyError> {
    let app = router(config, settings)?;
    let listener = TcpListener::bind(&config.listen)
        .await
        .map_err(|source| ProxyError::Bind {
            addr: config.listen.clone(),
            source,
        })?;
    portal_info!(
        "Catalog proxy listening on {} ({} -> {})",
        config.listen,
        config.prefix,
        config.target
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(ProxyError::Serve)
}

async fn forward(State(state): State<Arc<ProxyState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let upstream = format!(
        "{}{}",
        state.target.as_str().trim_end_matches('/'),
        path_and_query
    );
    portal_debug!("proxy {} {} -> {}", parts.method, parts.uri, upstream);

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            portal_warn!("Rejecting proxied request body: {}", err);
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let result = state
        .client
        .request(parts.method.clone(), &upstream)
        .headers(forwardable(&parts.headers))
        .body(body)
        .send()
        .await;
    let upstream_response = match result {
        Ok(response) => response,
        Err(err) => {
            portal_warn!("Upstream {} failed: {}", upstream, err);
            return (StatusCode::BAD_GATEWAY, format!("upstream unavailable: {err}"))
                .into_response();
        }
    };

    let status = upstream_response.status();
    let headers = forwardable(upstream_response.headers());
    let bytes = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            portal_warn!("Reading upstream {} failed: {}", upstream, err);
            return (StatusCode::BAD_GATEWAY, format!("upstream read failed: {err}"))
                .into_response();
        }
    };
    portal_debug!("proxy {} {} <- {}", parts.method, parts.uri, status);

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Copies headers minus `Host`, `Content-Length` and hop-by-hop headers.
fn forwardable(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    name == header::HOST
        || name == header::CONTENT_LENGTH
        || name == header::CONNECTION
        || name == header::TRANSFER_ENCODING
        || name == header::UPGRADE
        || name == header::TE
        || name == header::TRAILER
        || name == header::PROXY_AUTHENTICATE
        || name == header::PROXY_AUTHORIZATION
        || name.as_str() == "keep-alive"
}
