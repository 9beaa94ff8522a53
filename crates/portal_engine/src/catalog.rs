use std::time::{Duration, Instant};

use portal_core::{project_records, Biblio, CatalogRecord};
use portal_logging::{portal_debug, portal_info, portal_warn};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::CatalogConfig;
use crate::http::HttpClient;
use crate::RequestError;

const TOKEN_PATH: &str = "oauth/token";
const BIBLIOS_PATH: &str = "biblios";
/// Cached tokens are dropped this long before the catalog says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);
/// Lifetime assumed when the token response carries no `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

/// How client-credentials tokens are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TokenPolicy {
    /// Fetch a fresh token before every search.
    #[default]
    PerRequest,
    /// Reuse a token until shortly before it expires.
    CacheUntilExpiry,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Read-only access to the library catalog's bibliographic records.
pub struct CatalogAdapter {
    http: HttpClient,
    client_id: String,
    client_secret: String,
    detail_url_template: String,
    policy: TokenPolicy,
    cached: Mutex<Option<CachedToken>>,
}

impl CatalogAdapter {
    pub fn new(http: HttpClient, config: &CatalogConfig) -> Self {
        if config.client_secret.is_empty() {
            portal_warn!("Catalog client secret is empty; catalog searches will fail");
        }
        Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            detail_url_template: config.detail_url_template.clone(),
            policy: config.token_policy,
            cached: Mutex::new(None),
        }
    }

    /// Records on the first page of `limit` whose title or author contains `query`.
    ///
    /// Any failure yields an empty list, so "nothing matched" and "catalog
    /// unavailable" look the same to the caller.
    pub async fn search(&self, query: &str, limit: u32) -> Vec<CatalogRecord> {
        match self.fetch_page(limit).await {
            Ok(biblios) => {
                portal_debug!("Catalog returned {} biblios", biblios.len());
                let records = project_records(biblios, query, &self.detail_url_template);
                portal_info!("Catalog search {:?}: {} record(s)", query, records.len());
                records
            }
            Err(err) => {
                portal_warn!("Catalog search {:?} failed: {}", query, err);
                Vec::new()
            }
        }
    }

    pub async fn recent(&self, limit: u32) -> Vec<CatalogRecord> {
        self.search("", limit).await
    }

    async fn fetch_page(&self, limit: u32) -> Result<Vec<Biblio>, RequestError> {
        let token = self.access_token().await?;
        let builder = self
            .http
            .request(Method::GET, BIBLIOS_PATH)?
            .bearer_auth(&token)
            .query(&[("_per_page", limit.to_string())]);
        let result = match self.http.send_idempotent(builder).await {
            Ok(response) => self.http.read_json(response).await,
            Err(err) => Err(err),
        };
        if result.as_ref().is_err_and(RequestError::is_unauthorized) {
            self.cached.lock().await.take();
        }
        result
    }

    async fn access_token(&self) -> Result<String, RequestError> {
        match self.policy {
            TokenPolicy::PerRequest => Ok(self.request_token().await?.token),
            TokenPolicy::CacheUntilExpiry => {
                let mut cached = self.cached.lock().await;
                if let Some(entry) = cached.as_ref() {
                    if Instant::now() < entry.expires_at {
                        return Ok(entry.token.clone());
                    }
                }
                let fresh = self.request_token().await?;
                let token = fresh.token.clone();
                *cached = Some(fresh);
                Ok(token)
            }
        }
    }

    async fn request_token(&self) -> Result<CachedToken, RequestError> {
        let builder = self.http.request(Method::POST, TOKEN_PATH)?.form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]);
        let response = self.http.send(builder).await?;
        let body: TokenResponse = self.http.read_json(response).await?;
        portal_debug!(
            "Catalog token {} acquired",
            portal_logging::token_preview(&body.access_token)
        );

        let lifetime = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        Ok(CachedToken {
            token: body.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}
