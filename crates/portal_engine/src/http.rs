use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use portal_logging::{portal_debug, portal_trace};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{FailureKind, RequestError};

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Retry behaviour for idempotent reads. One attempt means no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// `Authorization: Token <key>`, as issued by the local backend.
    Token(String),
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// A complete header value handed out by the remote system.
    Header(String),
}

impl Credential {
    fn header_value(&self) -> String {
        match self {
            Credential::Token(key) => format!("Token {key}"),
            Credential::Bearer(token) => format!("Bearer {token}"),
            Credential::Header(value) => value.clone(),
        }
    }
}

/// Shared, swappable credential attached to every request of one client.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    inner: Arc<RwLock<Option<Credential>>>,
}

impl Credentials {
    pub fn set(&self, credential: Option<Credential>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = credential;
    }

    pub fn get(&self) -> Option<Credential> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// REST client bound to one backend: base URL, cookie jar, credentials,
/// timeouts and a cancellation token shared with the owning context.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
    settings: HttpSettings,
    credentials: Credentials,
    cancel: CancellationToken,
}

impl HttpClient {
    pub fn new(
        base_url: &str,
        settings: HttpSettings,
        cancel: CancellationToken,
    ) -> Result<Self, RequestError> {
        let base_url = normalize_base(base_url)?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .cookie_store(true)
            .build()
            .map_err(|err| RequestError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            settings,
            credentials: Credentials::default(),
            cancel,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Resolves `path` (relative, no leading slash needed) against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, RequestError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| RequestError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    /// Starts a request with the current credentials and a JSON `Accept` header.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RequestError> {
        self.request_with(method, path, self.credentials.get())
    }

    /// Like [`HttpClient::request`], but `credential` replaces the shared one.
    pub fn request_with(
        &self,
        method: Method,
        path: &str,
        credential: Option<Credential>,
    ) -> Result<RequestBuilder, RequestError> {
        let url = self.url(path)?;
        portal_trace!("{} {}", method, url);
        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(credential) = credential {
            builder = builder.header(AUTHORIZATION, credential.header_value());
        }
        Ok(builder)
    }

    /// Sends a request once. Non-2xx statuses become errors; 401 is reported
    /// as [`FailureKind::Unauthorized`].
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, RequestError> {
        let response = tokio::select! {
            _ = self.cancel.cancelled() => {
                return Err(RequestError::new(FailureKind::Cancelled, "request cancelled"));
            }
            result = builder.send() => result.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(RequestError::new(
                FailureKind::Unauthorized,
                format!("{} returned {status}", response.url()),
            ));
        }
        if !status.is_success() {
            let message = format!("{} returned {status}", response.url());
            let detail = self.failure_detail(response).await;
            let message = match &detail {
                Some(detail) => format!("{message}: {detail}"),
                None => message,
            };
            return Err(
                RequestError::new(FailureKind::HttpStatus(status.as_u16()), message)
                    .with_detail(detail),
            );
        }
        Ok(response)
    }

    async fn failure_detail(&self, response: Response) -> Option<String> {
        let body: Value = tokio::select! {
            _ = self.cancel.cancelled() => return None,
            result = response.json() => result.ok()?,
        };
        ["error", "detail", "message"]
            .into_iter()
            .find_map(|key| body.get(key)?.as_str().map(str::to_string))
    }

    /// Sends an idempotent request, retrying transport failures and 5xx
    /// statuses according to the configured [`RetryPolicy`].
    pub async fn send_idempotent(&self, builder: RequestBuilder) -> Result<Response, RequestError> {
        let attempts = self.settings.retry.max_attempts.max(1);
        let mut attempt = 1;
        let mut current = builder;
        loop {
            let retry_copy = if attempt < attempts {
                current.try_clone()
            } else {
                None
            };
            match self.send(current).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() => {
                    let Some(next) = retry_copy else {
                        return Err(err);
                    };
                    let delay = self.settings.retry.backoff * attempt;
                    portal_debug!(
                        "attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            return Err(RequestError::new(FailureKind::Cancelled, "request cancelled"));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                    current = next;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// GET `path` with `query` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RequestError> {
        let builder = self.request(Method::GET, path)?.query(query);
        let response = self.send_idempotent(builder).await?;
        self.read_json(response).await
    }

    pub async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, RequestError> {
        let bytes = self.read_bytes(response).await?;
        serde_json::from_slice(&bytes)
            .map_err(|err| RequestError::new(FailureKind::Decode, err.to_string()))
    }

    pub async fn read_bytes(&self, response: Response) -> Result<Vec<u8>, RequestError> {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                Err(RequestError::new(FailureKind::Cancelled, "request cancelled"))
            }
            result = response.bytes() => Ok(result.map_err(map_reqwest_error)?.to_vec()),
        }
    }
}

fn normalize_base(base_url: &str) -> Result<Url, RequestError> {
    let mut text = base_url.trim().to_string();
    if !text.ends_with('/') {
        text.push('/');
    }
    Url::parse(&text).map_err(|err| RequestError::new(FailureKind::InvalidUrl, err.to_string()))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> RequestError {
    if err.is_timeout() {
        return RequestError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return RequestError::new(FailureKind::Decode, err.to_string());
    }
    if err.is_builder() {
        return RequestError::new(FailureKind::InvalidRequest, err.to_string());
    }
    RequestError::new(FailureKind::Network, err.to_string())
}
