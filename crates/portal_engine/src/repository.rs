//! Digital repository REST adapter.
//!
//! The repository authenticates with a session cookie plus a bearer header
//! returned by the login call, and protects mutating requests with an XSRF
//! token echoed back from response headers. Any unauthorized response drops
//! the adapter back to [`RepositoryPhase::Anonymous`] and bumps its epoch so
//! that submissions in flight stop issuing further calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use portal_core::{
    AuthError, AuthFailureReason, Collection, FileRef, PatchOperation, RepositoryEvent,
    RepositoryPhase, UploadFile, UserContentStats, WorkspaceItem,
};
use portal_logging::{portal_debug, portal_info, portal_warn};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::{Credential, HttpClient};
use crate::{FailureKind, RequestError};

const XSRF_RESPONSE_HEADER: &str = "DSPACE-XSRF-TOKEN";
const XSRF_REQUEST_HEADER: &str = "X-XSRF-TOKEN";

/// Parameters of one discovery count query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountQuery {
    pub dso_type: Option<String>,
    pub configuration: Option<String>,
    pub scope: Option<String>,
}

impl CountQuery {
    pub fn collections() -> Self {
        Self {
            dso_type: Some("COLLECTION".to_string()),
            ..Self::default()
        }
    }

    pub fn archived_items() -> Self {
        Self {
            dso_type: Some("ITEM".to_string()),
            ..Self::default()
        }
    }

    pub fn workflow_items() -> Self {
        Self {
            configuration: Some("workflow".to_string()),
            ..Self::default()
        }
    }

    pub fn within(mut self, scope: Option<&str>) -> Self {
        self.scope = scope.map(str::to_string);
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("size", "1".to_string())];
        if let Some(dso_type) = &self.dso_type {
            params.push(("dsoType", dso_type.clone()));
        }
        if let Some(configuration) = &self.configuration {
            params.push(("configuration", configuration.clone()));
        }
        if let Some(scope) = &self.scope {
            params.push(("scope", scope.clone()));
        }
        params
    }
}

/// Workspace item as listed by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteWorkspaceItem {
    pub id: String,
    pub last_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthStatus {
    #[serde(default)]
    authenticated: bool,
}

#[derive(Debug, Deserialize)]
struct CollectionPage {
    #[serde(rename = "_embedded", default)]
    embedded: Option<EmbeddedCollections>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedCollections {
    #[serde(default)]
    collections: Vec<Collection>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceItemPage {
    #[serde(rename = "_embedded", default)]
    embedded: Option<EmbeddedWorkspaceItems>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedWorkspaceItems {
    #[serde(default)]
    workspaceitems: Vec<RawWorkspaceItem>,
}

#[derive(Debug, Deserialize)]
struct RawWorkspaceItem {
    id: Value,
    #[serde(rename = "lastModified", default)]
    last_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(rename = "_embedded")]
    embedded: DiscoveryEmbedded,
}

#[derive(Debug, Deserialize)]
struct DiscoveryEmbedded {
    #[serde(rename = "searchResult")]
    search_result: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    page: PageInfo,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "totalElements", default)]
    total_elements: u64,
}

pub struct RepositoryAdapter {
    http: HttpClient,
    phase: Mutex<RepositoryPhase>,
    epoch: AtomicU64,
    xsrf: RwLock<Option<String>>,
}

impl RepositoryAdapter {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            phase: Mutex::new(RepositoryPhase::Anonymous),
            epoch: AtomicU64::new(0),
            xsrf: RwLock::new(None),
        }
    }

    pub fn phase(&self) -> RepositoryPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase().is_authenticated()
    }

    /// Bumped whenever the repository session ends.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.transition(RepositoryEvent::LoginStarted);
        let result = match self.prepare(Method::POST, "authn/login") {
            Ok(builder) => {
                let builder = builder.form(&[("email", email), ("password", password)]);
                self.http.send(builder).await
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(response) => {
                self.observe(&response);
                self.transition(RepositoryEvent::LoginSucceeded);
                portal_info!("Repository session opened for {}", email);
                Ok(())
            }
            Err(err) => {
                self.transition(RepositoryEvent::LoginFailed);
                portal_warn!("Repository login failed: {}", err);
                let reason = match err.kind {
                    FailureKind::Unauthorized | FailureKind::HttpStatus(400..=499) => {
                        AuthFailureReason::InvalidCredentials
                    }
                    _ => AuthFailureReason::Network,
                };
                Err(AuthError::new(reason, err.to_string()))
            }
        }
    }

    /// Asks the repository whether the current cookie session is still valid.
    pub async fn status(&self) -> bool {
        let result: Result<AuthStatus, RequestError> = match self.prepare(Method::GET, "authn/status")
        {
            Ok(builder) => match self.call(builder, true).await {
                Ok(response) => self.http.read_json(response).await,
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        match result {
            Ok(status) => {
                let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
                if status.authenticated && !phase.is_authenticated() {
                    *phase = RepositoryPhase::Authenticated;
                } else if !status.authenticated && phase.is_authenticated() {
                    *phase = RepositoryPhase::Anonymous;
                }
                status.authenticated
            }
            Err(err) => {
                portal_warn!("Repository status check failed: {}", err);
                false
            }
        }
    }

    pub async fn collections(&self, page_size: u32) -> Result<Vec<Collection>, RequestError> {
        let builder = self
            .prepare(Method::GET, "core/collections")?
            .query(&[("size", page_size.to_string())]);
        let response = self.call(builder, true).await?;
        let page: CollectionPage = self.http.read_json(response).await?;
        Ok(page.embedded.map(|e| e.collections).unwrap_or_default())
    }

    pub async fn create_workspace_item(
        &self,
        collection_id: &str,
    ) -> Result<WorkspaceItem, RequestError> {
        let collection_url = self.http.url(&format!("core/collections/{collection_id}"))?;
        let builder = self
            .prepare(Method::POST, "submission/workspaceitems")?
            .json(&json!({ "collection": collection_url.as_str() }));
        let response = self.call(builder, false).await?;
        let body: RawWorkspaceItem = self.http.read_json(response).await?;
        let id = value_to_id(&body.id).ok_or_else(|| {
            RequestError::new(FailureKind::Decode, "workspace item without an id")
        })?;
        portal_info!("Workspace item {} created in collection {}", id, collection_id);
        Ok(WorkspaceItem::new(id, collection_id))
    }

    /// Sends the patch document. An empty patch sends nothing.
    pub async fn update_metadata(
        &self,
        item_id: &str,
        operations: &[PatchOperation],
    ) -> Result<(), RequestError> {
        if operations.is_empty() {
            portal_debug!("No metadata to patch on workspace item {}", item_id);
            return Ok(());
        }
        let builder = self
            .prepare(Method::PATCH, &format!("submission/workspaceitems/{item_id}"))?
            .json(operations);
        self.call(builder, false).await?;
        Ok(())
    }

    pub async fn attach_file(&self, item_id: &str, file: &UploadFile) -> Result<FileRef, RequestError> {
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type).map_err(|err| {
                RequestError::new(FailureKind::InvalidRequest, err.to_string())
            })?;
        }
        let builder = self
            .prepare(
                Method::POST,
                &format!("submission/workspaceitems/{item_id}/sections/upload"),
            )?
            .multipart(Form::new().part("file", part));
        self.call(builder, false).await?;
        portal_debug!("Attached {} to workspace item {}", file.name, item_id);
        Ok(file.file_ref())
    }

    pub async fn workspace_items(&self, size: u32) -> Result<Vec<RemoteWorkspaceItem>, RequestError> {
        let builder = self
            .prepare(Method::GET, "submission/workspaceitems")?
            .query(&[("size", size.to_string())]);
        let response = self.call(builder, true).await?;
        let page: WorkspaceItemPage = self.http.read_json(response).await?;
        Ok(page
            .embedded
            .map(|e| e.workspaceitems)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| {
                Some(RemoteWorkspaceItem {
                    id: value_to_id(&raw.id)?,
                    last_modified: raw.last_modified,
                })
            })
            .collect())
    }

    pub async fn count(&self, query: &CountQuery) -> Result<u64, RequestError> {
        let builder = self
            .prepare(Method::GET, "discover/search/objects")?
            .query(&query.params());
        let response = self.call(builder, true).await?;
        let body: DiscoveryResponse = self.http.read_json(response).await?;
        Ok(body.embedded.search_result.page.total_elements)
    }

    pub async fn user_content_stats(&self, user_id: &str) -> Result<UserContentStats, RequestError> {
        let builder = self.prepare(
            Method::GET,
            &format!("statistics/usercontentstats/{user_id}"),
        )?;
        let response = self.call(builder, true).await?;
        self.http.read_json(response).await
    }

    /// Ends the repository session. Local state is reset even if the remote call fails.
    pub async fn logout(&self) {
        let request = self.prepare(Method::POST, "authn/logout");
        self.end_session(RepositoryEvent::LoggedOut);
        let result = match request {
            Ok(builder) => self.http.send(builder).await.map(|_| ()),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            portal_warn!("Repository logout failed (ignored): {}", err);
        }
    }

    /// Moves the adapter's phase. Returns the new phase.
    pub fn transition(&self, event: RepositoryEvent) -> RepositoryPhase {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        let next = phase.next(event);
        if next != *phase {
            portal_debug!("Repository phase {:?} -> {:?} on {:?}", *phase, next, event);
        }
        *phase = next;
        next
    }

    fn prepare(&self, method: Method, path: &str) -> Result<RequestBuilder, RequestError> {
        let mutating = method != Method::GET;
        let mut builder = self.http.request(method, path)?;
        if mutating {
            let xsrf = self.xsrf.read().unwrap_or_else(PoisonError::into_inner).clone();
            if let Some(token) = xsrf {
                builder = builder.header(XSRF_REQUEST_HEADER, token);
            }
        }
        Ok(builder)
    }

    async fn call(&self, builder: RequestBuilder, idempotent: bool) -> Result<Response, RequestError> {
        let result = if idempotent {
            self.http.send_idempotent(builder).await
        } else {
            self.http.send(builder).await
        };
        match &result {
            Ok(response) => self.observe(response),
            Err(err) if err.is_unauthorized() => {
                portal_warn!("Repository session expired: {}", err);
                self.end_session(RepositoryEvent::Unauthorized);
            }
            Err(_) => {}
        }
        result
    }

    fn observe(&self, response: &Response) {
        let headers = response.headers();
        if let Some(token) = headers
            .get(XSRF_RESPONSE_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            *self.xsrf.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        }
        if let Some(bearer) = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        {
            self.http
                .credentials()
                .set(Some(Credential::Header(bearer.to_string())));
        }
    }

    fn end_session(&self, event: RepositoryEvent) {
        self.transition(event);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.http.credentials().set(None);
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
