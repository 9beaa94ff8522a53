use std::sync::Arc;

use portal_core::{
    attachment_file_name, project_resources, AnalyticsReport, FileRef, ResourceDetail,
    ResourceDownload, ResourceFilters, ResourceRecord, ResourceSearchPage, SourceLinks,
    StoredFile, UploadFile,
};
use portal_logging::{portal_debug, portal_info, portal_warn};
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;

use crate::auth::AuthService;
use crate::http::HttpClient;
use crate::{FailureKind, RequestError};

const UPLOAD_PATH: &str = "api/resources/upload-file/";
const SEARCH_PATH: &str = "api/resources/search-files/";
const LIST_PATH: &str = "api/resources/uploaded-files/";
const RESOURCE_SEARCH_PATH: &str = "api/resources/search/";
const ANALYTICS_PATH: &str = "api/analytics/dashboard/";

/// Reply of the download endpoint for content held elsewhere.
#[derive(Debug, Deserialize)]
struct ExternalDownload {
    #[serde(default)]
    download_url: String,
}

/// File endpoints of the local backend.
///
/// Requests carry the credential the [`AuthService`] attaches to the shared
/// client. A 401 ends the session that was current when the request started.
pub struct LocalBackend {
    http: HttpClient,
    auth: Arc<AuthService>,
    links: SourceLinks,
}

impl LocalBackend {
    pub fn new(http: HttpClient, auth: Arc<AuthService>, links: SourceLinks) -> Self {
        Self { http, auth, links }
    }

    pub async fn upload_file(
        &self,
        title: &str,
        description: &str,
        file: &UploadFile,
    ) -> Result<FileRef, RequestError> {
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        if let Some(content_type) = &file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|err| RequestError::new(FailureKind::InvalidRequest, err.to_string()))?;
        }
        let form = Form::new()
            .text("title", title.to_string())
            .text("description", description.to_string())
            .part("file", part);
        let builder = self.http.request(Method::POST, UPLOAD_PATH)?.multipart(form);
        self.call(builder, false).await?;
        portal_info!("Uploaded {} ({} bytes) to the local backend", file.name, file.bytes.len());
        Ok(file.file_ref())
    }

    pub async fn search_files(&self, query: &str) -> Result<Vec<StoredFile>, RequestError> {
        let builder = self
            .http
            .request(Method::GET, SEARCH_PATH)?
            .query(&[("q", query)]);
        let response = self.call(builder, true).await?;
        let files: Vec<StoredFile> = self.http.read_json(response).await?;
        portal_debug!("File search {:?}: {} hit(s)", query, files.len());
        Ok(files)
    }

    pub async fn list_files(&self) -> Result<Vec<StoredFile>, RequestError> {
        let builder = self.http.request(Method::GET, LIST_PATH)?;
        let response = self.call(builder, true).await?;
        self.http.read_json(response).await
    }

    /// Searches every connected system through the backend's unified search.
    ///
    /// Each record carries the page to open in its own system.
    pub async fn search_resources(
        &self,
        query: &str,
        filters: &ResourceFilters,
        limit: u32,
    ) -> Result<Vec<ResourceRecord>, RequestError> {
        let builder = self
            .http
            .request(Method::GET, RESOURCE_SEARCH_PATH)?
            .query(&filters.query_params(query, limit));
        let response = self.call(builder, true).await?;
        let page: ResourceSearchPage = self.http.read_json(response).await?;
        let records = project_resources(page, &self.links);
        portal_debug!("Resource search {:?}: {} hit(s)", query, records.len());
        Ok(records)
    }

    pub async fn resource(&self, id: u64) -> Result<ResourceDetail, RequestError> {
        let builder = self
            .http
            .request(Method::GET, &format!("api/resources/{id}/"))?;
        let response = self.call(builder, true).await?;
        self.http.read_json(response).await
    }

    /// Fetches a resource's content, or the address of the system holding it.
    pub async fn download(&self, id: u64) -> Result<ResourceDownload, RequestError> {
        let builder = self
            .http
            .request(Method::GET, &format!("api/resources/{id}/download/"))?;
        let response = self.call(builder, true).await?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let disposition = header(CONTENT_DISPOSITION);

        if content_type
            .as_deref()
            .is_some_and(|value| value.starts_with("application/json"))
        {
            let reply: ExternalDownload = self.http.read_json(response).await?;
            if reply.download_url.trim().is_empty() {
                return Err(RequestError::new(
                    FailureKind::Decode,
                    format!("resource {id} has no download address"),
                ));
            }
            return Ok(ResourceDownload::External {
                url: reply.download_url,
            });
        }

        let bytes = self.http.read_bytes(response).await?;
        let file_name = disposition
            .as_deref()
            .and_then(attachment_file_name)
            .unwrap_or_else(|| format!("resource-{id}"));
        portal_info!("Downloaded resource {} as {} ({} bytes)", id, file_name, bytes.len());
        Ok(ResourceDownload::File {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Usage figures over the last `days` days. Admin accounts only.
    pub async fn analytics(&self, days: u32) -> Result<AnalyticsReport, RequestError> {
        let builder = self
            .http
            .request(Method::GET, ANALYTICS_PATH)?
            .query(&[("days", days.max(1).to_string())]);
        let response = self.call(builder, true).await?;
        self.http.read_json(response).await
    }

    async fn call(&self, builder: RequestBuilder, idempotent: bool) -> Result<Response, RequestError> {
        let generation = self.auth.generation();
        let result = if idempotent {
            self.http.send_idempotent(builder).await
        } else {
            self.http.send(builder).await
        };
        if let Err(err) = &result {
            if err.is_unauthorized() {
                portal_warn!("Local backend rejected the session: {}", err);
                self.auth.expire(generation);
            }
        }
        result
    }
}
