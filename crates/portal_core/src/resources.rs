//! Unified resource search, resource details and downloads from the local backend.
//!
//! The backend merges hits from every connected system into one list; each
//! hit names its `source`, and the page a user should open depends on it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{non_blank, scalar_to_string};
use crate::DEFAULT_TITLE;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceSource {
    Local,
    Koha,
    Dspace,
    Vufind,
    #[default]
    #[serde(other)]
    Other,
}

impl fmt::Display for ResourceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceSource::Local => write!(f, "local"),
            ResourceSource::Koha => write!(f, "catalog"),
            ResourceSource::Dspace => write!(f, "repository"),
            ResourceSource::Vufind => write!(f, "discovery"),
            ResourceSource::Other => write!(f, "other"),
        }
    }
}

/// Optional narrowing of a unified search; empty values are not sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceFilters {
    pub source: Option<String>,
    pub resource_type: Option<String>,
    pub year: Option<String>,
}

impl ResourceFilters {
    pub fn query_params(&self, query: &str, limit: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", query.trim().to_string())];
        for (key, value) in [
            ("source", &self.source),
            ("type", &self.resource_type),
            ("year", &self.year),
        ] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push((key, value.to_string()));
            }
        }
        params.push(("limit", limit.to_string()));
        params
    }
}

/// Where each source's records are shown to a user. Templates contain `{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLinks {
    pub local: String,
    pub catalog: String,
    pub repository: String,
    pub discovery: String,
}

impl SourceLinks {
    fn template(&self, source: ResourceSource) -> Option<&str> {
        match source {
            ResourceSource::Local => Some(&self.local),
            ResourceSource::Koha => Some(&self.catalog),
            ResourceSource::Dspace => Some(&self.repository),
            ResourceSource::Vufind => Some(&self.discovery),
            ResourceSource::Other => None,
        }
    }
}

/// One row of the backend's `results` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceHit {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "author")]
    pub authors: Option<String>,
    #[serde(default)]
    pub source: ResourceSource,
    #[serde(default)]
    pub external_id: Value,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub year: Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceSearchPage {
    #[serde(default)]
    pub results: Vec<ResourceHit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub id: Option<String>,
    pub title: String,
    pub authors: Option<String>,
    pub source: ResourceSource,
    pub external_id: Option<String>,
    pub resource_type: Option<String>,
    pub year: Option<String>,
    pub description: Option<String>,
    /// Page to open for this record, if one can be built.
    pub link: Option<String>,
}

impl ResourceHit {
    fn into_record(self, links: &SourceLinks) -> ResourceRecord {
        let id = scalar_to_string(&self.id);
        let external_id = scalar_to_string(&self.external_id);
        // Local rows are addressed by their own id, the others by the remote id.
        let key = match self.source {
            ResourceSource::Local => id.as_deref(),
            _ => external_id.as_deref(),
        };
        let link = links
            .template(self.source)
            .zip(key)
            .map(|(template, key)| template.replace("{id}", key))
            .or_else(|| non_blank(self.url));
        ResourceRecord {
            id,
            title: non_blank(self.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            authors: non_blank(self.authors),
            source: self.source,
            external_id,
            resource_type: non_blank(self.resource_type),
            year: scalar_to_string(&self.year),
            description: non_blank(self.description),
            link,
        }
    }
}

pub fn project_resources(page: ResourceSearchPage, links: &SourceLinks) -> Vec<ResourceRecord> {
    page.results
        .into_iter()
        .map(|hit| hit.into_record(links))
        .collect()
}

/// Number of records per source, in source order.
pub fn count_by_source(records: &[ResourceRecord]) -> BTreeMap<ResourceSource, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.source).or_insert(0) += 1;
    }
    counts
}

/// A resource stored in the local backend's catalogue.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceDetail {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: ResourceSource,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub view_url: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default)]
    pub view_count: u64,
}

/// Outcome of asking the backend for a resource's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceDownload {
    File {
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    /// The content lives in another system; open this address instead.
    External { url: String },
}

/// File name from a `Content-Disposition` header value, if it names one.
pub fn attachment_file_name(disposition: &str) -> Option<String> {
    disposition.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let name = value.trim().trim_matches('"');
        // Strip any directory the server may have left in.
        let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Usage figures for the admin analytics page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AnalyticsReport {
    pub downloads_per_month: Vec<MonthCount>,
    pub top_searches: Vec<QueryCount>,
    pub source_distribution: Vec<SourceCount>,
    pub popular_resources: Vec<PopularResource>,
    pub user_activity: Vec<DayCount>,
    pub total_resources: u64,
    pub total_downloads: u64,
    pub total_searches: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonthCount {
    #[serde(default)]
    pub month: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryCount {
    #[serde(default)]
    pub query: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceCount {
    #[serde(default)]
    pub source: ResourceSource,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PopularResource {
    #[serde(default)]
    pub title: String,
    pub download_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DayCount {
    #[serde(default)]
    pub date: Option<String>,
    pub count: u64,
}
