//! Portal configuration.
//!
//! Every endpoint, port and credential the portal talks to lives here rather
//! than in code. The file format is RON; any field may be omitted and falls
//! back to the local development defaults. Secrets default to empty and are
//! expected to come from the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use portal_core::SourceLinks;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::catalog::TokenPolicy;
use crate::http::{HttpSettings, RetryPolicy};

pub const ENV_CATALOG_URL: &str = "PORTAL_CATALOG_URL";
pub const ENV_CATALOG_CLIENT_ID: &str = "PORTAL_CATALOG_CLIENT_ID";
pub const ENV_CATALOG_CLIENT_SECRET: &str = "PORTAL_CATALOG_CLIENT_SECRET";
pub const ENV_REPOSITORY_URL: &str = "PORTAL_REPOSITORY_URL";
pub const ENV_LOCAL_URL: &str = "PORTAL_LOCAL_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config syntax: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub catalog: CatalogConfig,
    pub repository: RepositoryConfig,
    pub local: LocalConfig,
    pub proxy: ProxyConfig,
    pub http: HttpConfig,
    pub links: LinkConfig,
    /// Directory holding the persisted session token.
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog REST root; `oauth/token` and `biblios` are resolved against it.
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Public detail page of a record; `{id}` is replaced by the record id.
    pub detail_url_template: String,
    pub token_policy: TokenPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub api_url: String,
    pub collections_page_size: u32,
    /// Upper bound on collections whose counts are fetched at the same time.
    pub max_concurrent_collections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub base_url: String,
}

/// Public pages of records found through the unified search; `{id}` is the
/// record's id in that system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub repository_item_template: String,
    pub discovery_record_template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub listen: String,
    pub target: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            repository: RepositoryConfig::default(),
            local: LocalConfig::default(),
            proxy: ProxyConfig::default(),
            http: HttpConfig::default(),
            links: LinkConfig::default(),
            state_dir: PathBuf::from(".portal"),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api/v1".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            detail_url_template:
                "http://127.0.0.1:8085/cgi-bin/koha/catalogue/detail.pl?biblionumber={id}"
                    .to_string(),
            token_policy: TokenPolicy::PerRequest,
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/server/api".to_string(),
            collections_page_size: 100,
            max_concurrent_collections: 4,
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            repository_item_template: "http://localhost:4000/handle/{id}".to_string(),
            discovery_record_template: "http://localhost:8090/Record/{id}".to_string(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3001".to_string(),
            target: "http://127.0.0.1:8085".to_string(),
            prefix: "/api/v1".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            max_attempts: 1,
            backoff_ms: 250,
        }
    }
}

impl HttpConfig {
    pub fn settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            retry: RetryPolicy {
                max_attempts: self.max_attempts.max(1),
                backoff: Duration::from_millis(self.backoff_ms),
            },
        }
    }
}

impl PortalConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: PortalConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let apply = |key: &str, field: &mut String| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        };
        apply(ENV_CATALOG_URL, &mut self.catalog.base_url);
        apply(ENV_CATALOG_CLIENT_ID, &mut self.catalog.client_id);
        apply(ENV_CATALOG_CLIENT_SECRET, &mut self.catalog.client_secret);
        apply(ENV_REPOSITORY_URL, &mut self.repository.api_url);
        apply(ENV_LOCAL_URL, &mut self.local.base_url);
        self
    }

    pub fn source_links(&self) -> SourceLinks {
        SourceLinks {
            local: format!(
                "{}/api/resources/{{id}}/preview/",
                self.local.base_url.trim_end_matches('/')
            ),
            catalog: self.catalog.detail_url_template.clone(),
            repository: self.links.repository_item_template.clone(),
            discovery: self.links.discovery_record_template.clone(),
        }
    }

    pub fn with_process_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("catalog.base_url", &self.catalog.base_url)?;
        check_url("repository.api_url", &self.repository.api_url)?;
        check_url("local.base_url", &self.local.base_url)?;
        check_url("proxy.target", &self.proxy.target)?;
        for (field, template) in [
            ("catalog.detail_url_template", &self.catalog.detail_url_template),
            ("links.repository_item_template", &self.links.repository_item_template),
            ("links.discovery_record_template", &self.links.discovery_record_template),
        ] {
            if !template.contains("{id}") {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must contain {id}".to_string(),
                });
            }
        }
        if !self.proxy.prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "proxy.prefix",
                reason: "must start with '/'".to_string(),
            });
        }
        if self.repository.collections_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "repository.collections_page_size",
                reason: "must be positive".to_string(),
            });
        }
        if self.repository.max_concurrent_collections == 0 {
            return Err(ConfigError::Invalid {
                field: "repository.max_concurrent_collections",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|err| ConfigError::Invalid {
            field,
            reason: err.to_string(),
        })
}
