//! Portal engine: HTTP adapters, session holder, orchestration and persistence.
mod auth;
mod catalog;
mod config;
mod context;
mod dashboard;
mod http;
mod local;
mod persist;
mod repository;
mod token_store;
mod types;
mod upload;

pub use auth::{AuthService, RegistrationError};
pub use catalog::{CatalogAdapter, TokenPolicy};
pub use config::{
    CatalogConfig, ConfigError, HttpConfig, LinkConfig, LocalConfig, PortalConfig, ProxyConfig,
    RepositoryConfig, ENV_CATALOG_CLIENT_ID, ENV_CATALOG_CLIENT_SECRET, ENV_CATALOG_URL,
    ENV_LOCAL_URL, ENV_REPOSITORY_URL,
};
pub use context::PortalContext;
pub use dashboard::DashboardAggregator;
pub use http::{Credential, Credentials, HttpClient, HttpSettings, RetryPolicy};
pub use local::LocalBackend;
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use repository::{CountQuery, RemoteWorkspaceItem, RepositoryAdapter};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::{FailureKind, RequestError};
pub use upload::{
    LocalPipeline, PipelineReport, RepositoryPipeline, UploadOrchestrator, UploadPipeline,
};
