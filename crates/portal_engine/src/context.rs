use std::sync::Arc;

use portal_logging::portal_info;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthService;
use crate::catalog::CatalogAdapter;
use crate::config::PortalConfig;
use crate::dashboard::DashboardAggregator;
use crate::http::HttpClient;
use crate::local::LocalBackend;
use crate::repository::RepositoryAdapter;
use crate::token_store::TokenStore;
use crate::upload::UploadOrchestrator;
use crate::RequestError;

/// Every service of the portal, wired from one configuration.
///
/// The local backend client is shared by [`AuthService`] and
/// [`LocalBackend`], so the credential set at login reaches file calls.
/// All clients run under child tokens of one root token.
pub struct PortalContext {
    config: PortalConfig,
    cancel: CancellationToken,
    auth: Arc<AuthService>,
    catalog: Arc<CatalogAdapter>,
    repository: Arc<RepositoryAdapter>,
    local: Arc<LocalBackend>,
    uploads: UploadOrchestrator,
    dashboard: DashboardAggregator,
}

impl PortalContext {
    pub fn new(config: PortalConfig, store: Arc<dyn TokenStore>) -> Result<Self, RequestError> {
        let cancel = CancellationToken::new();
        let settings = config.http.settings();

        let local_http = HttpClient::new(&config.local.base_url, settings.clone(), cancel.child_token())?;
        let catalog_http =
            HttpClient::new(&config.catalog.base_url, settings.clone(), cancel.child_token())?;
        let repository_http =
            HttpClient::new(&config.repository.api_url, settings, cancel.child_token())?;

        let auth = Arc::new(AuthService::new(local_http.clone(), store));
        let local = Arc::new(LocalBackend::new(
            local_http,
            auth.clone(),
            config.source_links(),
        ));
        let catalog = Arc::new(CatalogAdapter::new(catalog_http, &config.catalog));
        let repository = Arc::new(RepositoryAdapter::new(repository_http));
        let uploads = UploadOrchestrator::new(local.clone(), repository.clone());
        let dashboard = DashboardAggregator::new(
            repository.clone(),
            config.repository.collections_page_size,
            config.repository.max_concurrent_collections,
        );

        Ok(Self {
            config,
            cancel,
            auth,
            catalog,
            repository,
            local,
            uploads,
            dashboard,
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    pub fn catalog(&self) -> &Arc<CatalogAdapter> {
        &self.catalog
    }

    pub fn repository(&self) -> &Arc<RepositoryAdapter> {
        &self.repository
    }

    pub fn local(&self) -> &Arc<LocalBackend> {
        &self.local
    }

    pub fn uploads(&self) -> &UploadOrchestrator {
        &self.uploads
    }

    pub fn dashboard(&self) -> &DashboardAggregator {
        &self.dashboard
    }

    /// Cancels every request still in flight. Later requests fail immediately.
    pub fn shutdown(&self) {
        portal_info!("Cancelling outstanding portal requests");
        self.cancel.cancel();
    }
}
