#![allow(dead_code)]

use std::sync::Arc;

use portal_engine::{MemoryTokenStore, PortalConfig, PortalContext};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REPOSITORY_ROOT: &str = "/server/api";

/// Configuration with every backend pointed at one mock server.
pub fn config_for(server: &MockServer) -> PortalConfig {
    let mut config = PortalConfig::default();
    config.local.base_url = server.uri();
    config.catalog.base_url = format!("{}/api/v1", server.uri());
    config.catalog.client_id = "portal".to_string();
    config.catalog.client_secret = "s3cret".to_string();
    config.repository.api_url = format!("{}{}", server.uri(), REPOSITORY_ROOT);
    config.http.request_timeout_ms = 2_000;
    config
}

pub fn context_for(server: &MockServer) -> (PortalContext, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let context = PortalContext::new(config_for(server), store.clone()).unwrap();
    (context, store)
}

pub fn repo_path(suffix: &str) -> String {
    format!("{REPOSITORY_ROOT}/{suffix}")
}

pub fn login_body() -> Value {
    json!({
        "token": "abcdef0123456789",
        "user": {
            "id": 7,
            "username": "ana",
            "email": "ana@registry.test",
            "first_name": "Ana",
            "last_name": "Quispe",
            "role": "admin",
            "is_staff": true
        }
    })
}

pub fn count_body(total: u64) -> Value {
    json!({ "_embedded": { "searchResult": { "page": { "totalElements": total } } } })
}

/// Mounts a successful repository login and signs the context's adapter in.
pub async fn sign_in_repository(server: &MockServer, context: &PortalContext) {
    Mock::given(method("POST"))
        .and(path(repo_path("authn/login")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Authorization", "Bearer repo-token")
                .insert_header("DSPACE-XSRF-TOKEN", "xsrf-1"),
        )
        .mount(server)
        .await;
    context
        .repository()
        .login("ana@registry.test", "pw")
        .await
        .unwrap();
}
