use std::collections::HashMap;
use std::fs;

use portal_engine::{
    ConfigError, PortalConfig, TokenPolicy, ENV_CATALOG_CLIENT_SECRET, ENV_LOCAL_URL,
    ENV_REPOSITORY_URL,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn defaults_are_valid_and_carry_no_secret() {
    let config = PortalConfig::default();
    config.validate().unwrap();
    assert!(config.catalog.client_secret.is_empty());
    assert_eq!(config.proxy.listen, "127.0.0.1:3001");
    assert_eq!(config.proxy.prefix, "/api/v1");
    assert_eq!(config.http.max_attempts, 1);
}

#[test]
fn partial_file_falls_back_to_defaults() {
    let config = PortalConfig::from_ron_str(
        r#"(
            catalog: (client_id: "portal", token_policy: CacheUntilExpiry),
            repository: (max_concurrent_collections: 2),
            http: (request_timeout_ms: 5000),
        )"#,
    )
    .unwrap();

    assert_eq!(config.catalog.client_id, "portal");
    assert_eq!(config.catalog.token_policy, TokenPolicy::CacheUntilExpiry);
    assert_eq!(config.repository.max_concurrent_collections, 2);
    assert_eq!(config.repository.collections_page_size, 100);
    assert_eq!(config.http.settings().request_timeout.as_millis(), 5000);
    assert_eq!(config.local, PortalConfig::default().local);
}

#[test]
fn environment_overrides_file_values() {
    let env: HashMap<&str, &str> = HashMap::from([
        (ENV_CATALOG_CLIENT_SECRET, "from-env"),
        (ENV_REPOSITORY_URL, "https://repo.registry.test/server/api"),
        (ENV_LOCAL_URL, "   "),
    ]);
    let config = PortalConfig::default()
        .with_overrides(|key| env.get(key).map(|value| value.to_string()));

    assert_eq!(config.catalog.client_secret, "from-env");
    assert_eq!(
        config.repository.api_url,
        "https://repo.registry.test/server/api"
    );
    assert_eq!(config.local.base_url, "http://localhost:8000");
}

#[test]
fn invalid_values_are_reported_by_field() {
    let err = PortalConfig::from_ron_str(r#"(proxy: (prefix: "api"))"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "proxy.prefix", .. }));

    let err = PortalConfig::from_ron_str(r#"(catalog: (detail_url_template: "http://x/detail"))"#)
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "catalog.detail_url_template",
            ..
        }
    ));

    let err = PortalConfig::from_ron_str(r#"(repository: (api_url: "nowhere"))"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "repository.api_url", .. }));
}

#[test]
fn syntax_errors_and_missing_files_are_distinct() {
    assert!(matches!(
        PortalConfig::from_ron_str("(catalog: "),
        Err(ConfigError::Parse(_))
    ));

    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("portal.ron");
    assert!(matches!(
        PortalConfig::load(&missing),
        Err(ConfigError::Read { .. })
    ));

    fs::write(&missing, "(state_dir: \"/var/lib/portal\")").unwrap();
    let loaded = PortalConfig::load(&missing).unwrap();
    assert_eq!(loaded.state_dir.to_str(), Some("/var/lib/portal"));
}
