mod common;

use std::sync::Arc;

use common::{config_for, count_body, repo_path};
use portal_core::{CollectionStats, DashboardStats};
use portal_engine::{MemoryTokenStore, PortalContext};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_collections(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(repo_path("core/collections")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": { "collections": [
                { "id": "c1", "name": "Births" },
                { "id": "c2", "name": "Marriages" },
                { "id": "c3", "name": "" }
            ] }
        })))
        .mount(server)
        .await;
}

async fn mount_scoped(server: &MockServer, scope: &str, archived: Option<u64>, workflow: Option<u64>) {
    let respond = |total: Option<u64>| match total {
        Some(total) => ResponseTemplate::new(200).set_body_json(count_body(total)),
        None => ResponseTemplate::new(500),
    };
    Mock::given(method("GET"))
        .and(path(repo_path("discover/search/objects")))
        .and(query_param("scope", scope))
        .and(query_param("dsoType", "ITEM"))
        .respond_with(respond(archived))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(repo_path("discover/search/objects")))
        .and(query_param("scope", scope))
        .and(query_param("configuration", "workflow"))
        .respond_with(respond(workflow))
        .mount(server)
        .await;
}

async fn mount_totals(server: &MockServer) {
    for (key, value, total) in [
        ("dsoType", "COLLECTION", 3),
        ("dsoType", "ITEM", 120),
        ("configuration", "workflow", 9),
    ] {
        Mock::given(method("GET"))
            .and(path(repo_path("discover/search/objects")))
            .and(query_param_is_missing("scope"))
            .and(query_param(key, value))
            .respond_with(ResponseTemplate::new(200).set_body_json(count_body(total)))
            .mount(server)
            .await;
    }
}

fn stats(id: &str, label: &str, archived_count: u64, workflow_count: u64) -> CollectionStats {
    CollectionStats {
        id: id.to_string(),
        label: label.to_string(),
        archived_count,
        workflow_count,
    }
}

#[tokio::test]
async fn failed_collection_counts_become_zero() {
    let server = MockServer::start().await;
    mount_collections(&server).await;
    mount_totals(&server).await;
    mount_scoped(&server, "c1", Some(40), Some(2)).await;
    mount_scoped(&server, "c2", None, Some(5)).await;
    mount_scoped(&server, "c3", Some(7), None).await;
    let mut config = config_for(&server);
    config.repository.max_concurrent_collections = 2;
    let context = PortalContext::new(config, Arc::new(MemoryTokenStore::new())).unwrap();

    let dashboard = context.dashboard().load_stats(None).await;

    assert_eq!(dashboard.collections, 3);
    assert_eq!(dashboard.archived_items, 120);
    assert_eq!(dashboard.workflow_items, 9);
    assert_eq!(
        dashboard.per_collection,
        vec![
            stats("c1", "Births", 40, 2),
            stats("c2", "Marriages", 0, 5),
            stats("c3", "c3", 7, 0),
        ]
    );
    assert_eq!(dashboard.max_collection_total(), 42);

    let requests = server.received_requests().await.unwrap();
    let scoped = requests
        .iter()
        .filter(|request| request.url.path().ends_with("discover/search/objects"))
        .filter(|request| request.url.query_pairs().any(|(key, _)| key == "scope"))
        .count();
    assert_eq!(scoped, 6);
}

#[tokio::test]
async fn scope_limits_breakdown_to_one_collection() {
    let server = MockServer::start().await;
    mount_collections(&server).await;
    mount_scoped(&server, "c2", Some(11), Some(1)).await;

    let context =
        PortalContext::new(config_for(&server), Arc::new(MemoryTokenStore::new())).unwrap();

    let dashboard = context.dashboard().load_stats(Some("c2")).await;

    assert_eq!(dashboard.per_collection, vec![stats("c2", "Marriages", 11, 1)]);
    assert_eq!(dashboard.archived_items, 11);
    assert_eq!(dashboard.workflow_items, 1);
    // No COLLECTION count is mounted for the scope.
    assert_eq!(dashboard.collections, 0);
}

#[tokio::test]
async fn scoped_collection_is_counted_when_listing_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(repo_path("core/collections")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_scoped(&server, "c9", Some(4), Some(2)).await;
    let context =
        PortalContext::new(config_for(&server), Arc::new(MemoryTokenStore::new())).unwrap();

    let dashboard = context.dashboard().load_stats(Some("c9")).await;

    assert_eq!(dashboard.per_collection, vec![stats("c9", "c9", 4, 2)]);
    assert_eq!(dashboard.archived_items, 4);
}

#[tokio::test]
async fn scoped_collection_missing_from_listing_keeps_its_entry() {
    let server = MockServer::start().await;
    mount_collections(&server).await;
    mount_scoped(&server, "c40", None, Some(3)).await;
    let context =
        PortalContext::new(config_for(&server), Arc::new(MemoryTokenStore::new())).unwrap();

    let dashboard = context.dashboard().load_stats(Some("c40")).await;

    assert_eq!(dashboard.per_collection, vec![stats("c40", "c40", 0, 3)]);
}

#[tokio::test]
async fn unreachable_repository_gives_an_empty_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let context =
        PortalContext::new(config_for(&server), Arc::new(MemoryTokenStore::new())).unwrap();

    let dashboard = context.dashboard().load_stats(None).await;

    assert_eq!(dashboard, DashboardStats::default());
}

#[tokio::test]
async fn user_stats_are_optional() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(repo_path("statistics/usercontentstats/u-1")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let context =
        PortalContext::new(config_for(&server), Arc::new(MemoryTokenStore::new())).unwrap();

    assert_eq!(context.dashboard().load_user_stats("u-1").await, None);
}
